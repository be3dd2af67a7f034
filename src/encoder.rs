//! Forecast report encoding
//!
//! This module wraps a `CycleSnapshot` in a versioned report carrying
//! producer provenance and data-quality flags.

use crate::error::CycleError;
use crate::predictor::{HIGH_VARIABILITY_DAYS, MIN_RECORDS_FOR_PREDICTION, SIGNIFICANT_TREND_STRENGTH};
use crate::types::{CycleHistory, CycleSnapshot};
use crate::{CYCLE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Versioned forecast report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub quality: ReportQuality,
    pub snapshot: CycleSnapshot,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Input volume and quality flags behind a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    pub period_count: usize,
    pub symptom_count: usize,
    pub confidence: f64,
    pub flags: Vec<String>,
}

/// Encoder for forecast reports
pub struct ForecastEncoder {
    instance_id: String,
}

impl Default for ForecastEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a snapshot computed from `history`
    pub fn encode(&self, history: &CycleHistory, snapshot: &CycleSnapshot) -> ForecastReport {
        ForecastReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: CYCLE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            quality: build_quality(history, snapshot),
            snapshot: snapshot.clone(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        history: &CycleHistory,
        snapshot: &CycleSnapshot,
    ) -> Result<String, CycleError> {
        let report = self.encode(history, snapshot);
        serde_json::to_string_pretty(&report).map_err(|e| CycleError::EncodingError(e.to_string()))
    }
}

fn build_quality(history: &CycleHistory, snapshot: &CycleSnapshot) -> ReportQuality {
    let prediction = &snapshot.prediction;
    let mut flags = Vec::new();

    if history.periods.len() < MIN_RECORDS_FOR_PREDICTION {
        flags.push("insufficient_history".to_string());
    }
    if prediction.variability > HIGH_VARIABILITY_DAYS {
        flags.push("high_variability".to_string());
    }
    if prediction.trend.strength > SIGNIFICANT_TREND_STRENGTH {
        flags.push("trend_detected".to_string());
    }
    if history.symptoms.is_empty() {
        flags.push("no_symptoms".to_string());
    }

    ReportQuality {
        period_count: history.periods.len(),
        symptom_count: history.symptoms.len(),
        confidence: prediction.confidence,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::OvulationAnchor;
    use crate::store::build_snapshot;
    use crate::types::{parse_date, FlowIntensity, PeriodRecord};

    fn history() -> CycleHistory {
        let starts = ["2026-01-01", "2026-01-29", "2026-02-26"];
        let periods = starts
            .iter()
            .enumerate()
            .map(|(i, s)| {
                PeriodRecord::new(format!("p{i}"), parse_date(s).unwrap(), 5, FlowIntensity::Light)
                    .unwrap()
            })
            .collect();
        CycleHistory::new(periods, vec![])
    }

    #[test]
    fn test_encode_report() {
        let history = history();
        let snapshot = build_snapshot(
            &history,
            parse_date("2026-03-10").unwrap(),
            OvulationAnchor::NextPeriod,
        );
        let encoder = ForecastEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(&history, &snapshot);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, "synheart-cycle");
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.quality.period_count, 3);
        assert_eq!(report.quality.flags, vec!["no_symptoms".to_string()]);
        assert_eq!(report.snapshot, snapshot);
    }

    #[test]
    fn test_encode_to_json() {
        let history = CycleHistory::default();
        let snapshot = build_snapshot(
            &history,
            parse_date("2026-03-10").unwrap(),
            OvulationAnchor::NextPeriod,
        );
        let json = ForecastEncoder::new().encode_to_json(&history, &snapshot).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report_version"], "1.0.0");
        assert_eq!(value["snapshot"]["prediction"]["confidence_label"], "Low");
        assert_eq!(value["snapshot"]["prediction"]["predicted_date"], "2026-04-07");
        assert_eq!(
            value["quality"]["flags"],
            serde_json::json!(["insufficient_history", "no_symptoms"])
        );
    }
}
