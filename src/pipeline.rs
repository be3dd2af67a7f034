//! Pipeline orchestration
//!
//! This module provides the stateless JSON-in/JSON-out API for Synheart Cycle.
//! For incremental use with observers, see [`crate::store::CycleStore`].

use crate::adapters::{merge_sources, HealthFlowAdapter, PeriodSourceAdapter, RemotePeriodAdapter};
use crate::encoder::ForecastEncoder;
use crate::error::CycleError;
use crate::predictor::OvulationAnchor;
use crate::store::build_snapshot;
use crate::types::CycleHistory;
use chrono::NaiveDate;
use tracing::debug;

/// Parse and validate a history JSON document
///
/// # Example
/// ```ignore
/// let history = parse_history(r#"{"periods": [], "symptoms": []}"#)?;
/// ```
pub fn parse_history(history_json: &str) -> Result<CycleHistory, CycleError> {
    let mut history: CycleHistory = serde_json::from_str(history_json)?;
    history.validate()?;
    history.sort();
    Ok(history)
}

/// Compute a forecast report from a history JSON document.
///
/// # Arguments
/// * `history_json` - `{"periods": [...], "symptoms": [...]}`
/// * `today` - The day the forecast is computed for
///
/// # Returns
/// Pretty-printed forecast report JSON
pub fn forecast_from_json(history_json: &str, today: NaiveDate) -> Result<String, CycleError> {
    forecast_from_json_with(history_json, today, OvulationAnchor::default())
}

/// Compute a forecast report with an explicit ovulation anchor
pub fn forecast_from_json_with(
    history_json: &str,
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> Result<String, CycleError> {
    let history = parse_history(history_json)?;
    let snapshot = build_snapshot(&history, today, anchor);
    debug!(
        periods = history.periods.len(),
        symptoms = history.symptoms.len(),
        %today,
        "forecast computed"
    );
    ForecastEncoder::new().encode_to_json(&history, &snapshot)
}

/// Convert device flow samples into a history JSON document
pub fn health_samples_to_history(samples_json: &str) -> Result<String, CycleError> {
    let periods = HealthFlowAdapter.parse(samples_json)?;
    encode_history(CycleHistory::new(periods, vec![]))
}

/// Convert remote period rows into a history JSON document
pub fn remote_periods_to_history(rows_json: &str) -> Result<String, CycleError> {
    let periods = RemotePeriodAdapter.parse(rows_json)?;
    encode_history(CycleHistory::new(periods, vec![]))
}

/// Merge remote rows with device flow samples into one history JSON document
pub fn merge_sources_to_history(rows_json: &str, samples_json: &str) -> Result<String, CycleError> {
    let remote = RemotePeriodAdapter.parse(rows_json)?;
    let device = HealthFlowAdapter.parse(samples_json)?;
    encode_history(CycleHistory::new(merge_sources(remote, device), vec![]))
}

fn encode_history(history: CycleHistory) -> Result<String, CycleError> {
    serde_json::to_string(&history).map_err(|e| CycleError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_date;

    fn sample_history_json() -> &'static str {
        r#"{
            "periods": [
                { "id": "p3", "start_date": "2026-02-26", "duration_days": 5, "flow_intensity": "medium" },
                { "id": "p1", "start_date": "2026-01-01", "duration_days": 5, "flow_intensity": "heavy" },
                { "id": "p2", "start_date": "2026-01-29", "duration_days": 4, "flow_intensity": "light" }
            ],
            "symptoms": [
                { "id": "s1", "name": "cramps", "severity": "moderate", "date": "2026-02-26T08:00:00Z" }
            ]
        }"#
    }

    #[test]
    fn test_forecast_from_json() {
        let json = forecast_from_json(sample_history_json(), parse_date("2026-03-10").unwrap())
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(report["producer"]["name"], "synheart-cycle");
        let snapshot = &report["snapshot"];
        assert_eq!(snapshot["prediction"]["predicted_date"], "2026-03-26");
        assert_eq!(snapshot["fertility"]["ovulation_date"], "2026-03-12");
        assert_eq!(snapshot["current_cycle_day"], 13);
        assert_eq!(snapshot["phase"], "follicular");
        assert_eq!(snapshot["in_fertile_window"], true);
        assert_eq!(snapshot["stats"]["total_periods"], 3);
    }

    #[test]
    fn test_forecast_rejects_duplicate_ids() {
        let json = r#"{"periods": [
            { "id": "p1", "start_date": "2026-01-01", "duration_days": 5, "flow_intensity": "heavy" },
            { "id": "p1", "start_date": "2026-01-29", "duration_days": 5, "flow_intensity": "heavy" }
        ]}"#;
        let result = forecast_from_json(json, parse_date("2026-03-10").unwrap());
        assert!(matches!(result, Err(CycleError::DuplicateId(_))));
    }

    #[test]
    fn test_forecast_rejects_oversized_duration() {
        let json = r#"{"periods": [
            { "id": "p1", "start_date": "2026-01-01", "duration_days": 200000000, "flow_intensity": "heavy" }
        ]}"#;
        let result = forecast_from_json(json, parse_date("2026-03-10").unwrap());
        assert!(matches!(result, Err(CycleError::InvalidRecord(_))));
    }

    #[test]
    fn test_forecast_rejects_shared_start_dates() {
        let json = r#"{"periods": [
            { "id": "manual", "start_date": "2026-01-01", "duration_days": 5, "flow_intensity": "heavy" },
            { "id": "device", "start_date": "2026-01-01", "duration_days": 4, "flow_intensity": "light" }
        ]}"#;
        let result = forecast_from_json(json, parse_date("2026-03-10").unwrap());
        assert!(matches!(result, Err(CycleError::InvalidRecord(_))));
    }

    #[test]
    fn test_forecast_empty_history() {
        let json = forecast_from_json("{}", parse_date("2026-03-10").unwrap()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["snapshot"]["prediction"]["reasoning"], "insufficient data");
    }

    #[test]
    fn test_invalid_json() {
        let result = forecast_from_json("not valid json", parse_date("2026-03-10").unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_health_samples_to_history() {
        let samples = r#"{"samples": [
            { "date": "2026-01-01", "flow": "heavy" },
            { "date": "2026-01-02", "flow": "medium" },
            { "date": "2026-01-29", "flow": "light" }
        ]}"#;
        let history = parse_history(&health_samples_to_history(samples).unwrap()).unwrap();
        assert_eq!(history.periods.len(), 2);
        assert_eq!(history.periods[0].duration_days, 2);
    }

    #[test]
    fn test_merge_sources_to_history() {
        let rows = r#"[{ "id": "r1", "start_date": "2026-01-02", "duration_days": 5 }]"#;
        let samples = r#"[
            { "date": "2026-01-01", "flow": "heavy" },
            { "date": "2026-01-29", "flow": "light" }
        ]"#;
        let history = parse_history(&merge_sources_to_history(rows, samples).unwrap()).unwrap();
        assert_eq!(history.periods.len(), 2);
        assert_eq!(history.periods[0].id, "r1");

        let remote_only = parse_history(&remote_periods_to_history(rows).unwrap()).unwrap();
        assert_eq!(remote_only.periods.len(), 1);
    }
}
