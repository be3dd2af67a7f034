//! Device health source adapter
//!
//! Parses per-day menstrual flow samples and groups consecutive flow days
//! into period records.

use crate::error::CycleError;
use crate::types::{FlowIntensity, FlowSample, PeriodRecord, MAX_PERIOD_DURATION_DAYS};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::PeriodSourceAdapter;

/// Flow days at most this many days apart belong to the same period
pub const MAX_FLOW_GAP_DAYS: i64 = 2;

/// Device health source adapter
pub struct HealthFlowAdapter;

#[derive(Deserialize)]
#[serde(untagged)]
enum HealthPayload {
    Wrapped { samples: Vec<FlowSample> },
    Bare(Vec<FlowSample>),
}

impl PeriodSourceAdapter for HealthFlowAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<PeriodRecord>, CycleError> {
        let samples = match serde_json::from_str::<HealthPayload>(raw_json)? {
            HealthPayload::Wrapped { samples } => samples,
            HealthPayload::Bare(samples) => samples,
        };

        let periods = periods_from_samples(&samples);
        debug!(
            samples = samples.len(),
            periods = periods.len(),
            "derived periods from flow samples"
        );
        Ok(periods)
    }
}

/// Group flow samples into periods.
///
/// Samples reporting no flow are ignored and duplicate days keep the heavier
/// reading. A period's intensity is its most frequent level (ties go to the
/// heavier level), or medium when no level was reported.
pub fn periods_from_samples(samples: &[FlowSample]) -> Vec<PeriodRecord> {
    let mut days: BTreeMap<NaiveDate, Option<FlowIntensity>> = BTreeMap::new();
    for sample in samples.iter().filter(|s| s.flow.is_flow()) {
        let level = days.entry(sample.date).or_insert(None);
        *level = (*level).max(sample.flow.intensity());
    }

    let mut periods = Vec::new();
    let mut run: Vec<(NaiveDate, Option<FlowIntensity>)> = Vec::new();

    for (date, level) in days {
        if let Some((previous, _)) = run.last() {
            if (date - *previous).num_days() > MAX_FLOW_GAP_DAYS {
                periods.extend(build_period(&run));
                run.clear();
            }
        }
        run.push((date, level));
    }
    periods.extend(build_period(&run));

    periods
}

fn build_period(run: &[(NaiveDate, Option<FlowIntensity>)]) -> Option<PeriodRecord> {
    let (first, _) = run.first()?;
    let (last, _) = run.last()?;
    let duration_days = u32::try_from((*last - *first).num_days() + 1).ok()?;
    if duration_days > MAX_PERIOD_DURATION_DAYS {
        warn!(start = %first, duration_days, "flow run too long for a period, skipping");
        return None;
    }

    Some(PeriodRecord {
        id: Uuid::new_v4().to_string(),
        start_date: *first,
        duration_days,
        flow_intensity: dominant_intensity(run.iter().filter_map(|(_, level)| *level)),
    })
}

fn dominant_intensity(levels: impl Iterator<Item = FlowIntensity>) -> FlowIntensity {
    let mut counts: BTreeMap<FlowIntensity, usize> = BTreeMap::new();
    for level in levels {
        *counts.entry(level).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(level, count)| (*count, *level))
        .map(|(level, _)| level)
        .unwrap_or(FlowIntensity::Medium)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_date, SampleFlow};
    use pretty_assertions::assert_eq;

    fn sample(day: &str, flow: SampleFlow) -> FlowSample {
        FlowSample {
            date: parse_date(day).unwrap(),
            flow,
        }
    }

    #[test]
    fn test_parse_health_payload() {
        let json = r#"{
            "samples": [
                { "date": "2026-01-01", "flow": "heavy" },
                { "date": "2026-01-02", "flow": "heavy" },
                { "date": "2026-01-03", "flow": "medium" },
                { "date": "2026-01-04", "flow": "light" },
                { "date": "2026-01-15", "flow": "none" },
                { "date": "2026-01-29", "flow": "medium" },
                { "date": "2026-01-30", "flow": "unspecified" },
                { "date": "2026-02-01", "flow": "light" }
            ]
        }"#;

        let periods = HealthFlowAdapter.parse(json).unwrap();
        assert_eq!(periods.len(), 2);

        assert_eq!(periods[0].start_date, parse_date("2026-01-01").unwrap());
        assert_eq!(periods[0].duration_days, 4);
        assert_eq!(periods[0].flow_intensity, FlowIntensity::Heavy);

        // One-day gap on Jan 31 keeps the run together
        assert_eq!(periods[1].start_date, parse_date("2026-01-29").unwrap());
        assert_eq!(periods[1].duration_days, 4);
        assert_eq!(periods[1].flow_intensity, FlowIntensity::Medium);
        assert_ne!(periods[0].id, periods[1].id);
    }

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[{ "date": "2026-03-01", "flow": "light" }]"#;
        let periods = HealthFlowAdapter.parse(json).unwrap();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].duration_days, 1);
    }

    #[test]
    fn test_gap_splits_periods() {
        let samples = vec![
            sample("2026-01-01", SampleFlow::Light),
            sample("2026-01-04", SampleFlow::Light),
        ];
        let periods = periods_from_samples(&samples);
        assert_eq!(periods.len(), 2);
    }

    #[test]
    fn test_duplicate_days_keep_heavier_reading() {
        let samples = vec![
            sample("2026-01-01", SampleFlow::Light),
            sample("2026-01-01", SampleFlow::Heavy),
            sample("2026-01-02", SampleFlow::Light),
        ];
        let periods = periods_from_samples(&samples);
        assert_eq!(periods.len(), 1);
        // heavy (1) vs light (1): tie goes to heavy
        assert_eq!(periods[0].flow_intensity, FlowIntensity::Heavy);
        assert_eq!(periods[0].duration_days, 2);
    }

    #[test]
    fn test_unspecified_only_defaults_to_medium() {
        let samples = vec![
            sample("2026-01-01", SampleFlow::Unspecified),
            sample("2026-01-02", SampleFlow::Unspecified),
        ];
        let periods = periods_from_samples(&samples);
        assert_eq!(periods[0].flow_intensity, FlowIntensity::Medium);
    }

    #[test]
    fn test_no_flow_yields_no_periods() {
        let samples = vec![sample("2026-01-01", SampleFlow::None)];
        assert!(periods_from_samples(&samples).is_empty());
        assert!(periods_from_samples(&[]).is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            HealthFlowAdapter.parse("not json"),
            Err(CycleError::JsonError(_))
        ));
    }

    #[test]
    fn test_overlong_flow_run_skipped() {
        let start = parse_date("2026-01-01").unwrap();
        let mut samples: Vec<FlowSample> = (0..40)
            .map(|i| FlowSample {
                date: start + chrono::Duration::days(i),
                flow: SampleFlow::Light,
            })
            .collect();
        samples.push(sample("2026-03-01", SampleFlow::Heavy));

        let periods = periods_from_samples(&samples);
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].start_date, parse_date("2026-03-01").unwrap());
    }
}
