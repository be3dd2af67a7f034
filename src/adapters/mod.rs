//! Period source adapters
//!
//! This module provides adapters that parse the payloads handed over by the
//! external collaborators (device health source, remote persistence API) and
//! map them to `PeriodRecord`s the engine can consume.

mod health;
mod remote;

pub use health::{periods_from_samples, HealthFlowAdapter, MAX_FLOW_GAP_DAYS};
pub use remote::{RemotePeriodAdapter, DEFAULT_DURATION_DAYS};

use crate::error::CycleError;
use crate::types::PeriodRecord;
use tracing::debug;

/// Device-derived periods starting within this many days of a remote period
/// are treated as the same period
pub const MERGE_TOLERANCE_DAYS: i64 = 3;

/// Trait for period source adapters
pub trait PeriodSourceAdapter {
    /// Parse raw JSON into period records
    fn parse(&self, raw_json: &str) -> Result<Vec<PeriodRecord>, CycleError>;
}

/// Merge remote records with device-derived periods.
///
/// Remote records win; a device period is dropped when a remote period starts
/// within `MERGE_TOLERANCE_DAYS` of it. The result is sorted by start date.
pub fn merge_sources(remote: Vec<PeriodRecord>, device: Vec<PeriodRecord>) -> Vec<PeriodRecord> {
    let mut merged = remote;
    let remote_starts: Vec<_> = merged.iter().map(|p| p.start_date).collect();

    for period in device {
        let overlaps = remote_starts
            .iter()
            .any(|start| (period.start_date - *start).num_days().abs() <= MERGE_TOLERANCE_DAYS);
        if overlaps {
            debug!(start = %period.start_date, "device period already known remotely");
            continue;
        }
        merged.push(period);
    }

    merged.sort_by_key(|p| p.start_date);
    merged
}
