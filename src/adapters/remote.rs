//! Remote persistence API adapter
//!
//! Parses period rows returned by the remote API and maps them to period
//! records.

use crate::error::CycleError;
use crate::types::{parse_date, FlowIntensity, PeriodRecord};
use serde::Deserialize;
use tracing::warn;

use super::PeriodSourceAdapter;

/// Duration assumed when a row carries neither a duration nor an end date
pub const DEFAULT_DURATION_DAYS: u32 = 5;

/// Remote API payload adapter
pub struct RemotePeriodAdapter;

#[derive(Deserialize)]
#[serde(untagged)]
enum RemotePayload {
    Wrapped { periods: Vec<RemotePeriodRow> },
    Bare(Vec<RemotePeriodRow>),
}

#[derive(Debug, Deserialize)]
struct RemotePeriodRow {
    id: String,
    start_date: String,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    duration_days: Option<i64>,
    #[serde(default)]
    flow: Option<FlowIntensity>,
}

impl PeriodSourceAdapter for RemotePeriodAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<PeriodRecord>, CycleError> {
        let rows = match serde_json::from_str::<RemotePayload>(raw_json)? {
            RemotePayload::Wrapped { periods } => periods,
            RemotePayload::Bare(rows) => rows,
        };

        let mut periods = rows
            .into_iter()
            .map(convert_row)
            .collect::<Result<Vec<_>, _>>()?;
        periods.sort_by_key(|p| p.start_date);

        Ok(periods)
    }
}

fn convert_row(row: RemotePeriodRow) -> Result<PeriodRecord, CycleError> {
    let start_date = parse_date(&row.start_date)?;
    let end_date = row.end_date.as_deref().map(parse_date).transpose()?;
    let span = end_date.map(|end| (end - start_date).num_days() + 1);

    let duration = match (row.duration_days, span) {
        (Some(days), Some(span_days)) if days != span_days => {
            warn!(
                id = %row.id,
                duration_days = days,
                span_days,
                "period duration disagrees with its end date, using duration"
            );
            days
        }
        (Some(days), _) => days,
        (None, Some(span)) => span,
        (None, None) => i64::from(DEFAULT_DURATION_DAYS),
    };

    let duration_days = u32::try_from(duration)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| {
            CycleError::InvalidRecord(format!("period {} has duration {duration}", row.id))
        })?;

    PeriodRecord::new(
        row.id,
        start_date,
        duration_days,
        row.flow.unwrap_or(FlowIntensity::Medium),
    )
}
