//! Cycle statistics
//!
//! This module derives the numeric features the predictor works from:
//! - Cycle lengths between consecutive onsets
//! - Recency-weighted and recent averages
//! - Trend between the earlier and later halves of the history
//! - Variability (population standard deviation)

use crate::types::{CycleStats, CycleTrend, PeriodRecord, TrendDirection};
use chrono::NaiveDate;

/// Assumed cycle length when there is not enough history
pub const BASE_CYCLE_LENGTH: f64 = 28.0;

/// Assumed period length when there is no history
pub const DEFAULT_PERIOD_LENGTH: f64 = 5.0;

/// Weight decay per cycle going back from the most recent
pub const RECENCY_DECAY: f64 = 0.8;

/// Number of cycles in the recent average
pub const RECENT_WINDOW: usize = 3;

/// Minimum number of cycle lengths before a trend is computed
pub const MIN_TREND_LENGTHS: usize = 4;

/// Half-to-half differences below this many days count as stable
pub const STABLE_TREND_DAYS: f64 = 1.0;

/// Difference (days) at which trend strength saturates
pub const TREND_STRENGTH_SCALE: f64 = 5.0;

/// Fraction of the half-to-half difference applied to the forecast
pub const TREND_ADJUSTMENT_FACTOR: f64 = 0.5;

/// Numeric features derived from one period history
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStatistics {
    pub record_count: usize,
    /// Start date of the most recent period
    pub last_start: Option<NaiveDate>,
    /// Days between consecutive onsets, oldest first
    pub cycle_lengths: Vec<i64>,
    pub weighted_average: Option<f64>,
    pub recent_average: Option<f64>,
    pub trend: CycleTrend,
    pub variability: f64,
}

impl CycleStatistics {
    /// Compute statistics over an unsorted history
    pub fn from_history(history: &[PeriodRecord]) -> Self {
        let sorted = sorted_by_start(history);
        let lengths = cycle_lengths(&sorted);

        Self {
            record_count: sorted.len(),
            last_start: sorted.last().map(|p| p.start_date),
            weighted_average: weighted_average(&lengths),
            recent_average: recent_average(&lengths),
            trend: trend(&lengths),
            variability: variability(&lengths),
            cycle_lengths: lengths,
        }
    }
}

/// Borrow the history in ascending start-date order, one record per onset.
///
/// Records sharing a start date describe the same onset; the first one in
/// input order is kept so no cycle has a zero length.
pub fn sorted_by_start(history: &[PeriodRecord]) -> Vec<&PeriodRecord> {
    let mut sorted: Vec<&PeriodRecord> = history.iter().collect();
    sorted.sort_by_key(|p| p.start_date);
    sorted.dedup_by_key(|p| p.start_date);
    sorted
}

/// Days between each pair of consecutive onsets
pub fn cycle_lengths(sorted: &[&PeriodRecord]) -> Vec<i64> {
    sorted
        .windows(2)
        .map(|w| (w[1].start_date - w[0].start_date).num_days())
        .collect()
}

/// Exponentially recency-weighted mean; the latest cycle has weight 1
pub fn weighted_average(lengths: &[i64]) -> Option<f64> {
    if lengths.is_empty() {
        return None;
    }

    let last = lengths.len() - 1;
    let (weighted_sum, weight_total) =
        lengths
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, total), (i, &length)| {
                let weight = RECENCY_DECAY.powi((last - i) as i32);
                (sum + length as f64 * weight, total + weight)
            });

    Some(weighted_sum / weight_total)
}

/// Plain mean of the last three cycle lengths
pub fn recent_average(lengths: &[i64]) -> Option<f64> {
    let start = lengths.len().saturating_sub(RECENT_WINDOW);
    mean(&lengths[start..])
}

/// Compare the mean of the later half of the lengths against the earlier half
pub fn trend(lengths: &[i64]) -> CycleTrend {
    if lengths.len() < MIN_TREND_LENGTHS {
        return CycleTrend::stable();
    }

    let (earlier, later) = lengths.split_at(lengths.len() / 2);
    let (Some(earlier_mean), Some(later_mean)) = (mean(earlier), mean(later)) else {
        return CycleTrend::stable();
    };

    let difference = later_mean - earlier_mean;
    let strength = (difference.abs() / TREND_STRENGTH_SCALE).min(1.0);

    if difference.abs() < STABLE_TREND_DAYS {
        CycleTrend {
            direction: TrendDirection::Stable,
            adjustment: 0.0,
            strength,
        }
    } else {
        CycleTrend {
            direction: if difference > 0.0 {
                TrendDirection::Increasing
            } else {
                TrendDirection::Decreasing
            },
            adjustment: difference * TREND_ADJUSTMENT_FACTOR,
            strength,
        }
    }
}

/// Population standard deviation of the cycle lengths
pub fn variability(lengths: &[i64]) -> f64 {
    let Some(avg) = mean(lengths) else {
        return 0.0;
    };
    let variance = lengths
        .iter()
        .map(|&l| (l as f64 - avg).powi(2))
        .sum::<f64>()
        / lengths.len() as f64;
    variance.sqrt()
}

/// Unweighted mean of all cycle lengths, 28 with fewer than two periods
pub fn average_cycle_length(history: &[PeriodRecord]) -> f64 {
    let sorted = sorted_by_start(history);
    mean(&cycle_lengths(&sorted)).unwrap_or(BASE_CYCLE_LENGTH)
}

/// Mean duration of all periods, 5 with no periods
pub fn average_period_length(history: &[PeriodRecord]) -> f64 {
    if history.is_empty() {
        return DEFAULT_PERIOD_LENGTH;
    }
    history.iter().map(|p| f64::from(p.duration_days)).sum::<f64>() / history.len() as f64
}

/// Summary statistics for the stats view
pub fn cycle_stats(history: &[PeriodRecord]) -> CycleStats {
    let sorted = sorted_by_start(history);
    let lengths = cycle_lengths(&sorted);
    let last = sorted.last();

    CycleStats {
        total_periods: sorted.len(),
        average_cycle_length: mean(&lengths).unwrap_or(BASE_CYCLE_LENGTH),
        average_period_length: average_period_length(history),
        shortest_cycle: lengths.iter().copied().min(),
        longest_cycle: lengths.iter().copied().max(),
        last_period_start: last.map(|p| p.start_date),
        last_period_end: last.map(|p| p.end_date()),
    }
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}
