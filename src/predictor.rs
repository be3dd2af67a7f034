//! Period and fertility prediction
//!
//! Pure functions over a period history. Nothing here reads the clock: every
//! operation that depends on the current day takes it as `today`.

use crate::statistics::{self, CycleStatistics, BASE_CYCLE_LENGTH};
use crate::types::{
    shift_days, ConfidenceLevel, CyclePhase, CyclePrediction, FertilityPrediction, PeriodRecord,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum number of periods for a statistical forecast
pub const MIN_RECORDS_FOR_PREDICTION: usize = 2;

/// Confidence assigned to the fallback forecast
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Reasoning attached to the fallback forecast
pub const FALLBACK_REASONING: &str = "insufficient data";

/// Number of periods at which the data-volume score saturates
pub const FULL_CONFIDENCE_RECORDS: f64 = 6.0;

/// Variability (days) per unit of confidence penalty
pub const VARIABILITY_PENALTY_SCALE: f64 = 7.0;

/// Cap on the variability penalty
pub const MAX_VARIABILITY_PENALTY: f64 = 0.3;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Smallest half-width of the forecast interval, in days
pub const MIN_INTERVAL_HALF_WIDTH: f64 = 3.0;

/// Interval half-width per day of variability
pub const INTERVAL_VARIABILITY_FACTOR: f64 = 1.5;

/// Variability above this is described as irregular in the reasoning
pub const HIGH_VARIABILITY_DAYS: f64 = 5.0;

/// Trends weaker than this are not mentioned
pub const SIGNIFICANT_TREND_STRENGTH: f64 = 0.3;

/// Ovulation is assumed this many days before the next onset
pub const OVULATION_DAY: i64 = 14;

/// Fertile days before ovulation
pub const FERTILE_DAYS_BEFORE_OVULATION: i64 = 5;

/// Fertile days after ovulation
pub const FERTILE_DAYS_AFTER_OVULATION: i64 = 1;

/// Fertility confidence relative to the period forecast
pub const FERTILITY_CONFIDENCE_FACTOR: f64 = 0.8;

/// How the ovulation date is anchored.
///
/// `TodayPivot` reproduces the mobile app's arithmetic,
/// `predicted - (days_until_predicted - 14)`, which always lands on
/// `today + 14` regardless of history. It is kept for parity checks only;
/// `today` can never fall inside a window computed this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OvulationAnchor {
    /// Ovulation 14 days before the predicted next onset
    #[default]
    NextPeriod,
    /// Mobile app arithmetic, pivoting on `today`
    TodayPivot,
}

/// Forecast the next period onset.
///
/// With fewer than two periods a fixed 28-day fallback with Low confidence
/// is returned.
pub fn predict_next_period(history: &[PeriodRecord], today: NaiveDate) -> CyclePrediction {
    let stats = CycleStatistics::from_history(history);
    let average_period = statistics::average_period_length(history);

    let weighted = match stats.weighted_average {
        Some(avg) if stats.record_count >= MIN_RECORDS_FOR_PREDICTION => avg,
        _ => return fallback_prediction(&stats, average_period, today),
    };
    let last_start = stats.last_start.unwrap_or(today);

    let predicted_date = shift_days(
        last_start,
        weighted.round() as i64 + stats.trend.adjustment.round() as i64,
    );

    let volume_score = (stats.record_count as f64 / FULL_CONFIDENCE_RECORDS).min(1.0);
    let variability_penalty =
        (stats.variability / VARIABILITY_PENALTY_SCALE).min(MAX_VARIABILITY_PENALTY);
    let confidence = (volume_score - variability_penalty).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);

    let half_width =
        MIN_INTERVAL_HALF_WIDTH.max(stats.variability * INTERVAL_VARIABILITY_FACTOR);
    let half_width_days = half_width.round() as i64;

    debug!(
        records = stats.record_count,
        weighted_average = weighted,
        variability = stats.variability,
        trend = stats.trend.direction.as_str(),
        confidence,
        "predicted next period"
    );

    CyclePrediction {
        predicted_date,
        predicted_end: period_end(predicted_date, average_period),
        confidence,
        confidence_label: ConfidenceLevel::from_score(confidence),
        reasoning: compose_reasoning(&stats, weighted),
        interval_low: shift_days(predicted_date, -half_width_days),
        interval_high: shift_days(predicted_date, half_width_days),
        record_count: stats.record_count,
        weighted_average: Some(weighted),
        recent_average: stats.recent_average,
        trend: stats.trend,
        variability: stats.variability,
    }
}

fn fallback_prediction(
    stats: &CycleStatistics,
    average_period: f64,
    today: NaiveDate,
) -> CyclePrediction {
    let anchor = stats.last_start.unwrap_or(today);
    let predicted_date = shift_days(anchor, BASE_CYCLE_LENGTH as i64);
    let half_width = MIN_INTERVAL_HALF_WIDTH as i64;

    debug!(records = stats.record_count, "not enough periods, using fallback forecast");

    CyclePrediction {
        predicted_date,
        predicted_end: period_end(predicted_date, average_period),
        confidence: FALLBACK_CONFIDENCE,
        confidence_label: ConfidenceLevel::Low,
        reasoning: FALLBACK_REASONING.to_string(),
        interval_low: shift_days(predicted_date, -half_width),
        interval_high: shift_days(predicted_date, half_width),
        record_count: stats.record_count,
        weighted_average: None,
        recent_average: stats.recent_average,
        trend: stats.trend,
        variability: stats.variability,
    }
}

fn period_end(start: NaiveDate, average_period: f64) -> NaiveDate {
    shift_days(start, (average_period.round() as i64 - 1).max(0))
}

fn compose_reasoning(stats: &CycleStatistics, weighted: f64) -> String {
    let mut reasoning = format!(
        "Based on {} recorded periods with a weighted average cycle of {:.1} days.",
        stats.record_count, weighted
    );

    if stats.trend.strength > SIGNIFICANT_TREND_STRENGTH {
        reasoning.push_str(&format!(
            " Cycle length is trending {} ({:+.1} days applied).",
            stats.trend.direction.as_str(),
            stats.trend.adjustment
        ));
    }

    if stats.variability > HIGH_VARIABILITY_DAYS {
        reasoning.push_str(&format!(
            " Cycle variability is moderate to high ({:.1} days), so the window is wider.",
            stats.variability
        ));
    } else {
        reasoning.push_str(&format!(
            " Cycles are regular (variability {:.1} days).",
            stats.variability
        ));
    }

    reasoning
}

/// Estimate the fertile window for the upcoming cycle
pub fn predict_fertility_window(history: &[PeriodRecord], today: NaiveDate) -> FertilityPrediction {
    predict_fertility_window_with(history, today, OvulationAnchor::default())
}

/// Estimate the fertile window using an explicit ovulation anchor
pub fn predict_fertility_window_with(
    history: &[PeriodRecord],
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> FertilityPrediction {
    let prediction = predict_next_period(history, today);
    fertility_from_prediction(&prediction, today, anchor)
}

/// Derive the fertile window from an existing period forecast
pub fn fertility_from_prediction(
    prediction: &CyclePrediction,
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> FertilityPrediction {
    let ovulation_date = match anchor {
        OvulationAnchor::NextPeriod => shift_days(prediction.predicted_date, -OVULATION_DAY),
        OvulationAnchor::TodayPivot => {
            let days_until_period = (prediction.predicted_date - today).num_days();
            shift_days(prediction.predicted_date, OVULATION_DAY - days_until_period)
        }
    };

    FertilityPrediction {
        fertile_start: shift_days(ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION),
        fertile_end: shift_days(ovulation_date, FERTILE_DAYS_AFTER_OVULATION),
        ovulation_date,
        confidence: prediction.confidence * FERTILITY_CONFIDENCE_FACTOR,
    }
}

/// Whether `today` falls inside the freshly computed fertile window
pub fn is_in_fertility_window(today: NaiveDate, history: &[PeriodRecord]) -> bool {
    predict_fertility_window(history, today).contains(today)
}

/// 1-indexed day of the current cycle
pub fn current_cycle_day(today: NaiveDate, last_period_start: NaiveDate) -> i64 {
    (today - last_period_start).num_days() + 1
}

/// Cycle day relative to the most recent period in the history
pub fn current_cycle_day_for(history: &[PeriodRecord], today: NaiveDate) -> Option<i64> {
    history
        .iter()
        .map(|p| p.start_date)
        .max()
        .map(|last| current_cycle_day(today, last))
}

/// Fraction of the average cycle elapsed, clamped to [0, 1]
pub fn cycle_progress(history: &[PeriodRecord], today: NaiveDate) -> Option<f64> {
    let day = current_cycle_day_for(history, today)?;
    let average = statistics::average_cycle_length(history);
    if average <= 0.0 {
        return None;
    }
    Some((day as f64 / average).clamp(0.0, 1.0))
}

/// Phase of the current cycle
pub fn current_phase(history: &[PeriodRecord], today: NaiveDate) -> Option<CyclePhase> {
    current_cycle_day_for(history, today).map(CyclePhase::from_cycle_day)
}
