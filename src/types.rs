//! Core types for the Synheart Cycle engine
//!
//! This module defines the records the engine consumes (periods, symptoms,
//! device flow samples) and the derived values it produces (predictions,
//! fertility windows, insights, snapshots).

use crate::error::CycleError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Confidence at or above this score is labelled High
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Confidence at or above this score (and below High) is labelled Medium
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Calendar date format used across payloads
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest period a record may carry
pub const MAX_PERIOD_DURATION_DAYS: u32 = 31;

/// Move a date by a number of days, saturating at the calendar bounds
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Result<NaiveDate, CycleError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| CycleError::DateParseError(format!("{value}: {e}")))
}

/// Bleeding intensity of a recorded period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowIntensity {
    Light,
    Medium,
    Heavy,
}

impl FlowIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowIntensity::Light => "light",
            FlowIntensity::Medium => "medium",
            FlowIntensity::Heavy => "heavy",
        }
    }
}

/// A single recorded period.
///
/// Records are never edited in place; an update replaces the record that
/// carries the same `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Opaque identifier, unique per record
    pub id: String,
    /// Onset date
    pub start_date: NaiveDate,
    /// Number of bleeding days (at least 1)
    pub duration_days: u32,
    /// Flow intensity
    pub flow_intensity: FlowIntensity,
}

impl PeriodRecord {
    /// Create a validated record
    pub fn new(
        id: impl Into<String>,
        start_date: NaiveDate,
        duration_days: u32,
        flow_intensity: FlowIntensity,
    ) -> Result<Self, CycleError> {
        let record = Self {
            id: id.into(),
            start_date,
            duration_days,
            flow_intensity,
        };
        record.validate()?;
        Ok(record)
    }

    /// Create a validated record with a freshly generated id
    pub fn with_generated_id(
        start_date: NaiveDate,
        duration_days: u32,
        flow_intensity: FlowIntensity,
    ) -> Result<Self, CycleError> {
        Self::new(Uuid::new_v4().to_string(), start_date, duration_days, flow_intensity)
    }

    /// Last bleeding day (inclusive)
    pub fn end_date(&self) -> NaiveDate {
        shift_days(self.start_date, i64::from(self.duration_days.max(1)) - 1)
    }

    pub fn validate(&self) -> Result<(), CycleError> {
        if self.id.trim().is_empty() {
            return Err(CycleError::InvalidRecord(
                "period id must not be empty".to_string(),
            ));
        }
        if self.duration_days == 0 {
            return Err(CycleError::InvalidRecord(format!(
                "period {} has a zero-day duration",
                self.id
            )));
        }
        if self.duration_days > MAX_PERIOD_DURATION_DAYS {
            return Err(CycleError::InvalidRecord(format!(
                "period {} lasts {} days (at most {MAX_PERIOD_DURATION_DAYS})",
                self.id, self.duration_days
            )));
        }
        Ok(())
    }
}

/// Symptom severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// A user-entered symptom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub id: String,
    /// Free-text or canonical label (e.g. "cramps")
    pub name: String,
    pub severity: Severity,
    /// When the symptom occurred
    pub date: DateTime<Utc>,
}

impl SymptomRecord {
    /// Create a symptom with a freshly generated id
    pub fn new(name: impl Into<String>, severity: Severity, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            severity,
            date,
        }
    }

    /// Calendar day the symptom belongs to
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// Flow reading reported by the device health source for one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFlow {
    /// Flow was logged without a level
    Unspecified,
    None,
    Light,
    Medium,
    Heavy,
}

impl SampleFlow {
    /// Whether this reading counts as a bleeding day
    pub fn is_flow(&self) -> bool {
        !matches!(self, SampleFlow::None)
    }

    pub fn intensity(&self) -> Option<FlowIntensity> {
        match self {
            SampleFlow::Light => Some(FlowIntensity::Light),
            SampleFlow::Medium => Some(FlowIntensity::Medium),
            SampleFlow::Heavy => Some(FlowIntensity::Heavy),
            SampleFlow::Unspecified | SampleFlow::None => None,
        }
    }
}

/// Per-day menstrual flow sample from the device health source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSample {
    pub date: NaiveDate,
    pub flow: SampleFlow,
}

/// Immutable snapshot of everything the engine reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleHistory {
    #[serde(default)]
    pub periods: Vec<PeriodRecord>,
    #[serde(default)]
    pub symptoms: Vec<SymptomRecord>,
}

impl CycleHistory {
    pub fn new(periods: Vec<PeriodRecord>, symptoms: Vec<SymptomRecord>) -> Self {
        let mut history = Self { periods, symptoms };
        history.sort();
        history
    }

    /// Restore ascending date order of periods and symptoms
    pub fn sort(&mut self) {
        self.periods.sort_by_key(|p| p.start_date);
        self.symptoms.sort_by_key(|s| s.date);
    }

    /// Validate every period and check id and start-date uniqueness
    pub fn validate(&self) -> Result<(), CycleError> {
        let mut seen_ids = HashSet::new();
        let mut seen_starts = HashMap::new();
        for period in &self.periods {
            period.validate()?;
            if !seen_ids.insert(period.id.as_str()) {
                return Err(CycleError::DuplicateId(period.id.clone()));
            }
            if let Some(other) = seen_starts.insert(period.start_date, period.id.as_str()) {
                return Err(shared_start_error(other, period));
            }
        }
        Ok(())
    }

    /// Reject `record` if a period with another id already starts on its day
    pub fn check_start_available(&self, record: &PeriodRecord) -> Result<(), CycleError> {
        match self
            .periods
            .iter()
            .find(|p| p.start_date == record.start_date && p.id != record.id)
        {
            Some(other) => Err(shared_start_error(&other.id, record)),
            None => Ok(()),
        }
    }
}

fn shared_start_error(other_id: &str, period: &PeriodRecord) -> CycleError {
    CycleError::InvalidRecord(format!(
        "periods {} and {} both start on {}",
        other_id, period.id, period.start_date
    ))
}

/// Coarse display bucket for a prediction's confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Bucket a continuous score; the High boundary is inclusive
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= MEDIUM_CONFIDENCE_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of the cycle-length trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Stable,
    Increasing,
    Decreasing,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Stable => "stable",
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
        }
    }
}

/// Trend in cycle length between the earlier and later half of the history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleTrend {
    pub direction: TrendDirection,
    /// Days added to the predicted date
    pub adjustment: f64,
    /// 0 (none) to 1 (a 5+ day shift)
    pub strength: f64,
}

impl CycleTrend {
    pub const fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            adjustment: 0.0,
            strength: 0.0,
        }
    }
}

impl Default for CycleTrend {
    fn default() -> Self {
        Self::stable()
    }
}

/// Forecast of the next period onset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePrediction {
    /// Predicted onset of the next period
    pub predicted_date: NaiveDate,
    /// Predicted last bleeding day of that period
    pub predicted_end: NaiveDate,
    /// Score in [0.1, 1.0]
    pub confidence: f64,
    pub confidence_label: ConfidenceLevel,
    /// Human-readable summary of the inputs
    pub reasoning: String,
    pub interval_low: NaiveDate,
    pub interval_high: NaiveDate,
    /// Number of period records the forecast used
    pub record_count: usize,
    /// Recency-weighted mean cycle length (None for the fallback forecast)
    pub weighted_average: Option<f64>,
    /// Mean of the last three cycle lengths
    pub recent_average: Option<f64>,
    pub trend: CycleTrend,
    /// Population standard deviation of cycle lengths
    pub variability: f64,
}

/// Estimated fertile window around the predicted ovulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilityPrediction {
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
    pub ovulation_date: NaiveDate,
    pub confidence: f64,
}

impl FertilityPrediction {
    /// Inclusive containment check
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.fertile_start <= date && date <= self.fertile_end
    }
}

/// Phase of the menstrual cycle, classified by cycle day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulatory,
    Luteal,
}

impl CyclePhase {
    /// Classify a 1-indexed cycle day
    pub fn from_cycle_day(day: i64) -> Self {
        match day {
            1..=5 => CyclePhase::Menstrual,
            6..=14 => CyclePhase::Follicular,
            15..=17 => CyclePhase::Ovulatory,
            _ => CyclePhase::Luteal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "menstrual",
            CyclePhase::Follicular => "follicular",
            CyclePhase::Ovulatory => "ovulatory",
            CyclePhase::Luteal => "luteal",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Energy is often lower; rest and iron-rich meals help.",
            CyclePhase::Follicular => "Rising estrogen usually brings more energy.",
            CyclePhase::Ovulatory => "Energy and mood typically peak around ovulation.",
            CyclePhase::Luteal => "Progesterone rises; cravings and fatigue are common.",
        }
    }
}

/// Natural-language insights for the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleInsights {
    pub cycle_insights: Vec<String>,
    pub health_correlations: Vec<String>,
}

/// Summary statistics for the stats view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub total_periods: usize,
    /// Plain mean cycle length (28 with fewer than two periods)
    pub average_cycle_length: f64,
    /// Mean bleeding days (5 with no periods)
    pub average_period_length: f64,
    pub shortest_cycle: Option<i64>,
    pub longest_cycle: Option<i64>,
    pub last_period_start: Option<NaiveDate>,
    pub last_period_end: Option<NaiveDate>,
}

/// Everything derived from one history snapshot for a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    /// The "today" the snapshot was computed for
    pub computed_for: NaiveDate,
    pub prediction: CyclePrediction,
    pub fertility: FertilityPrediction,
    pub in_fertile_window: bool,
    pub current_cycle_day: Option<i64>,
    pub cycle_progress: Option<f64>,
    pub phase: Option<CyclePhase>,
    pub stats: CycleStats,
    pub insights: CycleInsights,
}
