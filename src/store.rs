//! Cycle store
//!
//! Holds the current period and symptom history and recomputes a
//! `CycleSnapshot` after every mutation, notifying subscribed observers.
//! The history (not the snapshot) can be saved to and restored from JSON.

use crate::error::CycleError;
use crate::insights;
use crate::predictor::{self, OvulationAnchor};
use crate::statistics;
use crate::types::{CycleHistory, CycleSnapshot, PeriodRecord, SymptomRecord};
use chrono::NaiveDate;
use tracing::info;

/// Observer invoked with each freshly computed snapshot
pub type SnapshotListener = Box<dyn FnMut(&CycleSnapshot) + Send>;

/// Compute everything the presentation layer shows for `today`
pub fn build_snapshot(
    history: &CycleHistory,
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> CycleSnapshot {
    let periods = &history.periods;
    let prediction = predictor::predict_next_period(periods, today);
    let fertility = predictor::fertility_from_prediction(&prediction, today, anchor);
    let current_cycle_day = predictor::current_cycle_day_for(periods, today);

    CycleSnapshot {
        computed_for: today,
        in_fertile_window: fertility.contains(today),
        current_cycle_day,
        cycle_progress: predictor::cycle_progress(periods, today),
        phase: predictor::current_phase(periods, today),
        stats: statistics::cycle_stats(periods),
        insights: insights::generate_insights_with(periods, &history.symptoms, today, anchor),
        prediction,
        fertility,
    }
}

/// Recompute-on-write store over a cycle history
pub struct CycleStore {
    history: CycleHistory,
    today: NaiveDate,
    anchor: OvulationAnchor,
    snapshot: CycleSnapshot,
    listeners: Vec<SnapshotListener>,
}

impl std::fmt::Debug for CycleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleStore")
            .field("history", &self.history)
            .field("today", &self.today)
            .field("anchor", &self.anchor)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl CycleStore {
    /// Create an empty store
    pub fn new(today: NaiveDate) -> Self {
        Self::from_parts(CycleHistory::default(), today, OvulationAnchor::default())
    }

    /// Create a store over an existing history
    pub fn with_history(history: CycleHistory, today: NaiveDate) -> Result<Self, CycleError> {
        history.validate()?;
        Ok(Self::from_parts(history, today, OvulationAnchor::default()))
    }

    fn from_parts(mut history: CycleHistory, today: NaiveDate, anchor: OvulationAnchor) -> Self {
        history.sort();
        let snapshot = build_snapshot(&history, today, anchor);
        Self {
            history,
            today,
            anchor,
            snapshot,
            listeners: Vec::new(),
        }
    }

    /// Use a different ovulation anchor for fertility estimates
    pub fn with_anchor(mut self, anchor: OvulationAnchor) -> Self {
        self.anchor = anchor;
        self.recompute();
        self
    }

    pub fn history(&self) -> &CycleHistory {
        &self.history
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> &CycleSnapshot {
        &self.snapshot
    }

    /// Register an observer called after every recompute
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&CycleSnapshot) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Append a period; ids must be unique
    pub fn add_period(&mut self, record: PeriodRecord) -> Result<&CycleSnapshot, CycleError> {
        record.validate()?;
        if self.history.periods.iter().any(|p| p.id == record.id) {
            return Err(CycleError::DuplicateId(record.id));
        }
        self.history.check_start_available(&record)?;

        info!(id = %record.id, start = %record.start_date, "period added");
        let idx = self
            .history
            .periods
            .partition_point(|p| p.start_date <= record.start_date);
        self.history.periods.insert(idx, record);
        Ok(self.recompute())
    }

    /// Replace the period carrying the same id
    pub fn replace_period(&mut self, record: PeriodRecord) -> Result<&CycleSnapshot, CycleError> {
        record.validate()?;
        self.history.check_start_available(&record)?;
        let slot = self
            .history
            .periods
            .iter_mut()
            .find(|p| p.id == record.id)
            .ok_or_else(|| CycleError::UnknownId(record.id.clone()))?;

        info!(id = %record.id, start = %record.start_date, "period replaced");
        *slot = record;
        self.history.periods.sort_by_key(|p| p.start_date);
        Ok(self.recompute())
    }

    /// Remove a period by id, returning it
    pub fn remove_period(&mut self, id: &str) -> Result<PeriodRecord, CycleError> {
        let idx = self
            .history
            .periods
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CycleError::UnknownId(id.to_string()))?;

        let removed = self.history.periods.remove(idx);
        info!(id = %removed.id, "period removed");
        self.recompute();
        Ok(removed)
    }

    /// Append a symptom; ids must be unique
    pub fn add_symptom(&mut self, symptom: SymptomRecord) -> Result<&CycleSnapshot, CycleError> {
        if self.history.symptoms.iter().any(|s| s.id == symptom.id) {
            return Err(CycleError::DuplicateId(symptom.id));
        }

        info!(id = %symptom.id, name = %symptom.name, "symptom added");
        let idx = self
            .history
            .symptoms
            .partition_point(|s| s.date <= symptom.date);
        self.history.symptoms.insert(idx, symptom);
        Ok(self.recompute())
    }

    /// Move the store to a new day
    pub fn set_today(&mut self, today: NaiveDate) -> &CycleSnapshot {
        self.today = today;
        self.recompute()
    }

    /// Restore a store from saved history JSON
    pub fn from_json(json: &str, today: NaiveDate) -> Result<Self, CycleError> {
        let history: CycleHistory = serde_json::from_str(json)?;
        Self::with_history(history, today)
    }

    /// Serialize the history to JSON
    pub fn to_json(&self) -> Result<String, CycleError> {
        serde_json::to_string(&self.history).map_err(|e| CycleError::EncodingError(e.to_string()))
    }

    fn recompute(&mut self) -> &CycleSnapshot {
        self.snapshot = build_snapshot(&self.history, self.today, self.anchor);
        for listener in &mut self.listeners {
            listener(&self.snapshot);
        }
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_date, ConfidenceLevel, CyclePhase, FlowIntensity, Severity};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn period(id: &str, start: &str) -> PeriodRecord {
        PeriodRecord::new(id, date(start), 5, FlowIntensity::Medium).unwrap()
    }

    #[test]
    fn test_empty_store_snapshot() {
        let store = CycleStore::new(date("2026-10-16"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.prediction.confidence_label, ConfidenceLevel::Low);
        assert_eq!(snapshot.current_cycle_day, None);
        assert_eq!(snapshot.phase, None);
        assert_eq!(snapshot.stats.total_periods, 0);
        assert_eq!(snapshot.insights.cycle_insights.len(), 3);
    }

    #[test]
    fn test_add_period_recomputes_and_keeps_order() {
        let mut store = CycleStore::new(date("2026-03-01"));
        store.add_period(period("b", "2026-01-29")).unwrap();
        let snapshot = store.add_period(period("a", "2026-01-01")).unwrap();

        assert_eq!(snapshot.prediction.predicted_date, date("2026-02-26"));
        assert_eq!(store.history().periods[0].id, "a");
        assert_eq!(store.snapshot().current_cycle_day, Some(32));
        assert_eq!(store.snapshot().phase, Some(CyclePhase::Luteal));
    }

    #[test]
    fn test_duplicate_and_unknown_ids() {
        let mut store = CycleStore::new(date("2026-03-01"));
        store.add_period(period("a", "2026-01-01")).unwrap();

        assert!(matches!(
            store.add_period(period("a", "2026-02-01")),
            Err(CycleError::DuplicateId(_))
        ));
        assert!(matches!(
            store.replace_period(period("missing", "2026-02-01")),
            Err(CycleError::UnknownId(_))
        ));
        assert!(matches!(
            store.remove_period("missing"),
            Err(CycleError::UnknownId(_))
        ));
    }

    #[test]
    fn test_invalid_record_rejected() {
        let mut store = CycleStore::new(date("2026-03-01"));
        let mut bad = period("a", "2026-01-01");
        bad.duration_days = 0;
        assert!(matches!(store.add_period(bad), Err(CycleError::InvalidRecord(_))));
        assert!(store.history().periods.is_empty());
    }

    #[test]
    fn test_oversized_duration_rejected() {
        let mut store = CycleStore::new(date("2026-03-10"));
        let mut huge = period("a", "2026-01-01");
        huge.duration_days = 200_000_000;
        assert!(matches!(store.add_period(huge), Err(CycleError::InvalidRecord(_))));
        assert_eq!(store.snapshot().stats.total_periods, 0);
    }

    #[test]
    fn test_shared_start_date_rejected() {
        let mut store = CycleStore::new(date("2026-03-10"));
        store.add_period(period("manual", "2026-01-01")).unwrap();
        store.add_period(period("b", "2026-01-29")).unwrap();

        assert!(matches!(
            store.add_period(period("device", "2026-01-01")),
            Err(CycleError::InvalidRecord(_))
        ));
        assert!(matches!(
            store.replace_period(period("b", "2026-01-01")),
            Err(CycleError::InvalidRecord(_))
        ));
        assert_eq!(store.history().periods.len(), 2);
        assert!(store.snapshot().cycle_progress.is_some_and(f64::is_finite));
    }

    #[test]
    fn test_insights_agree_with_fertility_flag() {
        let starts = [
            "2026-01-01", "2026-01-29", "2026-02-26", "2026-03-26", "2026-04-23", "2026-05-21",
        ];
        let in_window_text = "You are currently in your estimated fertile window.";

        for anchor in [OvulationAnchor::NextPeriod, OvulationAnchor::TodayPivot] {
            let mut store = CycleStore::new(date("2026-06-01")).with_anchor(anchor);
            for (i, start) in starts.iter().enumerate() {
                store.add_period(period(&format!("p{i}"), start)).unwrap();
            }
            let snapshot = store.snapshot();
            let says_in_window = snapshot
                .insights
                .health_correlations
                .iter()
                .any(|c| c == in_window_text);
            assert_eq!(says_in_window, snapshot.in_fertile_window, "anchor {anchor:?}");
        }
    }

    #[test]
    fn test_replace_and_remove() {
        let mut store = CycleStore::new(date("2026-03-10"));
        store.add_period(period("a", "2026-01-01")).unwrap();
        store.add_period(period("b", "2026-01-29")).unwrap();

        let snapshot = store.replace_period(period("b", "2026-01-31")).unwrap();
        assert_eq!(snapshot.prediction.predicted_date, date("2026-03-02"));

        let removed = store.remove_period("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(store.snapshot().prediction.predicted_date, date("2026-02-28"));
        assert_eq!(store.snapshot().prediction.confidence, 0.3);
    }

    #[test]
    fn test_listeners_notified_on_every_write() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut store = CycleStore::new(date("2026-03-01"));
        store.subscribe(move |snapshot| {
            sink.lock().unwrap().push(snapshot.stats.total_periods);
        });

        store.add_period(period("a", "2026-01-01")).unwrap();
        store.add_period(period("b", "2026-01-29")).unwrap();
        store
            .add_symptom(SymptomRecord::new(
                "cramps",
                Severity::Mild,
                Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap(),
            ))
            .unwrap();
        store.set_today(date("2026-03-02"));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2, 2]);
    }

    #[test]
    fn test_json_round_trip_keeps_history() {
        let mut store = CycleStore::new(date("2026-03-01"));
        store.add_period(period("a", "2026-01-01")).unwrap();
        store.add_period(period("b", "2026-01-29")).unwrap();

        let json = store.to_json().unwrap();
        let restored = CycleStore::from_json(&json, date("2026-03-01")).unwrap();

        assert_eq!(restored.history(), store.history());
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn test_today_pivot_anchor() {
        let store = CycleStore::new(date("2026-03-01")).with_anchor(OvulationAnchor::TodayPivot);
        assert_eq!(store.snapshot().fertility.ovulation_date, date("2026-03-15"));
        assert!(!store.snapshot().in_fertile_window);
    }
}
