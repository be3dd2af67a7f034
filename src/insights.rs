//! Insight generation
//!
//! Turns a period history and symptom log into short natural-language
//! statements for the presentation layer. Output branches on how much
//! history is available: none, one or two periods, or three and more.

use crate::predictor::{self, OvulationAnchor, SIGNIFICANT_TREND_STRENGTH};
use crate::statistics::{self, sorted_by_start};
use crate::types::{
    ConfidenceLevel, CycleInsights, CyclePhase, PeriodRecord, SymptomRecord, TrendDirection,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Periods needed for the full insight set
pub const FULL_INSIGHT_RECORDS: usize = 3;

/// Variability (days) up to which cycles are "very regular"
pub const VERY_REGULAR_VARIABILITY: f64 = 3.0;

/// Variability (days) up to which cycles are "moderately regular"
pub const MODERATELY_REGULAR_VARIABILITY: f64 = 7.0;

/// Number of symptoms listed in the frequency correlation
pub const TOP_SYMPTOM_COUNT: usize = 3;

const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

/// Generate cycle insights and health correlations
pub fn generate_insights(
    history: &[PeriodRecord],
    symptoms: &[SymptomRecord],
    today: NaiveDate,
) -> CycleInsights {
    generate_insights_with(history, symptoms, today, OvulationAnchor::default())
}

/// Generate insights with the fertile window placed by `anchor`
pub fn generate_insights_with(
    history: &[PeriodRecord],
    symptoms: &[SymptomRecord],
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> CycleInsights {
    match history.len() {
        0 => no_data_insights(),
        n if n < FULL_INSIGHT_RECORDS => early_insights(history, today),
        _ => full_insights(history, symptoms, today, anchor),
    }
}

fn no_data_insights() -> CycleInsights {
    CycleInsights {
        cycle_insights: vec![
            "Not enough data yet to analyze your cycle.".to_string(),
            "Log your first period to start building predictions.".to_string(),
            "Predictions become more accurate after three or more cycles.".to_string(),
        ],
        health_correlations: vec![
            "Health correlations will appear once you have logged a few cycles.".to_string(),
            "Symptom patterns need at least one logged period to line up against.".to_string(),
            "Fertility estimates need at least two logged periods.".to_string(),
        ],
    }
}

fn early_insights(history: &[PeriodRecord], today: NaiveDate) -> CycleInsights {
    let count = history.len();
    let prediction = predictor::predict_next_period(history, today);

    CycleInsights {
        cycle_insights: vec![
            format!(
                "You have logged {} period{}.",
                count,
                if count == 1 { "" } else { "s" }
            ),
            format!(
                "Average cycle length is {:.1} days and periods last {:.1} days on average.",
                statistics::average_cycle_length(history),
                statistics::average_period_length(history)
            ),
            format!(
                "Next period predicted for {} ({} confidence).",
                prediction.predicted_date.format(DISPLAY_DATE_FORMAT),
                prediction.confidence_label
            ),
        ],
        health_correlations: vec![
            "Keep logging periods to unlock trend and regularity analysis.".to_string(),
            "Log symptoms daily to see how they line up with your cycle.".to_string(),
        ],
    }
}

fn full_insights(
    history: &[PeriodRecord],
    symptoms: &[SymptomRecord],
    today: NaiveDate,
    anchor: OvulationAnchor,
) -> CycleInsights {
    let prediction = predictor::predict_next_period(history, today);
    let fertility = predictor::fertility_from_prediction(&prediction, today, anchor);

    let mut cycle_insights = Vec::new();
    let mut health_correlations = Vec::new();

    cycle_insights.push(format!(
        "Your cycles are {} (variability {:.1} days).",
        regularity(prediction.variability),
        prediction.variability
    ));

    cycle_insights.push(format!(
        "Average cycle length is {:.1} days and periods last {:.1} days on average.",
        statistics::average_cycle_length(history),
        statistics::average_period_length(history)
    ));

    let days_until_next = (prediction.predicted_date - today).num_days();
    let formatted_date = prediction.predicted_date.format(DISPLAY_DATE_FORMAT);
    cycle_insights.push(match days_until_next {
        d if d <= 0 => "Your next period is expected today.".to_string(),
        1 => format!("Your next period is expected tomorrow ({formatted_date})."),
        d => format!("Your next period is expected in {d} days ({formatted_date})."),
    });

    cycle_insights.push(
        match prediction.confidence_label {
            ConfidenceLevel::High => {
                "Prediction confidence is high: your history is consistent enough to plan around this date."
            }
            ConfidenceLevel::Medium => {
                "Prediction confidence is medium: allow a few days either side of the predicted date."
            }
            ConfidenceLevel::Low => {
                "Prediction confidence is low: keep logging periods to sharpen the forecast."
            }
        }
        .to_string(),
    );

    if let Some(day) = predictor::current_cycle_day_for(history, today) {
        let phase = CyclePhase::from_cycle_day(day);
        cycle_insights.push(format!(
            "You are on cycle day {day}, in the {} phase. {}",
            phase.as_str(),
            phase.description()
        ));
    }

    if fertility.contains(today) {
        health_correlations.push("You are currently in your estimated fertile window.".to_string());
    } else {
        let days_until_fertile = (fertility.fertile_start - today).num_days();
        if days_until_fertile > 0 {
            health_correlations.push(format!(
                "Your estimated fertile window begins in {days_until_fertile} day{}.",
                if days_until_fertile == 1 { "" } else { "s" }
            ));
        }
    }

    if !symptoms.is_empty() {
        let top = top_symptoms(symptoms, TOP_SYMPTOM_COUNT);
        if !top.is_empty() {
            let listed: Vec<String> = top
                .iter()
                .map(|(name, count)| format!("{name} ({count})"))
                .collect();
            health_correlations.push(format!("Most frequent symptoms: {}.", listed.join(", ")));
        }

        if let Some((day, count)) = most_symptomatic_cycle_day(history, symptoms) {
            health_correlations.push(format!(
                "Your most symptomatic day is cycle day {day} ({count} symptom{} logged).",
                if count == 1 { "" } else { "s" }
            ));
        }
    }

    if prediction.trend.strength > SIGNIFICANT_TREND_STRENGTH {
        let change = match prediction.trend.direction {
            TrendDirection::Increasing => "getting longer",
            TrendDirection::Decreasing => "getting shorter",
            TrendDirection::Stable => "shifting",
        };
        health_correlations.push(format!(
            "Your cycles are {change}, which can signal hormonal or lifestyle changes such as stress or sleep."
        ));
    }

    if health_correlations.is_empty() {
        health_correlations
            .push("No notable correlations yet. Keep logging symptoms to surface patterns.".to_string());
    }

    CycleInsights {
        cycle_insights,
        health_correlations,
    }
}

/// Regularity classification from cycle variability
pub fn regularity(variability: f64) -> &'static str {
    if variability <= VERY_REGULAR_VARIABILITY {
        "very regular"
    } else if variability <= MODERATELY_REGULAR_VARIABILITY {
        "moderately regular"
    } else {
        "irregular"
    }
}

/// Most frequent symptom names, highest count first (ties by name)
pub fn top_symptoms(symptoms: &[SymptomRecord], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for symptom in symptoms {
        let name = symptom.name.trim();
        if !name.is_empty() {
            *counts.entry(name).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Cycle day with the most symptoms and its count.
///
/// Each symptom is placed on the cycle that was running when it occurred
/// (the latest period starting on or before its day). Symptoms logged before
/// the first period are ignored. Ties go to the earlier cycle day.
pub fn most_symptomatic_cycle_day(
    history: &[PeriodRecord],
    symptoms: &[SymptomRecord],
) -> Option<(i64, usize)> {
    let starts: Vec<NaiveDate> = sorted_by_start(history)
        .into_iter()
        .map(|p| p.start_date)
        .collect();

    let mut by_day: BTreeMap<i64, usize> = BTreeMap::new();
    for symptom in symptoms {
        let day = symptom.day();
        let idx = starts.partition_point(|start| *start <= day);
        if idx == 0 {
            continue;
        }
        let cycle_day = predictor::current_cycle_day(day, starts[idx - 1]);
        *by_day.entry(cycle_day).or_default() += 1;
    }

    by_day
        .into_iter()
        .fold(None, |best, (day, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((day, count)),
        })
}

/// Group symptoms by calendar day for history views
pub fn group_symptoms_by_day(symptoms: &[SymptomRecord]) -> BTreeMap<NaiveDate, Vec<&SymptomRecord>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&SymptomRecord>> = BTreeMap::new();
    for symptom in symptoms {
        grouped.entry(symptom.day()).or_default().push(symptom);
    }
    for day in grouped.values_mut() {
        day.sort_by_key(|s| s.date);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_date, FlowIntensity, Severity};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn history_from_lengths(start: &str, lengths: &[i64]) -> Vec<PeriodRecord> {
        let mut day = date(start);
        let mut records = vec![PeriodRecord::new("p0", day, 5, FlowIntensity::Medium).unwrap()];
        for (i, length) in lengths.iter().enumerate() {
            day += Duration::days(*length);
            records.push(
                PeriodRecord::new(format!("p{}", i + 1), day, 4, FlowIntensity::Light).unwrap(),
            );
        }
        records
    }

    fn symptom(name: &str, day: &str, hour: u32) -> SymptomRecord {
        let d = date(day);
        SymptomRecord::new(
            name,
            Severity::Moderate,
            Utc.from_utc_datetime(&d.and_hms_opt(hour, 0, 0).unwrap()),
        )
    }

    #[test]
    fn test_no_data_insights() {
        let insights = generate_insights(&[], &[], date("2026-10-16"));
        assert_eq!(insights.cycle_insights.len(), 3);
        assert_eq!(insights.health_correlations.len(), 3);
        assert!(insights.cycle_insights[0].contains("Not enough data"));
    }

    #[test]
    fn test_early_insights() {
        let history = history_from_lengths("2026-01-01", &[28]);
        let insights = generate_insights(&history, &[], date("2026-02-10"));

        assert_eq!(
            insights.cycle_insights,
            vec![
                "You have logged 2 periods.".to_string(),
                "Average cycle length is 28.0 days and periods last 4.5 days on average."
                    .to_string(),
                "Next period predicted for February 26, 2026 (Low confidence).".to_string(),
            ]
        );
        assert!(insights.health_correlations[0].contains("Keep logging"));
    }

    #[test]
    fn test_single_period_uses_default_cycle_length() {
        let history = history_from_lengths("2026-01-01", &[]);
        let insights = generate_insights(&history, &[], date("2026-01-10"));
        assert_eq!(insights.cycle_insights[0], "You have logged 1 period.");
        assert!(insights.cycle_insights[1].starts_with("Average cycle length is 28.0 days"));
    }

    #[test]
    fn test_full_insights_regular_history() {
        // Onsets Jan 1, Jan 29, Feb 26, Mar 26, Apr 23, May 21 -> next Jun 18
        let history = history_from_lengths("2026-01-01", &[28, 28, 28, 28, 28]);
        let today = date("2026-06-01");
        let insights = generate_insights(&history, &[], today);

        assert_eq!(
            insights.cycle_insights[0],
            "Your cycles are very regular (variability 0.0 days)."
        );
        assert_eq!(
            insights.cycle_insights[2],
            "Your next period is expected in 17 days (June 18, 2026)."
        );
        assert!(insights.cycle_insights[3].contains("confidence is high"));
        assert!(insights.cycle_insights[4].contains("cycle day 12, in the follicular phase"));
        // Ovulation Jun 4, window May 30 - Jun 5
        assert_eq!(
            insights.health_correlations,
            vec!["You are currently in your estimated fertile window.".to_string()]
        );
    }

    #[test]
    fn test_fertile_window_insight_follows_anchor() {
        let history = history_from_lengths("2026-01-01", &[28, 28, 28, 28, 28]);
        let today = date("2026-06-01");
        let insights =
            generate_insights_with(&history, &[], today, OvulationAnchor::TodayPivot);
        // Window pivots to Jun 10 - Jun 16
        assert_eq!(
            insights.health_correlations[0],
            "Your estimated fertile window begins in 9 days."
        );
    }

    #[test]
    fn test_days_until_next_when_overdue() {
        let history = history_from_lengths("2026-01-01", &[28, 28]);
        let insights = generate_insights(&history, &[], date("2026-04-10"));
        assert_eq!(insights.cycle_insights[2], "Your next period is expected today.");
    }

    #[test]
    fn test_upcoming_fertile_window() {
        let history = history_from_lengths("2026-01-01", &[28, 28, 28, 28, 28]);
        // Cycle day 2; window starts May 30
        let insights = generate_insights(&history, &[], date("2026-05-22"));
        assert!(insights.cycle_insights[4].contains("menstrual phase"));
        assert_eq!(
            insights.health_correlations[0],
            "Your estimated fertile window begins in 8 days."
        );
    }

    #[test]
    fn test_trend_and_irregular_correlation() {
        let history = history_from_lengths("2026-01-01", &[25, 26, 35, 36, 37]);
        let insights = generate_insights(&history, &[], date("2026-06-20"));
        assert!(insights.cycle_insights[0].contains("moderately regular"));
        assert!(insights
            .health_correlations
            .iter()
            .any(|c| c.contains("getting longer")));
    }

    #[test]
    fn test_symptom_correlations() {
        let history = history_from_lengths("2026-01-01", &[28, 28]);
        let symptoms = vec![
            symptom("cramps", "2026-01-01", 8),
            symptom("cramps", "2026-01-29", 9),
            symptom("cramps", "2026-02-26", 7),
            symptom("headache", "2026-01-02", 12),
            symptom("fatigue", "2026-01-29", 18),
            symptom("bloating", "2026-02-10", 10),
            symptom("acne", "2025-12-20", 10),
        ];
        let insights = generate_insights(&history, &symptoms, date("2026-03-01"));

        assert!(insights
            .health_correlations
            .contains(&"Most frequent symptoms: cramps (3), acne (1), bloating (1).".to_string()));
        assert!(insights.health_correlations.contains(
            &"Your most symptomatic day is cycle day 1 (4 symptoms logged).".to_string()
        ));
    }

    #[test]
    fn test_most_symptomatic_day_ties_prefer_earlier_day() {
        let history = history_from_lengths("2026-01-01", &[28]);
        let symptoms = vec![
            symptom("cramps", "2026-01-03", 8),
            symptom("headache", "2026-01-02", 8),
        ];
        assert_eq!(most_symptomatic_cycle_day(&history, &symptoms), Some((2, 1)));
        assert_eq!(most_symptomatic_cycle_day(&[], &symptoms), None);
    }

    #[test]
    fn test_regularity_thresholds() {
        assert_eq!(regularity(3.0), "very regular");
        assert_eq!(regularity(3.1), "moderately regular");
        assert_eq!(regularity(7.0), "moderately regular");
        assert_eq!(regularity(7.5), "irregular");
    }

    #[test]
    fn test_group_symptoms_by_day() {
        let symptoms = vec![
            symptom("fatigue", "2026-01-02", 20),
            symptom("cramps", "2026-01-02", 8),
            symptom("acne", "2026-01-05", 8),
        ];
        let grouped = group_symptoms_by_day(&symptoms);
        assert_eq!(grouped.len(), 2);
        let first_day = &grouped[&date("2026-01-02")];
        assert_eq!(first_day[0].name, "cramps");
        assert_eq!(first_day[1].name, "fatigue");
    }
}
