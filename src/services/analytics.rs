// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Analytics over the completion ledger.
//!
//! All computations here are pure: the route handler fetches ledger
//! slices from Firestore (concurrently) and hands them to these
//! functions. Grouping keys are the `YYYY-MM-DD` day keys written by
//! the ledger, so aggregation and storage always agree on day
//! boundaries.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{Completion, Habit};
use crate::time_utils::day_key;

/// Maximum days examined when walking a streak backward.
/// A fully-completed window reports a streak of exactly this value.
pub const STREAK_LOOKBACK_DAYS: i64 = 365;

/// Length of the daily completion series.
pub const SERIES_DAYS: i64 = 7;

/// Default number of habits in the ranking.
pub const TOP_HABITS_LIMIT: usize = 5;

/// One point of the daily completion series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesPoint {
    pub date: String,
    pub count: u32,
}

/// One entry of the top-habit ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopHabit {
    pub id: String,
    pub title: String,
    pub color: String,
    pub count: u32,
}

/// Count consecutive days with at least one completion, walking
/// backward from `as_of` inclusive. Stops at the first day with no
/// completion; capped at [`STREAK_LOOKBACK_DAYS`].
pub fn current_streak(completions: &[Completion], as_of: NaiveDate) -> u32 {
    let completed_days: HashSet<&str> = completions
        .iter()
        .map(|c| c.completed_on.as_str())
        .collect();

    let mut streak = 0;
    for offset in 0..STREAK_LOOKBACK_DAYS {
        let key = day_key(as_of - Duration::days(offset));
        if completed_days.contains(key.as_str()) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Daily completion counts for `as_of - 6 ..= as_of`.
///
/// Always exactly [`SERIES_DAYS`] points, oldest first; days without
/// completions carry an explicit count of 0.
pub fn last7_series(completions: &[Completion], as_of: NaiveDate) -> Vec<SeriesPoint> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for completion in completions {
        *counts.entry(completion.completed_on.as_str()).or_insert(0) += 1;
    }

    (0..SERIES_DAYS)
        .map(|offset| {
            let date = day_key(as_of - Duration::days(SERIES_DAYS - 1 - offset));
            let count = counts.get(date.as_str()).copied().unwrap_or(0);
            SeriesPoint { date, count }
        })
        .collect()
}

/// Percentage of the theoretical maximum completions this month:
/// `round(completions / (habits × elapsed days) × 100)`.
///
/// Returns 0 when the user has no habits. The denominator assumes
/// every habit could complete every elapsed day; per-habit frequency
/// and schedule days are intentionally not accounted for, so weekly
/// habits read lower than their own cadence would suggest.
pub fn monthly_completion_rate(
    total_habits: u32,
    completions_this_month: u32,
    day_of_month: u32,
) -> u32 {
    if total_habits == 0 {
        return 0;
    }

    let possible = (total_habits * day_of_month) as f64;
    ((completions_this_month as f64 / possible) * 100.0).round() as u32
}

/// Rank habits by all-time completion count, descending.
///
/// Takes the `limit` largest groups, then joins display metadata from
/// the user's habit list. Groups whose habit no longer exists are
/// dropped. Ordering among equal counts is unspecified.
pub fn top_habits(completions: &[Completion], habits: &[Habit], limit: usize) -> Vec<TopHabit> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for completion in completions {
        *counts.entry(completion.habit_id.as_str()).or_insert(0) += 1;
    }

    let by_id: HashMap<&str, &Habit> = habits.iter().map(|h| (h.id.as_str(), h)).collect();

    let mut ranked: Vec<(&str, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(limit)
        .filter_map(|(habit_id, count)| {
            by_id.get(habit_id).map(|habit| TopHabit {
                id: habit.id.clone(),
                title: habit.title.clone(),
                color: habit.color.clone(),
                count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::habit::{default_color, default_frequency};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn completion(habit_id: &str, completed_on: NaiveDate) -> Completion {
        let key = day_key(completed_on);
        Completion {
            id: Completion::doc_id(habit_id, &key),
            habit_id: habit_id.to_string(),
            user_id: "user1".to_string(),
            completed_on: key,
            created_at: "2024-01-15T12:00:00Z".to_string(),
        }
    }

    fn habit(id: &str, title: &str) -> Habit {
        Habit {
            id: id.to_string(),
            user_id: "user1".to_string(),
            title: title.to_string(),
            description: String::new(),
            frequency: default_frequency(),
            color: default_color(),
            schedule_days: vec![],
            reminder_time: None,
            order: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_streak_zero_without_completions() {
        assert_eq!(current_streak(&[], day(2024, 3, 10)), 0);
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let as_of = day(2024, 3, 10);
        let completions = vec![
            completion("h1", day(2024, 3, 10)),
            completion("h2", day(2024, 3, 9)),
            completion("h1", day(2024, 3, 8)),
            // gap on 2024-03-07
            completion("h1", day(2024, 3, 6)),
        ];

        assert_eq!(current_streak(&completions, as_of), 3);
    }

    #[test]
    fn test_streak_broken_today_is_zero() {
        let as_of = day(2024, 3, 10);
        let completions = vec![
            completion("h1", day(2024, 3, 9)),
            completion("h1", day(2024, 3, 8)),
        ];

        // No completion on as_of itself, so the walk stops immediately
        assert_eq!(current_streak(&completions, as_of), 0);
    }

    #[test]
    fn test_streak_multiple_habits_same_day_count_once() {
        let as_of = day(2024, 3, 10);
        let completions = vec![
            completion("h1", day(2024, 3, 10)),
            completion("h2", day(2024, 3, 10)),
            completion("h3", day(2024, 3, 10)),
        ];

        assert_eq!(current_streak(&completions, as_of), 1);
    }

    #[test]
    fn test_streak_caps_at_lookback_window() {
        let as_of = day(2024, 3, 10);
        let completions: Vec<Completion> = (0..500)
            .map(|i| completion("h1", as_of - Duration::days(i)))
            .collect();

        assert_eq!(current_streak(&completions, as_of), 365);
    }

    #[test]
    fn test_series_always_seven_points() {
        let as_of = day(2024, 3, 10);
        let series = last7_series(&[], as_of);

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, "2024-03-04");
        assert_eq!(series[6].date, "2024-03-10");
        assert!(series.iter().all(|p| p.count == 0));
    }

    #[test]
    fn test_series_counts_and_zero_fill() {
        let as_of = day(2024, 3, 10);
        let completions = vec![
            completion("h1", day(2024, 3, 10)),
            completion("h2", day(2024, 3, 10)),
            completion("h1", day(2024, 3, 6)),
            // Outside the window, must not be counted
            completion("h1", day(2024, 3, 3)),
        ];

        let series = last7_series(&completions, as_of);

        assert_eq!(series.len(), 7);
        assert_eq!(series[6].count, 2); // 2024-03-10
        assert_eq!(series[2].count, 1); // 2024-03-06
        assert_eq!(series[0].count, 0); // 2024-03-04
        let total: u32 = series.iter().map(|p| p.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_series_spans_month_boundary() {
        let as_of = day(2024, 3, 2);
        let series = last7_series(&[], as_of);

        assert_eq!(series[0].date, "2024-02-25");
        assert_eq!(series[6].date, "2024-03-02");
    }

    #[test]
    fn test_rate_zero_habits_no_division() {
        assert_eq!(monthly_completion_rate(0, 8, 10), 0);
    }

    #[test]
    fn test_rate_example_40_percent() {
        // 2 habits, the 10th of the month, 8 completions: 8/(2*10) = 40%
        assert_eq!(monthly_completion_rate(2, 8, 10), 40);
    }

    #[test]
    fn test_rate_rounds_to_nearest() {
        // 1/(3*1) = 33.33 -> 33; 2/(3*1) = 66.67 -> 67
        assert_eq!(monthly_completion_rate(3, 1, 1), 33);
        assert_eq!(monthly_completion_rate(3, 2, 1), 67);
    }

    #[test]
    fn test_rate_full_month_is_100() {
        assert_eq!(monthly_completion_rate(2, 20, 10), 100);
    }

    #[test]
    fn test_top_habits_sorted_and_limited() {
        let habits = vec![habit("h1", "Read"), habit("h2", "Run"), habit("h3", "Meditate")];
        let mut completions = Vec::new();
        for i in 0..5 {
            completions.push(completion("h2", day(2024, 3, 1 + i)));
        }
        for i in 0..3 {
            completions.push(completion("h1", day(2024, 3, 1 + i)));
        }
        completions.push(completion("h3", day(2024, 3, 1)));

        let ranked = top_habits(&completions, &habits, 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "h2");
        assert_eq!(ranked[0].count, 5);
        assert_eq!(ranked[0].title, "Run");
        assert_eq!(ranked[1].id, "h1");
        assert_eq!(ranked[1].count, 3);
    }

    #[test]
    fn test_top_habits_drops_missing_habit() {
        let habits = vec![habit("h1", "Read")];
        let completions = vec![
            completion("h1", day(2024, 3, 1)),
            completion("ghost", day(2024, 3, 1)),
            completion("ghost", day(2024, 3, 2)),
        ];

        let ranked = top_habits(&completions, &habits, 5);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "h1");
    }

    #[test]
    fn test_top_habits_empty_ledger() {
        let habits = vec![habit("h1", "Read")];
        assert!(top_habits(&[], &habits, 5).is_empty());
    }
}
