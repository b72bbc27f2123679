// src/services/stats.rs

//! Read-side arithmetic for dashboards, profiles, study plans and solutions.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::models::{
    dashboard::{ChildSubject, SubjectStat, WeakSubject},
    study_plan::{DailySchedule, WeekPlan},
    user::SubjectPerformance,
};

/// Weeks assumed when a plan has no exam date.
pub const DEFAULT_PLAN_WEEKS: i64 = 12;
const DEFAULT_SESSION_MINUTES: i32 = 60;
const DEFAULT_TIME_SLOT: &str = "Morning/Afternoon";
const DEFAULT_ACTIVITY: &str = "study";

/// Rounds to two decimals, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of correct answers, or `None` before any attempt.
pub fn accuracy(correct: i32, attempted: i32) -> Option<f64> {
    if attempted <= 0 {
        return None;
    }
    Some(round2(f64::from(correct) * 100.0 / f64::from(attempted)))
}

/// Consecutive days with activity, counting back from `today`.
/// A day without activity today means no streak.
pub fn study_streak(activity_dates: &[NaiveDate], today: NaiveDate) -> i64 {
    let days: BTreeSet<NaiveDate> = activity_dates.iter().copied().collect();

    let mut streak = 0;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    streak
}

/// Subject accuracies, weakest first. Ties keep their original order.
pub fn subject_stats(subjects: &[SubjectPerformance]) -> Vec<SubjectStat> {
    let mut stats: Vec<SubjectStat> = subjects
        .iter()
        .map(|s| SubjectStat {
            subject: s.subject_name.clone(),
            questions_attempted: s.total_questions_attempted,
            accuracy: accuracy(s.correct_answers, s.total_questions_attempted).unwrap_or(0.0),
        })
        .collect();
    stats.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
    stats
}

/// The lowest-accuracy subject with enough attempts to judge.
pub fn weakest_subject(sorted_stats: &[SubjectStat], min_attempts: i32) -> Option<String> {
    sorted_stats
        .iter()
        .find(|s| s.questions_attempted >= min_attempts)
        .map(|s| s.subject.clone())
}

/// A child's attempted subjects, plus those under the weak threshold.
pub fn child_subjects(
    subjects: &[SubjectPerformance],
    weak_below: f64,
) -> (Vec<ChildSubject>, Vec<WeakSubject>) {
    let mut all = Vec::new();
    let mut weak = Vec::new();

    for s in subjects {
        let Some(acc) = accuracy(s.correct_answers, s.total_questions_attempted) else {
            continue;
        };
        if acc < weak_below {
            weak.push(WeakSubject {
                subject: s.subject_name.clone(),
                accuracy: acc,
            });
        }
        all.push(ChildSubject {
            subject: s.subject_name.clone(),
            accuracy: acc,
            total_questions: s.total_questions_attempted,
            correct_answers: s.correct_answers,
        });
    }

    (all, weak)
}

pub fn average(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    round2(sum as f64 / values.len() as f64)
}

/// Whole weeks left before the exam, at least one.
pub fn weeks_until_exam(exam_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match exam_date {
        Some(date) => ((date - now).num_days() / 7).max(1),
        None => DEFAULT_PLAN_WEEKS,
    }
}

/// Flattens a weekly breakdown into daily lines.
pub fn flatten_schedule(weeks: &[WeekPlan]) -> Vec<DailySchedule> {
    weeks
        .iter()
        .flat_map(|week| week.daily_schedule.iter())
        .map(|day| DailySchedule {
            day: day.day.clone(),
            time_slot: DEFAULT_TIME_SLOT.to_string(),
            subject: day.subject.clone(),
            topic: day.topic.clone(),
            duration_minutes: day.duration_minutes.unwrap_or(DEFAULT_SESSION_MINUTES),
            activity_type: day
                .activities
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_ACTIVITY.to_string()),
        })
        .collect()
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// "final_velocity" becomes "Final Velocity".
fn title_case(key: &str) -> String {
    key.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Human-readable rendering of a model solution for API responses.
pub fn solution_for_display(solution: &Value) -> String {
    match solution {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}: {}", title_case(key), plain(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("• {}", plain(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => plain(other),
    }
}

/// Storage rendering: strings verbatim, structures as pretty JSON.
pub fn solution_for_storage(solution: &Value) -> String {
    match solution {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(solution).unwrap_or_else(|_| solution.to_string())
        }
        other => plain(other),
    }
}
