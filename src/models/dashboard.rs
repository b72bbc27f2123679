// src/models/dashboard.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Accuracy line of the student overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStat {
    pub subject: String,
    pub questions_attempted: i32,
    /// 0 when nothing was attempted yet.
    pub accuracy: f64,
}

/// Accuracy line of a parent's child view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildSubject {
    pub subject: String,
    pub accuracy: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakSubject {
    pub subject: String,
    pub accuracy: f64,
}

#[derive(Debug, Serialize)]
pub struct StudentSummary {
    pub name: String,
    pub class: Option<String>,
    pub subscription: String,
}

#[derive(Debug, Serialize)]
pub struct OverviewStats {
    pub total_questions_solved: i64,
    pub questions_today: i64,
    pub questions_this_week: i64,
    pub total_exams_taken: i64,
    pub average_exam_score: f64,
    pub study_streak_days: i64,
}

#[derive(Debug, Serialize)]
pub struct ActivePlanSummary {
    pub id: i64,
    pub name: String,
    pub completion: i32,
    pub exam_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StudentOverview {
    pub user: StudentSummary,
    pub stats: OverviewStats,
    pub subject_performance: Vec<SubjectStat>,
    pub weakest_subject: Option<String>,
    pub active_study_plan: Option<ActivePlanSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressChartParams {
    pub days: Option<i64>,
}

/// Questions solved on one calendar day.
#[derive(Debug, Serialize, FromRow)]
pub struct DailyActivity {
    pub date: chrono::NaiveDate,
    pub questions_solved: i64,
}

#[derive(Debug, Serialize)]
pub struct ProgressChart {
    pub period_days: i64,
    pub data: Vec<DailyActivity>,
}

#[derive(Debug, Serialize)]
pub struct ChildStats {
    pub total_questions: i64,
    pub recent_exam_scores: Vec<i32>,
    pub average_score: f64,
    pub weekly_study_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct ChildOverview {
    pub child_id: i64,
    pub name: String,
    pub class: Option<String>,
    pub email: String,
    pub stats: ChildStats,
    pub subjects: Vec<ChildSubject>,
    pub weak_subjects: Vec<WeakSubject>,
    pub last_active: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ParentSummary {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ParentDashboard {
    pub parent: ParentSummary,
    pub total_children: usize,
    pub children: Vec<ChildOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkChildResponse {
    pub message: String,
    pub child_id: i64,
    pub child_name: String,
    pub child_email: String,
}

#[derive(Debug, Serialize)]
pub struct ChildProfile {
    pub name: String,
    pub class: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ChildReportSummary {
    pub total_questions: i64,
    pub total_exams: usize,
    pub last_active: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RecentActivity {
    pub date: chrono::DateTime<chrono::Utc>,
    pub subject: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ExamHistoryEntry {
    pub date: Option<chrono::DateTime<chrono::Utc>>,
    pub subject: String,
    pub score: i32,
    pub weak_topics: Option<Json<Vec<String>>>,
}

#[derive(Debug, Serialize)]
pub struct ChildReport {
    pub child: ChildProfile,
    pub summary: ChildReportSummary,
    pub recent_activity: Vec<RecentActivity>,
    pub exam_history: Vec<ExamHistoryEntry>,
    pub recommendations: Vec<&'static str>,
}
