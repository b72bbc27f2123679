// src/models/study_plan.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// One day of an AI-generated week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyPlanEntry {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    #[serde(default)]
    pub week: i32,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub daily_schedule: Vec<DailyPlanEntry>,
}

/// Full plan returned by the AI tutor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedPlan {
    #[serde(default)]
    pub plan_overview: String,
    #[serde(default)]
    pub weekly_breakdown: Vec<WeekPlan>,
    #[serde(default)]
    pub revision_strategy: String,
    #[serde(default)]
    pub exam_preparation_tips: Vec<String>,
}

/// Inputs the tutor needs to draft a plan.
#[derive(Debug, Clone)]
pub struct StudyPlanPrompt<'a> {
    pub subjects: &'a [String],
    pub hours_per_day: i32,
    pub days_per_week: i32,
    pub weeks_until_exam: i64,
    pub weak_areas: &'a [String],
}

/// Represents the 'study_plans' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct StudyPlan {
    pub id: i64,
    pub user_id: i64,
    pub plan_name: String,
    pub target_exam: String,
    pub exam_date: Option<chrono::DateTime<chrono::Utc>>,
    pub hours_per_day: i32,
    pub days_per_week: i32,
    pub weekly_schedule: Json<Vec<WeekPlan>>,
    pub is_active: bool,
    pub completion_percentage: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub const STUDY_PLAN_COLUMNS: &str = "id, user_id, plan_name, target_exam, exam_date, \
     hours_per_day, days_per_week, weekly_schedule, is_active, completion_percentage, created_at";

#[derive(Debug, Deserialize, Validate)]
pub struct StudyPlanRequest {
    #[validate(length(min = 1, max = 20))]
    pub target_exam: String,
    pub exam_date: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(range(min = 1, max = 12))]
    pub hours_per_day: i32,
    #[validate(range(min = 1, max = 7))]
    pub days_per_week: i32,
    #[validate(length(min = 1, max = 20))]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub weak_areas: Vec<String>,
}

/// Flattened schedule line for responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySchedule {
    pub day: String,
    pub time_slot: String,
    pub subject: String,
    pub topic: String,
    pub duration_minutes: i32,
    pub activity_type: String,
}

#[derive(Debug, Serialize)]
pub struct StudyPlanResponse {
    pub id: i64,
    pub plan_name: String,
    pub target_exam: String,
    pub exam_date: Option<chrono::DateTime<chrono::Utc>>,
    pub hours_per_day: i32,
    pub days_per_week: i32,
    pub weekly_schedule: Vec<DailySchedule>,
    pub completion_percentage: i32,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdateRequest {
    pub completion_percentage: i32,
}
