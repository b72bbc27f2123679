// src/models/question.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// One step of an AI worked solution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionStep {
    #[serde(default)]
    pub step_number: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub explanation: String,
}

/// Structured answer from the AI tutor.
/// `solution` may arrive as a string, an object or a list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Solution {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub solution: Value,
    #[serde(default)]
    pub steps: Vec<SolutionStep>,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

/// Represents the 'question_history' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionHistory {
    pub id: i64,
    pub user_id: i64,
    pub question_text: String,
    pub question_image_url: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub ai_solution: String,
    pub steps: Option<Json<Vec<SolutionStep>>>,
    pub related_topics: Option<Json<Vec<String>>>,
    pub solved_at: chrono::DateTime<chrono::Utc>,
}

pub const QUESTION_HISTORY_COLUMNS: &str = "id, user_id, question_text, question_image_url, \
     subject, topic, ai_solution, steps, related_topics, solved_at";

/// DTO for solving a question from text or an inline image.
#[derive(Debug, Deserialize, Validate)]
pub struct SolveRequest {
    #[validate(length(max = 5000))]
    pub question_text: Option<String>,
    /// Base64 image data, optionally as a `data:<mime>;base64,` URL.
    pub question_image: Option<String>,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SolveResponse {
    pub question_id: i64,
    pub question_text: String,
    pub subject: String,
    pub topic: String,
    pub solution: String,
    pub steps: Vec<SolutionStep>,
    pub related_topics: Vec<String>,
    pub similar_questions: Vec<String>,
}

/// Compact history row.
#[derive(Debug, Serialize)]
pub struct QuestionHistoryItem {
    pub id: i64,
    pub question_text: String,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub ai_solution: String,
    pub solved_at: chrono::DateTime<chrono::Utc>,
}

impl From<QuestionHistory> for QuestionHistoryItem {
    fn from(row: QuestionHistory) -> Self {
        Self {
            id: row.id,
            question_text: row.question_text,
            subject: row.subject,
            topic: row.topic,
            ai_solution: row.ai_solution,
            solved_at: row.solved_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionHistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub subject: Option<String>,
}
