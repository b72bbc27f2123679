// src/models/exam.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Option label ("A".."E") to option text, ordered by label.
pub type OptionMap = BTreeMap<String, String>;

/// 1-based question position to an answer label.
pub type AnswerMap = BTreeMap<u32, String>;

/// A private copy of a question taken when the exam was generated.
/// Later edits to the question bank never reach an attempt's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    pub question_text: String,
    pub options: OptionMap,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Represents the 'exam_attempts' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_type: String,
    pub subject: String,
    pub year: Option<String>,
    pub questions: Json<Vec<QuestionSnapshot>>,
    pub user_answers: Json<AnswerMap>,
    /// The answer key. Never serialized towards the student before grading.
    pub correct_answers: Json<AnswerMap>,
    pub time_limit_minutes: i32,
    pub time_taken_seconds: i32,
    pub total_questions: i32,
    pub correct_count: i32,
    pub score_percentage: i32,
    pub weak_topics: Option<Json<Vec<String>>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Column list matching [`ExamAttempt`].
pub const EXAM_ATTEMPT_COLUMNS: &str = "id, user_id, exam_type, subject, year, questions, \
     user_answers, correct_answers, time_limit_minutes, time_taken_seconds, total_questions, \
     correct_count, score_percentage, weak_topics, started_at, completed_at";

/// An attempt about to be persisted.
#[derive(Debug, Clone)]
pub struct NewExamAttempt {
    pub user_id: i64,
    pub exam_type: String,
    pub subject: String,
    pub year: Option<String>,
    pub questions: Vec<QuestionSnapshot>,
    pub answer_key: AnswerMap,
    pub time_limit_minutes: i32,
}

/// DTO for creating a mock exam.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 50))]
    pub exam_type: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    /// A specific year, or absent / "Random Mix" for every year.
    pub year: Option<String>,
    #[validate(range(min = 10, max = 100))]
    pub number_of_questions: Option<i32>,
    #[validate(range(min = 15, max = 180))]
    pub time_limit_minutes: Option<i32>,
}

/// Question as shown to the student: no answer, no topic.
#[derive(Debug, Clone, Serialize)]
pub struct ExamQuestion {
    pub question_number: u32,
    pub question_text: String,
    pub options: OptionMap,
}

/// DTO for returning a freshly generated exam.
#[derive(Debug, Serialize)]
pub struct MockExamResponse {
    pub exam_id: i64,
    pub exam_type: String,
    pub subject: String,
    pub year: Option<String>,
    pub total_questions: i32,
    pub time_limit_minutes: i32,
    pub questions: Vec<ExamQuestion>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ExamAttempt> for MockExamResponse {
    fn from(attempt: &ExamAttempt) -> Self {
        let questions = attempt
            .questions
            .iter()
            .enumerate()
            .map(|(index, q)| ExamQuestion {
                question_number: index as u32 + 1,
                question_text: q.question_text.clone(),
                options: q.options.clone(),
            })
            .collect();

        Self {
            exam_id: attempt.id,
            exam_type: attempt.exam_type.clone(),
            subject: attempt.subject.clone(),
            year: attempt.year.clone(),
            total_questions: attempt.total_questions,
            time_limit_minutes: attempt.time_limit_minutes,
            questions,
            started_at: attempt.started_at,
        }
    }
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitExamRequest {
    pub exam_id: i64,

    /// User's answers map.
    /// Key: 1-based question position
    /// Value: selected option label
    #[serde(default)]
    pub answers: AnswerMap,

    #[validate(range(min = 0))]
    pub time_taken_seconds: i32,
}

/// Per-question breakdown line of a graded exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_number: u32,
    pub question_text: String,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
    pub topic: String,
}

/// DTO for a graded exam with its full breakdown.
#[derive(Debug, Serialize)]
pub struct ExamResultResponse {
    pub exam_id: i64,
    pub exam_type: String,
    pub subject: String,
    pub total_questions: i32,
    pub correct_count: i32,
    pub score_percentage: i32,
    pub time_taken_seconds: i32,
    pub weak_topics: Vec<String>,
    pub detailed_results: Vec<QuestionResult>,
    pub recommendations: Vec<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One line of the exam history listing.
#[derive(Debug, Serialize)]
pub struct ExamHistoryItem {
    pub exam_id: i64,
    pub exam_type: String,
    pub subject: String,
    pub year: Option<String>,
    pub total_questions: i32,
    pub correct_count: i32,
    pub score_percentage: i32,
    pub time_taken_seconds: i32,
    pub weak_topics: Vec<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&ExamAttempt> for ExamHistoryItem {
    fn from(attempt: &ExamAttempt) -> Self {
        Self {
            exam_id: attempt.id,
            exam_type: attempt.exam_type.clone(),
            subject: attempt.subject.clone(),
            year: attempt.year.clone(),
            total_questions: attempt.total_questions,
            correct_count: attempt.correct_count,
            score_percentage: attempt.score_percentage,
            time_taken_seconds: attempt.time_taken_seconds,
            weak_topics: attempt
                .weak_topics
                .as_ref()
                .map(|topics| topics.0.clone())
                .unwrap_or_default(),
            completed_at: attempt.completed_at,
        }
    }
}

/// Query parameters for exam history.
#[derive(Debug, Deserialize)]
pub struct ExamHistoryParams {
    pub subject: Option<String>,
}
