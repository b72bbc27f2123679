// src/models/past_question.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::exam::OptionMap;

/// Represents the 'past_questions' table: the question bank.
/// Identified by (exam_type, subject, year, question_number).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PastQuestion {
    pub id: i64,
    pub exam_type: String,
    pub subject: String,
    pub year: String,
    pub question_number: i32,
    pub question_text: String,
    pub options: Json<OptionMap>,
    /// Absent when the source paper had no marked answer.
    pub correct_answer: Option<String>,
    pub topic: Option<String>,
    pub source_pdf: Option<String>,
    pub page_number: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub const PAST_QUESTION_COLUMNS: &str = "id, exam_type, subject, year, question_number, \
     question_text, options, correct_answer, topic, source_pdf, page_number, created_at";

/// A bank question eligible to seed an exam (it has an answer).
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct BankQuestion {
    pub question_text: String,
    pub options: Json<OptionMap>,
    pub correct_answer: String,
    pub topic: Option<String>,
}

/// A question as returned by the vision model for one PDF page.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtractedQuestion {
    pub question_number: i32,
    pub question_text: String,
    #[serde(default)]
    pub options: OptionMap,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub page_number: Option<i32>,
    #[serde(default)]
    pub source_pdf: Option<String>,
}

impl ExtractedQuestion {
    /// Only answered questions can seed a gradable exam.
    pub fn has_answer(&self) -> bool {
        self.correct_answer
            .as_deref()
            .is_some_and(|answer| !answer.trim().is_empty())
    }
}

/// The paper a set of pages belongs to.
#[derive(Debug, Clone)]
pub struct PaperContext {
    pub exam_type: String,
    pub subject: String,
    pub year: String,
}

impl PaperContext {
    pub fn source_name(&self) -> String {
        format!("{}_{}_{}.pdf", self.exam_type, self.subject, self.year)
    }
}

/// Distinct (exam_type, subject, year) set with its size.
#[derive(Debug, Serialize, FromRow)]
pub struct AvailablePastQuestions {
    pub exam_type: String,
    pub subject: String,
    pub year: String,
    pub question_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct AvailableParams {
    pub exam_type: Option<String>,
    pub subject: Option<String>,
    pub year: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_answers_do_not_count() {
        let mut q: ExtractedQuestion = serde_json::from_value(serde_json::json!({
            "question_number": 3,
            "question_text": "Which is a noble gas?",
            "options": {"A": "Neon", "B": "Sodium"},
            "correct_answer": "  "
        }))
        .unwrap();
        assert!(!q.has_answer());

        q.correct_answer = Some("A".into());
        assert!(q.has_answer());
    }
}
