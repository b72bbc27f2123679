// src/models/lesson.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Lesson content produced by the AI tutor.
/// Examples may come back as plain strings or `{problem, solution}` objects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonContent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detailed_explanation: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub examples: Vec<Value>,
    #[serde(default)]
    pub practice_questions: Vec<String>,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
    #[serde(default)]
    pub exam_tips: Vec<String>,
}

/// Lesson payload as persisted in `saved_lessons.lesson_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonData {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detailed_explanation: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub practice_questions: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub common_mistakes: Vec<String>,
    #[serde(default)]
    pub exam_tips: Vec<String>,
}

impl From<LessonContent> for LessonData {
    fn from(content: LessonContent) -> Self {
        Self {
            summary: content.summary,
            detailed_explanation: content.detailed_explanation,
            examples: content.examples.iter().map(render_example).collect(),
            practice_questions: content.practice_questions,
            key_concepts: content.key_concepts,
            common_mistakes: content.common_mistakes,
            exam_tips: content.exam_tips,
        }
    }
}

/// Flattens one worked example into display text.
pub fn render_example(example: &Value) -> String {
    match example {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            let field = |key: &str| {
                map.get(key)
                    .map(|value| match value {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_default()
            };
            format!("Problem: {}\nSolution: {}", field("problem"), field("solution"))
        }
        other => other.to_string(),
    }
}

/// Represents the 'saved_lessons' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SavedLesson {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub subject: String,
    pub topic: String,
    pub difficulty_level: String,
    pub lesson_data: Json<LessonData>,
    pub youtube_video_id: Option<String>,
    pub youtube_video_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_accessed_at: chrono::DateTime<chrono::Utc>,
}

pub const SAVED_LESSON_COLUMNS: &str = "id, user_id, subject, topic, difficulty_level, \
     lesson_data, youtube_video_id, youtube_video_url, created_at, updated_at, last_accessed_at";

/// Represents the 'lesson_chat' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LessonChatMessage {
    pub role: String,
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A prior turn handed to the tutor as conversation context.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: String,
    pub message: String,
}

impl From<&LessonChatMessage> for ChatTurn {
    fn from(msg: &LessonChatMessage) -> Self {
        Self {
            role: msg.role.clone(),
            message: msg.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Simple,
    #[default]
    Medium,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Simple => "simple",
            Difficulty::Medium => "medium",
            Difficulty::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TeachRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[serde(default)]
    pub difficulty_level: Option<Difficulty>,
}

#[derive(Debug, Serialize)]
pub struct TeachResponse {
    pub subject: String,
    pub topic: String,
    pub summary: String,
    pub detailed_explanation: String,
    pub examples: Vec<String>,
    pub practice_questions: Vec<String>,
    pub video_link: Option<String>,
    pub youtube_video_id: Option<String>,
    pub lesson_id: i64,
}

impl From<&SavedLesson> for TeachResponse {
    fn from(lesson: &SavedLesson) -> Self {
        Self {
            subject: lesson.subject.clone(),
            topic: lesson.topic.clone(),
            summary: lesson.lesson_data.summary.clone(),
            detailed_explanation: lesson.lesson_data.detailed_explanation.clone(),
            examples: lesson.lesson_data.examples.clone(),
            practice_questions: lesson.lesson_data.practice_questions.clone(),
            video_link: lesson.youtube_video_url.clone(),
            youtube_video_id: lesson.youtube_video_id.clone(),
            lesson_id: lesson.id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SimplifyRequest {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(min = 1, max = 20000))]
    pub original_explanation: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LessonChatRequest {
    pub lesson_id: i64,
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SavedLessonParams {
    pub subject: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_examples_render_as_problem_and_solution() {
        let rendered = render_example(&json!({"problem": "Solve $x+1=2$", "solution": "$x=1$"}));
        assert_eq!(rendered, "Problem: Solve $x+1=2$\nSolution: $x=1$");
    }

    #[test]
    fn string_examples_pass_through() {
        assert_eq!(render_example(&json!("Just text")), "Just text");
    }

    #[test]
    fn lesson_content_keeps_list_sections() {
        let content: LessonContent = serde_json::from_value(json!({
            "summary": "Quadratics",
            "examples": [{"problem": "p", "solution": "s"}, "plain"],
            "exam_tips": ["Check the discriminant"]
        }))
        .unwrap();

        let data = LessonData::from(content);
        assert_eq!(data.examples, vec!["Problem: p\nSolution: s", "plain"]);
        assert_eq!(data.exam_tips, vec!["Check the discriminant"]);
        assert!(data.key_concepts.is_empty());
    }

    #[test]
    fn difficulty_defaults_to_medium() {
        let req: TeachRequest =
            serde_json::from_value(json!({"subject": "Physics", "topic": "Waves"})).unwrap();
        assert_eq!(req.difficulty_level.unwrap_or_default(), Difficulty::Medium);
    }
}
