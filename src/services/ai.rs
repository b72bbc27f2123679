// src/services/ai.rs

//! Language-model capability used for solving, teaching, chat, study plans
//! and past-question extraction.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    config::AiConfig,
    error::AppError,
    models::{
        lesson::{ChatTurn, Difficulty, LessonContent},
        past_question::{ExtractedQuestion, PaperContext},
        question::Solution,
        study_plan::{GeneratedPlan, StudyPlanPrompt},
    },
};

/// What the student asked about.
#[derive(Debug, Clone)]
pub enum QuestionInput {
    Text(String),
    Image {
        data_base64: String,
        mime_type: String,
        /// Extra text the student typed next to the picture.
        context: Option<String>,
    },
}

/// One rendered page of a past-question paper.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_number: i32,
    pub png: Vec<u8>,
}

#[async_trait]
pub trait AiTutor: Send + Sync {
    async fn solve(
        &self,
        input: &QuestionInput,
        subject_hint: Option<&str>,
    ) -> Result<Solution, AppError>;

    async fn teach(
        &self,
        subject: &str,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<LessonContent, AppError>;

    async fn chat(
        &self,
        subject: &str,
        topic: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, AppError>;

    async fn simplify(&self, topic: &str, explanation: &str) -> Result<String, AppError>;

    async fn generate_study_plan(
        &self,
        request: &StudyPlanPrompt<'_>,
    ) -> Result<GeneratedPlan, AppError>;

    /// Questions found on a single page. Provenance is filled in by the caller.
    async fn extract_questions(
        &self,
        page: &PageImage,
        paper: &PaperContext,
    ) -> Result<Vec<ExtractedQuestion>, AppError>;
}

const FORMATTING_RULES: &str = r#"Formatting:
- Write every formula, equation and chemical formula in LaTeX: $...$ inline, $$...$$ for displayed equations (e.g. $F = ma$, $H_2SO_4$, $x^2 + 5x - 6 = 0$).
- Put tables, comparisons and data sets in markdown tables. LaTeX is allowed inside cells."#;

const SOLVE_PROMPT: &str = r#"You are an expert tutor for Nigerian secondary school students preparing for WAEC, NECO and JAMB.
Identify the subject and the syllabus topic of the question, then give a clear step-by-step solution in simple terms.

Respond with JSON:
{
  "subject": "subject name",
  "topic": "syllabus topic",
  "question_text": "the question, as read from the image if one was given",
  "solution": "final answer",
  "steps": [{"step_number": 1, "description": "what to do", "formula": "LaTeX formula or null", "explanation": "why"}],
  "related_topics": ["topic"]
}"#;

const TEACH_PROMPT: &str = r#"You are an expert tutor teaching Nigerian secondary school students for WAEC/JAMB.
Give clear, engaging explanations with real-world examples.

Respond with JSON:
{
  "summary": "2-3 sentence overview",
  "detailed_explanation": "full explanation",
  "key_concepts": ["concept"],
  "examples": [{"problem": "worked problem", "solution": "its solution"}],
  "practice_questions": ["question"],
  "common_mistakes": ["mistake"],
  "exam_tips": ["tip"]
}"#;

const SIMPLIFY_PROMPT: &str = "You explain hard ideas in the simplest possible way, using everyday \
     language, analogies and examples Nigerian students relate to.";

const STUDY_PLAN_PROMPT: &str = r#"You are a study planning expert for WAEC/JAMB preparation.
Create a balanced, realistic schedule.

Respond with JSON:
{
  "plan_overview": "summary",
  "weekly_breakdown": [
    {"week": 1, "focus": "focus of the week",
     "daily_schedule": [{"day": "Monday", "subject": "Mathematics", "topic": "Algebra", "duration_minutes": 120, "activities": ["study", "practice"]}]}
  ],
  "revision_strategy": "how to revise",
  "exam_preparation_tips": ["tip"]
}"#;

/// JSON envelope the extraction prompt asks for.
#[derive(Debug, Deserialize)]
struct ExtractedPage {
    #[serde(default)]
    questions: Vec<ExtractedQuestion>,
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiTutor {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    vision_model: String,
}

impl OpenAiTutor {
    pub fn from_config(config: &AiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::InternalServerError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
        })
    }

    /// Sends one chat-completions request and returns the message text.
    async fn complete(&self, payload: Value) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("AI service error: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("AI service error: {e}")))?;

        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "AI service error: {} {}",
                status,
                body.pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unexpected response")
            )));
        }

        message_content(&body)
            .map(str::to_string)
            .ok_or(AppError::ExternalService(
                "AI service error: empty response".to_string(),
            ))
    }

    async fn complete_json<T: DeserializeOwned>(&self, payload: Value) -> Result<T, AppError> {
        let content = self.complete(payload).await?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::ExternalService(format!("AI service returned invalid JSON: {e}")))
    }
}

/// Extracts `choices[0].message.content` from a completion body.
fn message_content(body: &Value) -> Option<&str> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
}

fn system_prompt(base: &str) -> String {
    format!("{base}\n\n{FORMATTING_RULES}")
}

fn study_plan_request(request: &StudyPlanPrompt<'_>) -> String {
    let weak_areas = if request.weak_areas.is_empty() {
        "None specified".to_string()
    } else {
        request.weak_areas.join(", ")
    };

    format!(
        "Create a study plan:\n\
         - Subjects: {}\n\
         - Hours per day: {}\n\
         - Days per week: {}\n\
         - Weeks until exam: {}\n\
         - Weak areas: {}\n\n\
         Focus more time on weak areas.",
        request.subjects.join(", "),
        request.hours_per_day,
        request.days_per_week,
        request.weeks_until_exam,
        weak_areas
    )
}

fn extraction_prompt(paper: &PaperContext) -> String {
    format!(
        r#"You extract exam questions from scanned pages of a {exam} {subject} past question paper from {year}.

For every question on the page return its number, the full question text, every option (A to D, sometimes E) and the correct answer.
The answer may be ticked, highlighted or listed in an answer key on the page. If none is marked, pick the most likely option.
Give each question a syllabus topic; invent a short one from the text when none is obvious.
Describe diagrams in words and keep mathematical notation exactly as printed.
Only include questions with readable text and at least two options.

Respond with JSON: {{"questions": [{{"question_number": 1, "question_text": "...", "options": {{"A": "...", "B": "..."}}, "correct_answer": "A", "topic": "..."}}]}}
Return {{"questions": []}} when the page has none."#,
        exam = paper.exam_type,
        subject = paper.subject,
        year = paper.year
    )
}

#[async_trait]
impl AiTutor for OpenAiTutor {
    async fn solve(
        &self,
        input: &QuestionInput,
        subject_hint: Option<&str>,
    ) -> Result<Solution, AppError> {
        let hint = subject_hint.map(|s| format!("Subject hint: {s}"));

        let payload = match input {
            QuestionInput::Text(text) => {
                let mut prompt = format!("Question: {text}");
                if let Some(hint) = &hint {
                    prompt.push('\n');
                    prompt.push_str(hint);
                }
                json!({
                    "model": self.model,
                    "messages": [
                        {"role": "system", "content": system_prompt(SOLVE_PROMPT)},
                        {"role": "user", "content": prompt}
                    ],
                    "temperature": 0.7,
                    "response_format": {"type": "json_object"}
                })
            }
            QuestionInput::Image {
                data_base64,
                mime_type,
                context,
            } => {
                let mut content = vec![
                    json!({
                        "type": "image_url",
                        "image_url": {"url": format!("data:{mime_type};base64,{data_base64}"), "detail": "high"}
                    }),
                    json!({"type": "text", "text": "Read the question in this image and solve it."}),
                ];
                if let Some(hint) = hint {
                    content.push(json!({"type": "text", "text": hint}));
                }
                if let Some(context) = context {
                    content.push(json!({
                        "type": "text",
                        "text": format!("Additional context from student: {context}")
                    }));
                }
                json!({
                    "model": self.model,
                    "messages": [
                        {"role": "system", "content": system_prompt(SOLVE_PROMPT)},
                        {"role": "user", "content": content}
                    ],
                    "temperature": 0.7,
                    "max_tokens": 4096,
                    "response_format": {"type": "json_object"}
                })
            }
        };

        self.complete_json(payload).await
    }

    async fn teach(
        &self,
        subject: &str,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<LessonContent, AppError> {
        let prompt = format!(
            "Teach me about {topic} in {subject}.\nDifficulty level: {}\nMake it relevant to WAEC/JAMB exams.",
            difficulty.as_str()
        );

        self.complete_json(json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt(TEACH_PROMPT)},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.8,
            "response_format": {"type": "json_object"}
        }))
        .await
    }

    async fn chat(
        &self,
        subject: &str,
        topic: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, AppError> {
        let system = format!(
            "You are an expert tutor helping a Nigerian student understand {topic} in {subject}. \
             Answer questions and clarify concepts about this topic only; if the student drifts, \
             politely bring them back to {topic}. Keep explanations clear and relevant to WAEC/JAMB."
        );

        let mut messages = vec![json!({"role": "system", "content": system_prompt(&system)})];
        messages.extend(
            history
                .iter()
                .map(|turn| json!({"role": turn.role, "content": turn.message})),
        );
        messages.push(json!({"role": "user", "content": message}));

        self.complete(json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.7,
            "max_tokens": 2048
        }))
        .await
    }

    async fn simplify(&self, topic: &str, explanation: &str) -> Result<String, AppError> {
        let prompt = format!(
            "Simplify this explanation about {topic}:\n\n{explanation}\n\n\
             Make it much simpler, use analogies, and relate it to everyday life."
        );

        self.complete(json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt(SIMPLIFY_PROMPT)},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.9
        }))
        .await
    }

    async fn generate_study_plan(
        &self,
        request: &StudyPlanPrompt<'_>,
    ) -> Result<GeneratedPlan, AppError> {
        self.complete_json(json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": STUDY_PLAN_PROMPT},
                {"role": "user", "content": study_plan_request(request)}
            ],
            "temperature": 0.7,
            "response_format": {"type": "json_object"}
        }))
        .await
    }

    async fn extract_questions(
        &self,
        page: &PageImage,
        paper: &PaperContext,
    ) -> Result<Vec<ExtractedQuestion>, AppError> {
        let image = STANDARD.encode(&page.png);

        let extracted: ExtractedPage = self
            .complete_json(json!({
                "model": self.vision_model,
                "messages": [
                    {"role": "system", "content": extraction_prompt(paper)},
                    {"role": "user", "content": [
                        {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{image}")}},
                        {"type": "text", "text": format!("Extract all questions from this page (page {}).", page.page_number)}
                    ]}
                ],
                "temperature": 0.1,
                "response_format": {"type": "json_object"}
            }))
            .await?;

        Ok(extracted.questions)
    }
}
