// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

/// Default number of questions drawn for a mock exam.
pub const DEFAULT_EXAM_QUESTION_COUNT: i32 = 50;
/// Default mock exam duration.
pub const DEFAULT_EXAM_TIME_LIMIT_MINUTES: i32 = 90;
/// How many weak topics an exam result reports.
pub const WEAK_TOPIC_LIMIT: usize = 3;
/// Below this score a result recommends revisiting fundamentals.
pub const FUNDAMENTALS_SCORE_THRESHOLD: i32 = 50;
/// At or above this score a result congratulates the student.
pub const CONGRATULATE_SCORE_THRESHOLD: i32 = 70;

/// Product policy knobs for dashboards and parent/child linking.
#[derive(Debug, Clone)]
pub struct DashboardPolicy {
    /// Questions a subject needs before it can be flagged as the weakest.
    pub weakest_subject_min_attempts: i32,
    /// Accuracy (percent) under which a child's subject is listed as weak.
    pub weak_subject_accuracy: f64,
    /// Estimated study minutes per solved question.
    pub minutes_per_question: i64,
    /// Whether a parent may take over a child already linked elsewhere.
    pub allow_child_relink: bool,
}

impl Default for DashboardPolicy {
    fn default() -> Self {
        Self {
            weakest_subject_min_attempts: 5,
            weak_subject_accuracy: 60.0,
            minutes_per_question: 3,
            allow_child_relink: false,
        }
    }
}

/// Settings for the external language-model API.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub vision_model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_size: usize,
    pub max_pdf_size: usize,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub ai: AiConfig,
    pub youtube_api_key: Option<String>,
    pub dashboard: DashboardPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let openai_api_key = required("OPENAI_API_KEY")?;

        let defaults = DashboardPolicy::default();
        let dashboard = DashboardPolicy {
            weakest_subject_min_attempts: parsed_or(
                "WEAKEST_SUBJECT_MIN_ATTEMPTS",
                defaults.weakest_subject_min_attempts,
            )?,
            weak_subject_accuracy: parsed_or("WEAK_SUBJECT_ACCURACY", defaults.weak_subject_accuracy)?,
            minutes_per_question: parsed_or("MINUTES_PER_QUESTION", defaults.minutes_per_question)?,
            allow_child_relink: parsed_or("ALLOW_CHILD_RELINK", defaults.allow_child_relink)?,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration: parsed_or("JWT_EXPIRATION", 1800)?,
            port: parsed_or("PORT", 8000)?,
            cors_origins: parse_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
            max_upload_size: parsed_or("MAX_UPLOAD_SIZE", 5 * 1024 * 1024)?,
            max_pdf_size: parsed_or("MAX_PDF_SIZE", 25 * 1024 * 1024)?,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            ai: AiConfig {
                api_key: openai_api_key,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4.1".to_string()),
                vision_model: env::var("OPENAI_VISION_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                timeout_seconds: parsed_or("AI_TIMEOUT_SECONDS", 120)?,
            },
            youtube_api_key: optional("YOUTUBE_API_KEY"),
            dashboard,
        })
    }
}

fn required(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

/// Splits a comma separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        let origins = parse_origins(" http://a.test, ,http://b.test ,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn dashboard_policy_defaults() {
        let policy = DashboardPolicy::default();
        assert_eq!(policy.weakest_subject_min_attempts, 5);
        assert_eq!(policy.minutes_per_question, 3);
        assert!(!policy.allow_child_relink);
    }
}
