// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique login email.
    pub email: String,

    pub phone: Option<String>,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    pub full_name: String,

    /// 'student', 'parent', 'admin' or 'school'.
    pub role: String,

    /// 'SS1', 'SS2', 'SS3' or 'JAMB'.
    pub student_class: Option<String>,

    pub is_active: bool,
    pub subscription_tier: String,
    pub parent_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
}

/// Column list matching [`User`], shared by every user query.
pub const USER_COLUMNS: &str = "id, email, phone, password_hash, full_name, role, student_class, \
     is_active, subscription_tier, parent_id, created_at, last_login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Parent,
    Admin,
    School,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Parent => "parent",
            UserRole::Admin => "admin",
            UserRole::School => "school",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentClass {
    SS1,
    SS2,
    SS3,
    JAMB,
}

impl StudentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentClass::SS1 => "SS1",
            StudentClass::SS2 => "SS2",
            StudentClass::SS3 => "SS3",
            StudentClass::JAMB => "JAMB",
        }
    }
}

/// Represents the 'user_subjects' table: running per-subject counters.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubjectPerformance {
    pub id: i64,
    pub subject_name: String,
    pub total_questions_attempted: i32,
    pub correct_answers: i32,
}

/// A subject's counters plus the derived accuracy for profile views.
#[derive(Debug, Serialize)]
pub struct SubjectPerformanceResponse {
    pub id: i64,
    pub subject_name: String,
    pub total_questions_attempted: i32,
    pub correct_answers: i32,
    pub accuracy: Option<f64>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "Phone number must be 7-20 characters."))]
    pub phone: Option<String>,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 2, max = 100, message = "Full name must be at least 2 characters."))]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    pub student_class: Option<StudentClass>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub subjects: Vec<String>,
}

/// DTO for JSON login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// OAuth2 password-form login; `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// DTO for updating the current user's profile. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
    pub student_class: Option<StudentClass>,
    #[validate(length(max = 20))]
    pub subjects: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: i64,
    pub role: String,
}

/// Aggregated user profile data for the current user.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub role: String,
    pub student_class: Option<String>,
    pub subscription_tier: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub subjects: Vec<SubjectPerformanceResponse>,
}

/// DTO for a parent linking a child account.
#[derive(Debug, Deserialize, Validate)]
pub struct LinkChildRequest {
    #[validate(email)]
    pub child_email: String,
    pub verification_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_defaults_to_student_role() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "ada@example.com",
            "password": "password123",
            "full_name": "Ada Obi"
        }))
        .unwrap();

        assert_eq!(req.role, UserRole::Student);
        assert!(req.subjects.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_rejects_short_password() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "ada@example.com",
            "password": "short",
            "full_name": "Ada Obi"
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn student_class_uses_upper_case_labels() {
        let class: StudentClass = serde_json::from_str("\"JAMB\"").unwrap();
        assert_eq!(class.as_str(), "JAMB");
    }
}
