// src/handlers/questions.rs

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::upload::{read_file, read_text},
    models::question::{
        QUESTION_HISTORY_COLUMNS, QuestionHistory, QuestionHistoryItem, QuestionHistoryParams,
        Solution, SolveRequest, SolveResponse,
    },
    services::{
        ai::QuestionInput,
        stats::{solution_for_display, solution_for_storage},
    },
    state::AppState,
    utils::jwt::Claims,
};

const UNKNOWN: &str = "Unknown";
const IMAGE_QUESTION: &str = "Question from image";

/// Splits a `data:<mime>;base64,<payload>` URL. Bare payloads are JPEG.
fn split_data_url(raw: &str) -> (String, &str) {
    if let Some((header, payload)) = raw
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    {
        let mime = header.split(';').next().unwrap_or("image/jpeg");
        return (mime.to_string(), payload);
    }
    ("image/jpeg".to_string(), raw)
}

/// Recognizes PNG, JPEG, GIF and WebP by their leading bytes.
fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Short stand-in stored instead of the whole image.
fn image_reference(data_base64: &str) -> String {
    let head: String = data_base64.chars().take(50).collect();
    format!("base64:{head}...")
}

/// Stores the solved question and counts one attempt for its subject.
async fn record_solution(
    pool: &PgPool,
    user_id: i64,
    question_text: &str,
    image_ref: Option<String>,
    solution: &Solution,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let question_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO question_history
            (user_id, question_text, question_image_url, subject, topic, ai_solution, steps, related_topics)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(question_text)
    .bind(image_ref)
    .bind(&solution.subject)
    .bind(&solution.topic)
    .bind(solution_for_storage(&solution.solution))
    .bind(SqlJson(&solution.steps))
    .bind(SqlJson(&solution.related_topics))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save question history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if let Some(subject) = solution.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        sqlx::query(
            r#"
            INSERT INTO user_subjects (user_id, subject_name, total_questions_attempted)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, subject_name) DO UPDATE SET
                total_questions_attempted = user_subjects.total_questions_attempted + 1
            "#,
        )
        .bind(user_id)
        .bind(subject)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(question_id)
}

fn solve_response(question_id: i64, question_text: String, solution: Solution) -> SolveResponse {
    SolveResponse {
        question_id,
        question_text,
        subject: solution.subject.unwrap_or_else(|| UNKNOWN.to_string()),
        topic: solution.topic.unwrap_or_else(|| UNKNOWN.to_string()),
        solution: solution_for_display(&solution.solution),
        steps: solution.steps,
        related_topics: solution.related_topics,
        similar_questions: Vec::new(),
    }
}

/// Solves a question given as text and/or an inline base64 image.
/// With an image, any text is passed along as extra context.
pub async fn solve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SolveRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let text = payload
        .question_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let (input, image_ref) = match payload.question_image.as_deref().filter(|i| !i.is_empty()) {
        Some(raw) => {
            let (mime_type, data) = split_data_url(raw);
            STANDARD
                .decode(data)
                .map_err(|_| AppError::BadRequest("Invalid image data".to_string()))?;
            let image_ref = image_reference(data);
            (
                QuestionInput::Image {
                    data_base64: data.to_string(),
                    mime_type,
                    context: text.clone(),
                },
                Some(image_ref),
            )
        }
        None => match &text {
            Some(t) => (QuestionInput::Text(t.clone()), None),
            None => {
                return Err(AppError::BadRequest(
                    "Please provide either question text or image".to_string(),
                ));
            }
        },
    };

    let solution = state.tutor.solve(&input, payload.subject.as_deref()).await?;

    let question_text = solution
        .question_text
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or(text)
        .unwrap_or_else(|| IMAGE_QUESTION.to_string());

    let question_id =
        record_solution(&state.pool, user_id, &question_text, image_ref, &solution).await?;

    tracing::info!(user_id, question_id, "Question solved");

    Ok(Json(solve_response(question_id, question_text, solution)))
}

/// Solves a question from an uploaded image file.
pub async fn solve_with_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut image = None;
    let mut subject = None;
    let mut additional_context = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(read_file(field, state.config.max_upload_size).await?),
            "subject" => subject = read_text(field).await?,
            "additional_context" => additional_context = read_text(field).await?,
            _ => {}
        }
    }

    let image = image.ok_or(AppError::BadRequest("Image file is required".to_string()))?;

    let declared = image
        .content_type
        .as_deref()
        .filter(|ct| ct.starts_with("image/"))
        .ok_or(AppError::BadRequest("File must be an image".to_string()))?
        .to_string();

    if sniff_image(&image.bytes).is_none() {
        return Err(AppError::BadRequest("Invalid image file".to_string()));
    }

    let data_base64 = STANDARD.encode(&image.bytes);
    let image_ref = image_reference(&data_base64);

    let input = QuestionInput::Image {
        data_base64,
        mime_type: declared,
        context: additional_context,
    };
    let solution = state.tutor.solve(&input, subject.as_deref()).await?;

    let question_text = solution
        .question_text
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| IMAGE_QUESTION.to_string());

    let question_id =
        record_solution(&state.pool, user_id, &question_text, Some(image_ref), &solution).await?;

    Ok(Json(solve_response(question_id, question_text, solution)))
}

/// Newest-first history, optionally for one subject.
pub async fn history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuestionHistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM question_history WHERE user_id = ",
        QUESTION_HISTORY_COLUMNS
    ));
    qb.push_bind(user_id);
    if let Some(subject) = params.subject.as_deref() {
        qb.push(" AND subject = ");
        qb.push_bind(subject);
    }
    qb.push(" ORDER BY solved_at DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let rows = qb
        .build_query_as::<QuestionHistory>()
        .fetch_all(&pool)
        .await?;

    let items: Vec<QuestionHistoryItem> = rows.into_iter().map(Into::into).collect();
    Ok(Json(items))
}

/// One past solution, owner only.
pub async fn history_detail(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let sql = format!(
        "SELECT {} FROM question_history WHERE id = $1 AND user_id = $2",
        QUESTION_HISTORY_COLUMNS
    );
    let row = sqlx::query_as::<_, QuestionHistory>(&sql)
        .bind(question_id)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(SolveResponse {
        question_id: row.id,
        question_text: row.question_text,
        subject: row.subject.unwrap_or_else(|| UNKNOWN.to_string()),
        topic: row.topic.unwrap_or_else(|| UNKNOWN.to_string()),
        solution: row.ai_solution,
        steps: row.steps.map(|s| s.0).unwrap_or_default(),
        related_topics: row.related_topics.map(|t| t.0).unwrap_or_default(),
        similar_questions: Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_carry_their_mime_type() {
        let (mime, data) = split_data_url("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(mime, "image/png");
        assert_eq!(data, "iVBORw0KGgo=");

        let (mime, data) = split_data_url("/9j/4AAQSkZJRg==");
        assert_eq!(mime, "image/jpeg");
        assert_eq!(data, "/9j/4AAQSkZJRg==");
    }

    #[test]
    fn image_sniffing_rejects_non_images() {
        assert_eq!(sniff_image(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
        assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image(b"%PDF-1.4"), None);
    }

    #[test]
    fn image_reference_is_truncated() {
        let long = "A".repeat(500);
        let reference = image_reference(&long);
        assert_eq!(reference.len(), "base64:".len() + 50 + 3);
        assert!(reference.ends_with("..."));
    }
}
