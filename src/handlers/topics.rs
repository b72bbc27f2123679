// src/handlers/topics.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::lesson::{
        ChatTurn, LessonChatMessage, LessonChatRequest, LessonData, SAVED_LESSON_COLUMNS,
        SavedLesson, SavedLessonParams, SimplifyRequest, TeachRequest, TeachResponse,
    },
    services::{
        catalog::{SUBJECTS, is_known_subject, syllabus},
        youtube::extract_video_id,
    },
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

pub async fn list_subjects() -> impl IntoResponse {
    Json(json!({
        "subjects": SUBJECTS,
        "total": SUBJECTS.len(),
    }))
}

pub async fn get_syllabus(Path(subject): Path<String>) -> Result<impl IntoResponse, AppError> {
    if !is_known_subject(&subject) {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    let topics = syllabus(&subject);
    if topics.is_empty() {
        return Ok(Json(json!({
            "subject": subject,
            "topics": [],
            "message": "Syllabus topics coming soon",
        })));
    }

    Ok(Json(json!({
        "subject": subject,
        "topics": topics,
        "total_topics": topics.len(),
    })))
}

/// Owned lesson, or NotFound. Optionally bumps `last_accessed_at`.
async fn owned_lesson(
    pool: &PgPool,
    user_id: i64,
    lesson_id: i64,
    touch: bool,
) -> Result<SavedLesson, AppError> {
    let sql = if touch {
        format!(
            "UPDATE saved_lessons SET last_accessed_at = NOW() WHERE id = $1 AND user_id = $2 RETURNING {}",
            SAVED_LESSON_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM saved_lessons WHERE id = $1 AND user_id = $2",
            SAVED_LESSON_COLUMNS
        )
    };

    sqlx::query_as::<_, SavedLesson>(&sql)
        .bind(lesson_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))
}

/// Teaches a topic, reusing a saved lesson for the same
/// (subject, topic, difficulty) instead of asking the tutor again.
pub async fn teach(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<TeachRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    if !is_known_subject(&payload.subject) {
        return Err(AppError::BadRequest(format!(
            "Subject not available. Choose from: {}",
            SUBJECTS.join(", ")
        )));
    }

    let difficulty = payload.difficulty_level.unwrap_or_default();

    let cached_sql = format!(
        "UPDATE saved_lessons SET last_accessed_at = NOW() \
         WHERE user_id = $1 AND subject = $2 AND topic = $3 AND difficulty_level = $4 \
         RETURNING {}",
        SAVED_LESSON_COLUMNS
    );
    let cached = sqlx::query_as::<_, SavedLesson>(&cached_sql)
        .bind(user_id)
        .bind(&payload.subject)
        .bind(&payload.topic)
        .bind(difficulty.as_str())
        .fetch_optional(&state.pool)
        .await?;

    if let Some(lesson) = cached {
        tracing::debug!(lesson_id = lesson.id, "Serving saved lesson");
        return Ok(Json(TeachResponse::from(&lesson)));
    }

    let content = state
        .tutor
        .teach(&payload.subject, &payload.topic, difficulty)
        .await?;
    let lesson_data = LessonData::from(content);

    let video = state
        .videos
        .find_lesson_video(&payload.subject, &payload.topic)
        .await
        .and_then(|v| extract_video_id(&v.video_url).map(|id| (id, v.video_url)));
    let (video_id, video_url) = video.unzip();

    // A concurrent request may have saved the same lesson meanwhile; keep the newest content.
    let insert_sql = format!(
        r#"
        INSERT INTO saved_lessons
            (user_id, subject, topic, difficulty_level, lesson_data, youtube_video_id, youtube_video_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id, subject, topic, difficulty_level) DO UPDATE SET
            lesson_data = EXCLUDED.lesson_data,
            youtube_video_id = EXCLUDED.youtube_video_id,
            youtube_video_url = EXCLUDED.youtube_video_url,
            updated_at = NOW(),
            last_accessed_at = NOW()
        RETURNING {}
        "#,
        SAVED_LESSON_COLUMNS
    );
    let lesson = sqlx::query_as::<_, SavedLesson>(&insert_sql)
        .bind(user_id)
        .bind(&payload.subject)
        .bind(&payload.topic)
        .bind(difficulty.as_str())
        .bind(SqlJson(&lesson_data))
        .bind(video_id)
        .bind(video_url)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save lesson: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!(user_id, lesson_id = lesson.id, "Lesson generated");

    Ok(Json(TeachResponse::from(&lesson)))
}

pub async fn simplify(
    State(state): State<AppState>,
    Json(payload): Json<SimplifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let simplified = state
        .tutor
        .simplify(&payload.topic, &payload.original_explanation)
        .await?;

    Ok(Json(json!({
        "topic": payload.topic,
        "simplified_explanation": simplified,
    })))
}

/// Saved lessons, most recently opened first.
pub async fn list_saved_lessons(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SavedLessonParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM saved_lessons WHERE user_id = ",
        SAVED_LESSON_COLUMNS
    ));
    qb.push_bind(user_id);
    if let Some(subject) = params.subject.as_deref() {
        qb.push(" AND subject = ");
        qb.push_bind(subject);
    }
    qb.push(" ORDER BY last_accessed_at DESC");

    let lessons = qb.build_query_as::<SavedLesson>().fetch_all(&pool).await?;
    Ok(Json(lessons))
}

pub async fn get_saved_lesson(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let lesson = owned_lesson(&pool, user_id, lesson_id, true).await?;
    Ok(Json(lesson))
}

async fn transcript(pool: &PgPool, lesson_id: i64) -> Result<Vec<LessonChatMessage>, AppError> {
    let messages = sqlx::query_as::<_, LessonChatMessage>(
        "SELECT role, message, created_at FROM lesson_chat WHERE lesson_id = $1 ORDER BY created_at, id",
    )
    .bind(lesson_id)
    .fetch_all(pool)
    .await?;
    Ok(messages)
}

/// Chats with the tutor about a saved lesson; both turns are stored together.
pub async fn chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LessonChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let lesson = owned_lesson(&state.pool, user_id, payload.lesson_id, false).await?;

    let message = clean_html(&payload.message);
    if message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let history: Vec<ChatTurn> = transcript(&state.pool, lesson.id)
        .await?
        .iter()
        .map(ChatTurn::from)
        .collect();

    let reply = state
        .tutor
        .chat(&lesson.subject, &lesson.topic, &history, &message)
        .await?;

    let mut tx = state.pool.begin().await?;
    for (role, text) in [("user", &message), ("assistant", &reply)] {
        sqlx::query("INSERT INTO lesson_chat (lesson_id, user_id, role, message) VALUES ($1, $2, $3, $4)")
            .bind(lesson.id)
            .bind(user_id)
            .bind(role)
            .bind(text)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(Json(json!({ "message": reply })))
}

pub async fn chat_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let lesson = owned_lesson(&pool, user_id, lesson_id, false).await?;
    Ok(Json(transcript(&pool, lesson.id).await?))
}
