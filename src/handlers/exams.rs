// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::{SeedableRng, rngs::StdRng};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::exam::{
        CreateExamRequest, ExamHistoryItem, ExamHistoryParams, MockExamResponse,
        SubmitExamRequest,
    },
    services::{
        exam_engine::{self, ExamStore},
        exam_store::PgExamStore,
    },
    utils::jwt::Claims,
};

/// Draws a fresh mock exam for the caller. The answer key stays server side.
pub async fn create(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = PgExamStore::new(pool);
    let mut rng = StdRng::from_entropy();

    let attempt = exam_engine::create_exam(&store, &mut rng, user_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(MockExamResponse::from(&attempt))))
}

/// Grades a submission. A second submission of the same exam is a conflict.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = PgExamStore::new(pool);

    let result = exam_engine::submit_exam(&store, user_id, &payload).await?;
    Ok(Json(result))
}

pub async fn history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ExamHistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = PgExamStore::new(pool);

    let attempts = store
        .list_completed(user_id, params.subject.as_deref())
        .await?;

    let items: Vec<ExamHistoryItem> = attempts.iter().map(ExamHistoryItem::from).collect();
    Ok(Json(items))
}

/// Full breakdown of one graded exam.
pub async fn get_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let store = PgExamStore::new(pool);

    let attempt = store
        .find_attempt(user_id, exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam_engine::graded_result(&attempt)?))
}
