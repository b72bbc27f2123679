// src/handlers/past_questions.rs

use axum::{
    Json,
    extract::{Multipart, Query, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};

use crate::{
    error::AppError,
    handlers::upload::{read_file, read_text},
    models::past_question::{
        AvailableParams, AvailablePastQuestions, PAST_QUESTION_COLUMNS, PaperContext, PastQuestion,
    },
    services::pdf::{self, looks_like_pdf},
    state::AppState,
};

/// Imports a past-question paper: renders every page, extracts questions
/// with the vision model and upserts the answered ones into the bank.
/// Responds with the stored rows.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file = None;
    let mut exam_type = None;
    let mut subject = None;
    let mut year = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file = Some(read_file(field, state.config.max_pdf_size).await?),
            "exam_type" => exam_type = read_text(field).await?,
            "subject" => subject = read_text(field).await?,
            "year" => year = read_text(field).await?,
            _ => {}
        }
    }

    let file = file.ok_or(AppError::BadRequest("PDF file is required".to_string()))?;
    let (Some(exam_type), Some(subject), Some(year)) = (exam_type, subject, year) else {
        return Err(AppError::BadRequest(
            "exam_type, subject and year are required".to_string(),
        ));
    };

    if !looks_like_pdf(
        file.file_name.as_deref(),
        file.content_type.as_deref(),
        &file.bytes,
    ) {
        return Err(AppError::BadRequest("File must be a PDF".to_string()));
    }

    let paper = PaperContext {
        exam_type,
        subject,
        year,
    };

    let pages = state.renderer.render_pages(&file.bytes).await?;
    tracing::info!(pages = pages.len(), source = %paper.source_name(), "PDF rendered");

    let extracted = pdf::extract_questions(state.tutor.as_ref(), &pages, &paper).await;
    if extracted.is_empty() {
        return Err(AppError::BadRequest(
            "No questions could be extracted from the PDF".to_string(),
        ));
    }

    let extracted_count = extracted.len();
    let (answered, skipped): (Vec<_>, Vec<_>) =
        extracted.into_iter().partition(|q| q.has_answer());
    for q in &skipped {
        tracing::warn!(
            question_number = q.question_number,
            "Skipping extracted question without an answer"
        );
    }
    if answered.is_empty() {
        return Err(AppError::BadRequest(
            "None of the extracted questions has a marked answer".to_string(),
        ));
    }

    let sql = format!(
        r#"
        INSERT INTO past_questions
            (exam_type, subject, year, question_number, question_text, options,
             correct_answer, topic, source_pdf, page_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (exam_type, subject, year, question_number) DO UPDATE SET
            question_text = EXCLUDED.question_text,
            options = EXCLUDED.options,
            correct_answer = EXCLUDED.correct_answer,
            topic = EXCLUDED.topic,
            source_pdf = EXCLUDED.source_pdf,
            page_number = EXCLUDED.page_number,
            updated_at = NOW()
        RETURNING {}
        "#,
        PAST_QUESTION_COLUMNS
    );

    let mut tx = state.pool.begin().await?;
    let mut saved = Vec::with_capacity(answered.len());
    for q in &answered {
        let row = sqlx::query_as::<_, PastQuestion>(&sql)
            .bind(&paper.exam_type)
            .bind(&paper.subject)
            .bind(&paper.year)
            .bind(q.question_number)
            .bind(&q.question_text)
            .bind(SqlJson(&q.options))
            .bind(q.correct_answer.as_deref().map(str::trim))
            .bind(&q.topic)
            .bind(&q.source_pdf)
            .bind(q.page_number)
            .fetch_one(&mut *tx)
            .await?;
        saved.push(row);
    }
    tx.commit().await?;

    tracing::info!(
        extracted = extracted_count,
        saved = saved.len(),
        skipped_without_answer = skipped.len(),
        source = %paper.source_name(),
        "Past questions imported"
    );

    Ok(Json(saved))
}

/// Distinct papers in the bank with their question counts.
pub async fn available(
    State(pool): State<PgPool>,
    Query(params): Query<AvailableParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT exam_type, subject, year, COUNT(*) AS question_count FROM past_questions WHERE TRUE",
    );
    if let Some(exam_type) = params.exam_type.as_deref() {
        qb.push(" AND exam_type = ");
        qb.push_bind(exam_type);
    }
    if let Some(subject) = params.subject.as_deref() {
        qb.push(" AND subject = ");
        qb.push_bind(subject);
    }
    if let Some(year) = params.year.as_deref() {
        qb.push(" AND year = ");
        qb.push_bind(year);
    }
    qb.push(" GROUP BY exam_type, subject, year ORDER BY exam_type, subject, year DESC");

    let sets = qb
        .build_query_as::<AvailablePastQuestions>()
        .fetch_all(&pool)
        .await?;

    Ok(Json(sets))
}
