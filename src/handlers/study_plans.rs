// src/handlers/study_plans.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::study_plan::{
        ProgressUpdateRequest, STUDY_PLAN_COLUMNS, StudyPlan, StudyPlanPrompt, StudyPlanRequest,
        StudyPlanResponse,
    },
    services::stats::{flatten_schedule, weeks_until_exam},
    state::AppState,
    utils::jwt::Claims,
};

fn plan_response(plan: &StudyPlan) -> StudyPlanResponse {
    StudyPlanResponse {
        id: plan.id,
        plan_name: plan.plan_name.clone(),
        target_exam: plan.target_exam.clone(),
        exam_date: plan.exam_date,
        hours_per_day: plan.hours_per_day,
        days_per_week: plan.days_per_week,
        weekly_schedule: flatten_schedule(&plan.weekly_schedule),
        completion_percentage: plan.completion_percentage,
        is_active: plan.is_active,
        created_at: plan.created_at,
    }
}

/// Generates a plan and makes it the user's only active one.
pub async fn generate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StudyPlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let prompt = StudyPlanPrompt {
        subjects: &payload.subjects,
        hours_per_day: payload.hours_per_day,
        days_per_week: payload.days_per_week,
        weeks_until_exam: weeks_until_exam(payload.exam_date, chrono::Utc::now()),
        weak_areas: &payload.weak_areas,
    };
    let generated = state.tutor.generate_study_plan(&prompt).await?;

    let mut tx = state.pool.begin().await?;

    sqlx::query("UPDATE study_plans SET is_active = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_active")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let sql = format!(
        r#"
        INSERT INTO study_plans
            (user_id, plan_name, target_exam, exam_date, hours_per_day, days_per_week, weekly_schedule, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        RETURNING {}
        "#,
        STUDY_PLAN_COLUMNS
    );
    let plan = sqlx::query_as::<_, StudyPlan>(&sql)
        .bind(user_id)
        .bind(format!("{} Preparation Plan", payload.target_exam))
        .bind(&payload.target_exam)
        .bind(payload.exam_date)
        .bind(payload.hours_per_day)
        .bind(payload.days_per_week)
        .bind(SqlJson(&generated.weekly_breakdown))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save study plan: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tx.commit().await?;

    tracing::info!(user_id, plan_id = plan.id, "Study plan generated");

    Ok((StatusCode::CREATED, Json(plan_response(&plan))))
}

pub async fn my_plans(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let sql = format!(
        "SELECT {} FROM study_plans WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        STUDY_PLAN_COLUMNS
    );
    let plans = sqlx::query_as::<_, StudyPlan>(&sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await?;

    let body: Vec<StudyPlanResponse> = plans.iter().map(plan_response).collect();
    Ok(Json(body))
}

pub async fn active(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let sql = format!(
        "SELECT {} FROM study_plans WHERE user_id = $1 AND is_active ORDER BY created_at DESC LIMIT 1",
        STUDY_PLAN_COLUMNS
    );
    let plan = sqlx::query_as::<_, StudyPlan>(&sql)
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound(
            "No active study plan found. Please create one.".to_string(),
        ))?;

    Ok(Json(plan_response(&plan)))
}

/// Sets the completion of one of the caller's plans, clamped to 0..=100.
pub async fn update_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(plan_id): Path<i64>,
    Query(params): Query<ProgressUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let completion = params.completion_percentage.clamp(0, 100);

    let updated: Option<i32> = sqlx::query_scalar(
        "UPDATE study_plans SET completion_percentage = $1, updated_at = NOW() \
         WHERE id = $2 AND user_id = $3 RETURNING completion_percentage",
    )
    .bind(completion)
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    let completion_percentage =
        updated.ok_or(AppError::NotFound("Study plan not found".to_string()))?;

    Ok(Json(json!({
        "message": "Progress updated",
        "completion_percentage": completion_percentage,
    })))
}
