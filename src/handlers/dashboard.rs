// src/handlers/dashboard.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::NaiveDate;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{Config, DashboardPolicy},
    error::AppError,
    handlers::auth::{load_subjects, load_user},
    models::{
        dashboard::{
            ActivePlanSummary, ChildOverview, ChildProfile, ChildReport, ChildReportSummary,
            ChildStats, DailyActivity, ExamHistoryEntry, LinkChildResponse, OverviewStats,
            ParentDashboard, ParentSummary, ProgressChart, ProgressChartParams, RecentActivity,
            StudentOverview, StudentSummary,
        },
        user::{LinkChildRequest, USER_COLUMNS, User, UserRole},
    },
    services::stats::{average, child_subjects, round2, study_streak, subject_stats, weakest_subject},
    utils::jwt::Claims,
};

const DEFAULT_CHART_DAYS: i64 = 30;
const RECENT_EXAM_SCORES: i64 = 5;
const RECENT_ACTIVITY: i64 = 10;
const CHILD_RECOMMENDATIONS: [&str; 3] = [
    "Encourage daily practice",
    "Focus on weak subjects",
    "Take more mock exams",
];

async fn count_questions(pool: &PgPool, user_id: i64, filter: &str) -> Result<i64, AppError> {
    let sql = format!("SELECT COUNT(*) FROM question_history WHERE user_id = $1 {filter}");
    let count: i64 = sqlx::query_scalar(&sql).bind(user_id).fetch_one(pool).await?;
    Ok(count)
}

const TODAY: &str =
    "AND (solved_at AT TIME ZONE 'UTC')::date = (NOW() AT TIME ZONE 'UTC')::date";
const LAST_7_DAYS: &str = "AND solved_at >= NOW() - INTERVAL '7 days'";

async fn recent_exam_scores(pool: &PgPool, user_id: i64, limit: i64) -> Result<Vec<i32>, AppError> {
    let scores = sqlx::query_scalar(
        "SELECT score_percentage FROM exam_attempts \
         WHERE user_id = $1 AND completed_at IS NOT NULL \
         ORDER BY completed_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(scores)
}

pub async fn student_overview(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let user = load_user(&pool, user_id).await?;

    let total_questions_solved = count_questions(&pool, user_id, "").await?;
    let questions_today = count_questions(&pool, user_id, TODAY).await?;
    let questions_this_week = count_questions(&pool, user_id, LAST_7_DAYS).await?;

    let (total_exams_taken, average_score): (i64, Option<f64>) = sqlx::query_as(
        "SELECT COUNT(*), AVG(score_percentage)::FLOAT8 FROM exam_attempts \
         WHERE user_id = $1 AND completed_at IS NOT NULL",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let activity_dates: Vec<NaiveDate> = sqlx::query_scalar(
        "SELECT DISTINCT (solved_at AT TIME ZONE 'UTC')::date FROM question_history WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    let study_streak_days = study_streak(&activity_dates, chrono::Utc::now().date_naive());

    let subject_performance = subject_stats(&load_subjects(&pool, user_id).await?);
    let weakest = weakest_subject(
        &subject_performance,
        config.dashboard.weakest_subject_min_attempts,
    );

    let active_study_plan = sqlx::query_as::<_, (i64, String, i32, Option<chrono::DateTime<chrono::Utc>>)>(
        "SELECT id, plan_name, completion_percentage, exam_date FROM study_plans \
         WHERE user_id = $1 AND is_active ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .map(|(id, name, completion, exam_date)| ActivePlanSummary {
        id,
        name,
        completion,
        exam_date,
    });

    Ok(Json(StudentOverview {
        user: StudentSummary {
            name: user.full_name,
            class: user.student_class,
            subscription: user.subscription_tier,
        },
        stats: OverviewStats {
            total_questions_solved,
            questions_today,
            questions_this_week,
            total_exams_taken,
            average_exam_score: average_score.map(round2).unwrap_or(0.0),
            study_streak_days,
        },
        subject_performance,
        weakest_subject: weakest,
        active_study_plan,
    }))
}

/// Questions solved per UTC day over the last `days` days.
pub async fn progress_chart(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ProgressChartParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let days = params.days.unwrap_or(DEFAULT_CHART_DAYS).clamp(1, 365);

    let data = sqlx::query_as::<_, DailyActivity>(
        r#"
        SELECT (solved_at AT TIME ZONE 'UTC')::date AS date, COUNT(*) AS questions_solved
        FROM question_history
        WHERE user_id = $1 AND solved_at >= NOW() - make_interval(days => $2)
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(user_id)
    .bind(days as i32)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ProgressChart {
        period_days: days,
        data,
    }))
}

async fn child_overview(
    pool: &PgPool,
    policy: &DashboardPolicy,
    child: User,
) -> Result<ChildOverview, AppError> {
    let total_questions = count_questions(pool, child.id, "").await?;
    let weekly_questions = count_questions(pool, child.id, LAST_7_DAYS).await?;
    let recent_exam_scores = recent_exam_scores(pool, child.id, RECENT_EXAM_SCORES).await?;

    let (subjects, weak_subjects) = child_subjects(
        &load_subjects(pool, child.id).await?,
        policy.weak_subject_accuracy,
    );

    Ok(ChildOverview {
        child_id: child.id,
        name: child.full_name,
        class: child.student_class,
        email: child.email,
        stats: ChildStats {
            total_questions,
            average_score: average(&recent_exam_scores),
            recent_exam_scores,
            weekly_study_minutes: weekly_questions * policy.minutes_per_question,
        },
        subjects,
        weak_subjects,
        last_active: child.last_login,
    })
}

pub async fn parent_children(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let parent_id = claims.user_id()?;
    let parent = load_user(&pool, parent_id).await?;

    let sql = format!("SELECT {} FROM users WHERE parent_id = $1 ORDER BY id", USER_COLUMNS);
    let children = sqlx::query_as::<_, User>(&sql)
        .bind(parent_id)
        .fetch_all(&pool)
        .await?;

    let mut overviews = Vec::with_capacity(children.len());
    for child in children {
        overviews.push(child_overview(&pool, &config.dashboard, child).await?);
    }

    let message = overviews
        .is_empty()
        .then(|| "No linked children found".to_string());

    Ok(Json(ParentDashboard {
        parent: ParentSummary {
            name: parent.full_name,
            email: parent.email,
        },
        total_children: overviews.len(),
        children: overviews,
        message,
    }))
}

/// Links an existing student account to the calling parent.
pub async fn link_child(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LinkChildRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let parent_id = claims.user_id()?;

    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let child = sqlx::query_as::<_, User>(&sql)
        .bind(&payload.child_email)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound(
            "Child account not found. Please ensure your child has registered.".to_string(),
        ))?;

    if child.role != UserRole::Student.as_str() {
        return Err(AppError::BadRequest(
            "The account must be a student account".to_string(),
        ));
    }

    match child.parent_id {
        Some(current) if current == parent_id => {
            return Ok(Json(LinkChildResponse {
                message: "Child is already linked to your account".to_string(),
                child_id: child.id,
                child_name: child.full_name,
                child_email: child.email,
            }));
        }
        Some(_) if !config.dashboard.allow_child_relink => {
            return Err(AppError::Conflict(
                "This child account is already linked to another parent".to_string(),
            ));
        }
        _ => {}
    }

    sqlx::query("UPDATE users SET parent_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(parent_id)
        .bind(child.id)
        .execute(&pool)
        .await?;

    tracing::info!(parent_id, child_id = child.id, "Child linked");

    Ok(Json(LinkChildResponse {
        message: "Child linked successfully".to_string(),
        child_id: child.id,
        child_name: child.full_name,
        child_email: child.email,
    }))
}

pub async fn child_report(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(child_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let parent_id = claims.user_id()?;

    let sql = format!("SELECT {} FROM users WHERE id = $1 AND parent_id = $2", USER_COLUMNS);
    let child = sqlx::query_as::<_, User>(&sql)
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound(
            "Child not found or not linked to your account".to_string(),
        ))?;

    let total_questions = count_questions(&pool, child.id, "").await?;

    let recent_activity = sqlx::query_as::<_, RecentActivity>(
        "SELECT solved_at AS date, subject, topic FROM question_history \
         WHERE user_id = $1 ORDER BY solved_at DESC LIMIT $2",
    )
    .bind(child.id)
    .bind(RECENT_ACTIVITY)
    .fetch_all(&pool)
    .await?;

    let exam_history = sqlx::query_as::<_, ExamHistoryEntry>(
        "SELECT completed_at AS date, subject, score_percentage AS score, weak_topics \
         FROM exam_attempts WHERE user_id = $1 AND completed_at IS NOT NULL \
         ORDER BY completed_at DESC",
    )
    .bind(child.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ChildReport {
        child: ChildProfile {
            name: child.full_name,
            class: child.student_class,
            email: child.email,
        },
        summary: ChildReportSummary {
            total_questions,
            total_exams: exam_history.len(),
            last_active: child.last_login,
        },
        recent_activity,
        exam_history,
        recommendations: CHILD_RECOMMENDATIONS.to_vec(),
    }))
}
