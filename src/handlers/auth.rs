// src/handlers/auth.rs

use axum::{Extension, Form, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::{PgPool, Postgres, Transaction};
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{
        LoginForm, LoginRequest, ProfileResponse, RegisterRequest, SubjectPerformance,
        SubjectPerformanceResponse, TokenResponse, USER_COLUMNS, UpdateProfileRequest, User,
    },
    services::stats::accuracy,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Maps a unique violation on `users` to a readable conflict.
fn user_conflict(err: sqlx::Error) -> AppError {
    if !is_unique_violation(&err) {
        tracing::error!("Failed to save user: {:?}", err);
        return AppError::from(err);
    }
    let on_phone = match &err {
        sqlx::Error::Database(db_err) => db_err.constraint().is_some_and(|c| c.contains("phone")),
        _ => false,
    };
    if on_phone {
        AppError::Conflict("Phone number already registered".to_string())
    } else {
        AppError::Conflict("Email already registered".to_string())
    }
}

async fn add_subjects(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    subjects: &[String],
) -> Result<(), AppError> {
    for subject in subjects {
        sqlx::query(
            "INSERT INTO user_subjects (user_id, subject_name) VALUES ($1, $2) \
             ON CONFLICT (user_id, subject_name) DO NOTHING",
        )
        .bind(user_id)
        .bind(subject)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Loads a user by id.
pub async fn load_user(pool: &PgPool, user_id: i64) -> Result<User, AppError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// A user's subject counters in insertion order.
pub async fn load_subjects(pool: &PgPool, user_id: i64) -> Result<Vec<SubjectPerformance>, AppError> {
    let subjects = sqlx::query_as::<_, SubjectPerformance>(
        "SELECT id, subject_name, total_questions_attempted, correct_answers \
         FROM user_subjects WHERE user_id = $1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(subjects)
}

/// Registers a new user and returns a token right away.
///
/// One counter row is created per listed subject.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, phone, password_hash, full_name, role, student_class)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&hashed_password)
    .bind(&payload.full_name)
    .bind(payload.role.as_str())
    .bind(payload.student_class.map(|c| c.as_str()))
    .fetch_one(&mut *tx)
    .await
    .map_err(user_conflict)?;

    add_subjects(&mut tx, user_id, &payload.subjects).await?;

    tx.commit().await?;

    tracing::info!(user_id, role = payload.role.as_str(), "User registered");

    let access_token = sign_jwt(
        user_id,
        payload.role.as_str(),
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token,
            token_type: "bearer",
            user_id,
            role: payload.role.as_str().to_string(),
        }),
    ))
}

async fn authenticate(
    pool: &PgPool,
    config: &Config,
    email: &str,
    password: &str,
) -> Result<TokenResponse, AppError> {
    let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::AuthError("Incorrect email or password".to_string()))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::AuthError("Incorrect email or password".to_string()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await?;

    let access_token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        user_id: user.id,
        role: user.role,
    })
}

/// OAuth2 password-form login; the `username` field carries the email.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let token = authenticate(&pool, &config, &form.username, &form.password).await?;
    Ok(Json(token))
}

pub async fn login_json(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let token = authenticate(&pool, &config, &payload.email, &payload.password).await?;
    Ok(Json(token))
}

async fn profile(pool: &PgPool, user_id: i64) -> Result<ProfileResponse, AppError> {
    let user = load_user(pool, user_id).await?;
    let subjects = load_subjects(pool, user_id)
        .await?
        .into_iter()
        .map(|s| SubjectPerformanceResponse {
            accuracy: accuracy(s.correct_answers, s.total_questions_attempted),
            id: s.id,
            subject_name: s.subject_name,
            total_questions_attempted: s.total_questions_attempted,
            correct_answers: s.correct_answers,
        })
        .collect();

    Ok(ProfileResponse {
        id: user.id,
        email: user.email,
        phone: user.phone,
        full_name: user.full_name,
        role: user.role,
        student_class: user.student_class,
        subscription_tier: user.subscription_tier,
        is_active: user.is_active,
        created_at: user.created_at,
        last_login: user.last_login,
        subjects,
    })
}

/// Current user's profile with per-subject accuracy.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(profile(&pool, user_id).await?))
}

/// Updates the current user's profile.
///
/// A subject list replaces the tracked subjects: dropped subjects lose their
/// counters, kept ones keep them, new ones start at zero.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE users SET
            full_name = COALESCE($1, full_name),
            phone = COALESCE($2, phone),
            student_class = COALESCE($3, student_class),
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(&payload.full_name)
    .bind(&payload.phone)
    .bind(payload.student_class.map(|c| c.as_str()))
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| match user_conflict(e) {
        AppError::Conflict(_) => AppError::Conflict("Phone number already in use".to_string()),
        other => other,
    })?;

    if let Some(subjects) = &payload.subjects {
        sqlx::query("DELETE FROM user_subjects WHERE user_id = $1 AND NOT (subject_name = ANY($2))")
            .bind(user_id)
            .bind(subjects)
            .execute(&mut *tx)
            .await?;
        add_subjects(&mut tx, user_id, subjects).await?;
    }

    tx.commit().await?;

    Ok(Json(profile(&pool, user_id).await?))
}
