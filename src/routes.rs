// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, dashboard, exams, health, past_questions, questions, study_plans, topics},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, parent_middleware},
};

/// Room for multipart boundaries and the text fields around a file part.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Assembles the main application router.
///
/// * Nests one sub-router per feature area under `/api`.
/// * Layers auth, then role checks, on the protected routes.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let image_limit = state.config.max_upload_size + MULTIPART_OVERHEAD;
    let pdf_limit = state.config.max_pdf_size + MULTIPART_OVERHEAD;

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/login/json", post(auth::login_json))
        .merge(
            Router::new()
                .route("/me", get(auth::get_me).put(auth::update_me))
                .layer(auth_layer.clone()),
        );

    let question_routes = Router::new()
        .route("/solve", post(questions::solve))
        .route("/history", get(questions::history))
        .route("/history/{question_id}", get(questions::history_detail))
        .merge(
            Router::new()
                .route("/solve-with-image", post(questions::solve_with_image))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(image_limit)),
        )
        .layer(auth_layer.clone());

    let topic_routes = Router::new()
        .route("/subjects", get(topics::list_subjects))
        .route("/syllabus/{subject}", get(topics::get_syllabus))
        .merge(
            Router::new()
                .route("/teach", post(topics::teach))
                .route("/simplify", post(topics::simplify))
                .route("/saved-lessons", get(topics::list_saved_lessons))
                .route("/saved-lessons/{lesson_id}", get(topics::get_saved_lesson))
                .route("/chat", post(topics::chat))
                .route("/chat/{lesson_id}/history", get(topics::chat_history))
                .layer(auth_layer.clone()),
        );

    let study_plan_routes = Router::new()
        .route("/generate", post(study_plans::generate))
        .route("/my-plans", get(study_plans::my_plans))
        .route("/active", get(study_plans::active))
        .route("/{plan_id}/progress", put(study_plans::update_progress))
        .layer(auth_layer.clone());

    let exam_routes = Router::new()
        .route("/create", post(exams::create))
        .route("/submit", post(exams::submit))
        .route("/history", get(exams::history))
        .route("/{exam_id}", get(exams::get_result))
        .layer(auth_layer.clone());

    // Role check runs after authentication: layers apply from the outside in.
    let parent_routes = Router::new()
        .route("/children", get(dashboard::parent_children))
        .route("/link-child", post(dashboard::link_child))
        .route("/child/{child_id}/detailed", get(dashboard::child_report))
        .layer(middleware::from_fn(parent_middleware));

    let dashboard_routes = Router::new()
        .route("/student/overview", get(dashboard::student_overview))
        .route("/student/progress-chart", get(dashboard::progress_chart))
        .nest("/parent", parent_routes)
        .layer(auth_layer.clone());

    let past_question_routes = Router::new()
        .route("/available", get(past_questions::available))
        .merge(
            Router::new()
                .route("/upload", post(past_questions::upload))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(pdf_limit))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(auth_layer);

    Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/topics", topic_routes)
        .nest("/api/study-plans", study_plan_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/past-questions", past_question_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
