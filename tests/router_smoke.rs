// tests/router_smoke.rs

mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;
use tutor_backend::routes::create_router;

use common::{bearer, offline_state};

async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let app = create_router(offline_state());
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, auth: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn root_reports_running() {
    let (status, body) = send(get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn unknown_path_is_404() {
    let (status, _) = send(get("/random_path_that_does_not_exist", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    for uri in [
        "/api/exams/history",
        "/api/auth/me",
        "/api/questions/history",
        "/api/study-plans/active",
        "/api/dashboard/student/overview",
    ] {
        let (status, _) = send(get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, _) = send(get("/api/exams/history", Some("Bearer not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_gated_routes_reject_students() {
    let student = bearer(1, "student");

    let (status, _) = send(get("/api/dashboard/parent/children", Some(&student))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("POST")
        .uri("/api/past-questions/upload")
        .header(header::AUTHORIZATION, &student)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .body(Body::from("--x--\r\n"))
        .unwrap();
    let (status, _) = send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn subject_catalog_is_public() {
    let (status, body) = send(get("/api/topics/subjects", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 15);

    let (status, body) = send(get("/api/topics/syllabus/Physics", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_topics"], 8);

    let (status, body) = send(get("/api/topics/syllabus/Economics", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Syllabus topics coming soon");

    let (status, _) = send(get("/api/topics/syllabus/Astrology", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn exam_requests_are_validated_before_the_database() {
    let student = bearer(1, "student");

    let (status, body) = send(post_json(
        "/api/exams/create",
        Some(&student),
        serde_json::json!({
            "exam_type": "WAEC",
            "subject": "Physics",
            "number_of_questions": 5
        }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(post_json(
        "/api/exams/submit",
        Some(&student),
        serde_json::json!({"exam_id": 1, "answers": {}, "time_taken_seconds": -1}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn solve_needs_text_or_image() {
    let student = bearer(1, "student");

    let (status, body) = send(post_json(
        "/api/questions/solve",
        Some(&student),
        serde_json::json!({"question_text": "   "}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide either question text or image");
}

#[tokio::test]
async fn teach_rejects_unknown_subjects() {
    let student = bearer(1, "student");

    let (status, body) = send(post_json(
        "/api/topics/teach",
        Some(&student),
        serde_json::json!({"subject": "Astrology", "topic": "Stars"}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Subject not available"));
}

fn oversized_multipart(uri: &str, auth: &str, size: usize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from(vec![b'x'; size]))
        .unwrap()
}

#[tokio::test]
async fn image_uploads_are_capped() {
    let student = bearer(1, "student");

    let (status, _) = send(oversized_multipart(
        "/api/questions/solve-with-image",
        &student,
        2 * 1024 * 1024,
    ))
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = send(oversized_multipart(
        "/api/questions/solve-with-image",
        "Bearer not-a-jwt",
        16,
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pdf_uploads_are_capped() {
    let admin = bearer(1, "admin");

    let (status, _) = send(oversized_multipart(
        "/api/past-questions/upload",
        &admin,
        3 * 1024 * 1024,
    ))
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
