// tests/api_tests.rs

mod common;

use serde_json::{Value, json};

use common::{spawn_app, unique_email};

/// Registers a user and returns (token, user_id).
async fn register(
    client: &reqwest::Client,
    address: &str,
    email: &str,
    role: &str,
    subjects: &[&str],
) -> (String, i64) {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "email": email,
            "password": "password123",
            "full_name": "Test Student",
            "role": role,
            "student_class": "SS3",
            "subjects": subjects,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["user_id"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn register_login_and_profile() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email("reg");

    let (token, user_id) = register(&client, &app.address, &email, "student", &["Physics"]).await;

    // Duplicate email
    let duplicate = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "email": email,
            "password": "password123",
            "full_name": "Someone Else",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);

    // JSON login
    let login = client
        .post(format!("{}/api/auth/login/json", app.address))
        .json(&json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let login: Value = login.json().await.unwrap();
    assert_eq!(login["user_id"], user_id);
    assert_eq!(login["token_type"], "bearer");

    // OAuth2 form login
    let form_login = client
        .post(format!("{}/api/auth/login", app.address))
        .form(&[("username", email.as_str()), ("password", "password123")])
        .send()
        .await
        .unwrap();
    assert_eq!(form_login.status().as_u16(), 200);

    let wrong = client
        .post(format!("{}/api/auth/login/json", app.address))
        .json(&json!({"email": email, "password": "not-the-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    let me: Value = client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["subjects"][0]["subject_name"], "Physics");
    assert_eq!(me["subjects"][0]["accuracy"], Value::Null);
    assert!(me["last_login"].is_string());
}

#[tokio::test]
async fn register_fails_validation() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "email": "not-an-email",
            "password": "short",
            "full_name": "X"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn mock_exam_flow() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Seed a private paper so parallel runs never share questions.
    let exam_type = format!("T{}", &uuid::Uuid::new_v4().to_string()[..8]);
    for n in 1..=15 {
        sqlx::query(
            r#"
            INSERT INTO past_questions (exam_type, subject, year, question_number, question_text, options, correct_answer, topic)
            VALUES ($1, 'Physics', '2023', $2, $3, $4, 'A', $5)
            "#,
        )
        .bind(&exam_type)
        .bind(n)
        .bind(format!("Question {}", n))
        .bind(json!({"A": "right", "B": "wrong", "C": "wrong", "D": "wrong"}))
        .bind(if n % 3 == 0 { "Optics" } else { "Mechanics" })
        .execute(&app.pool)
        .await
        .unwrap();
    }

    let (token, _) = register(&client, &app.address, &unique_email("exam"), "student", &["Physics"]).await;

    let created = client
        .post(format!("{}/api/exams/create", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "exam_type": exam_type,
            "subject": "Physics",
            "year": "Random Mix",
            "number_of_questions": 10
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["total_questions"], 10);
    assert!(!created.to_string().contains("correct_answer"));
    let exam_id = created["exam_id"].as_i64().unwrap();

    // Answer the first eight correctly, leave two blank.
    let answers: serde_json::Map<String, Value> =
        (1..=8).map(|p| (p.to_string(), json!("A"))).collect();
    let submit_body = json!({"exam_id": exam_id, "answers": answers, "time_taken_seconds": 900});

    let submitted = client
        .post(format!("{}/api/exams/submit", app.address))
        .bearer_auth(&token)
        .json(&submit_body)
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status().as_u16(), 200);
    let submitted: Value = submitted.json().await.unwrap();
    assert_eq!(submitted["correct_count"], 8);
    assert_eq!(submitted["score_percentage"], 80);
    assert_eq!(submitted["detailed_results"].as_array().unwrap().len(), 10);

    let again = client
        .post(format!("{}/api/exams/submit", app.address))
        .bearer_auth(&token)
        .json(&submit_body)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 409);

    let result: Value = client
        .get(format!("{}/api/exams/{}", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score_percentage"], 80);
    assert_eq!(result["weak_topics"], submitted["weak_topics"]);

    let history: Vec<Value> = client
        .get(format!("{}/api/exams/history?subject=Physics", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["exam_id"], exam_id);
    assert!(history[0].get("detailed_results").is_none());

    // Counters moved once: 10 attempted, 8 correct.
    let me: Value = client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["subjects"][0]["total_questions_attempted"], 10);
    assert_eq!(me["subjects"][0]["correct_answers"], 8);
    assert_eq!(me["subjects"][0]["accuracy"], 80.0);
}

#[tokio::test]
async fn exam_without_content_is_unavailable() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (token, _) = register(&client, &app.address, &unique_email("empty"), "student", &[]).await;

    let exam_type = format!("T{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let response = client
        .post(format!("{}/api/exams/create", app.address))
        .bearer_auth(&token)
        .json(&json!({"exam_type": exam_type, "subject": "Chemistry"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    let history: Vec<Value> = client
        .get(format!("{}/api/exams/history", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn solved_questions_are_recorded() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (token, _) = register(&client, &app.address, &unique_email("solve"), "student", &[]).await;

    let solved = client
        .post(format!("{}/api/questions/solve", app.address))
        .bearer_auth(&token)
        .json(&json!({"question_text": "What is 2 + 2?", "subject": "Mathematics"}))
        .send()
        .await
        .unwrap();
    assert_eq!(solved.status().as_u16(), 200);
    let solved: Value = solved.json().await.unwrap();
    assert_eq!(solved["solution"], "Final Answer: 4");
    let question_id = solved["question_id"].as_i64().unwrap();

    let history: Vec<Value> = client
        .get(format!("{}/api/questions/history", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], question_id);

    // The subject row is created on first use.
    let me: Value = client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["subjects"][0]["subject_name"], "Mathematics");
    assert_eq!(me["subjects"][0]["total_questions_attempted"], 1);

    let overview: Value = client
        .get(format!("{}/api/dashboard/student/overview", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["stats"]["total_questions_solved"], 1);
    assert_eq!(overview["stats"]["questions_today"], 1);
    assert_eq!(overview["stats"]["study_streak_days"], 1);
    assert_eq!(overview["weakest_subject"], Value::Null);
}

#[tokio::test]
async fn exams_only_draw_answered_bank_questions() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let exam_type = format!("T{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let rows: [(i32, Option<&str>); 5] = [
        (1, Some("A")),
        (2, Some("B")),
        (3, Some("C")),
        (4, None),
        (5, Some("")),
    ];
    for (n, answer) in rows {
        let text = if answer.is_some_and(|a| !a.is_empty()) {
            format!("Answered {}", n)
        } else {
            format!("Blank {}", n)
        };
        sqlx::query(
            r#"
            INSERT INTO past_questions (exam_type, subject, year, question_number, question_text, options, correct_answer, topic)
            VALUES ($1, 'Chemistry', '2022', $2, $3, $4, $5, 'Bonding')
            "#,
        )
        .bind(&exam_type)
        .bind(n)
        .bind(text)
        .bind(json!({"A": "a", "B": "b", "C": "c", "D": "d"}))
        .bind(answer)
        .execute(&app.pool)
        .await
        .unwrap();
    }

    let (token, _) = register(&client, &app.address, &unique_email("bank"), "student", &[]).await;
    let created = client
        .post(format!("{}/api/exams/create", app.address))
        .bearer_auth(&token)
        .json(&json!({"exam_type": exam_type, "subject": "Chemistry", "number_of_questions": 20}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    let created: Value = created.json().await.unwrap();
    assert_eq!(created["total_questions"], 3);
    let questions = created["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(
        questions
            .iter()
            .all(|q| q["question_text"].as_str().unwrap().starts_with("Answered"))
    );
}

fn paper_form(exam_type: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"%PDF-1.4 fake".to_vec())
                .file_name("paper.pdf")
                .mime_str("application/pdf")
                .unwrap(),
        )
        .text("exam_type", exam_type.to_string())
        .text("subject", "Biology")
        .text("year", "2021")
}

#[tokio::test]
async fn admin_imports_a_past_question_paper() {
    let Some(app) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (admin, _) = register(&client, &app.address, &unique_email("admin"), "admin", &[]).await;

    let exam_type = format!("T{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let response = client
        .post(format!("{}/api/past-questions/upload", app.address))
        .bearer_auth(&admin)
        .multipart(paper_form(&exam_type))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let saved: Vec<Value> = response.json().await.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1]["page_number"], 2);
    assert_eq!(saved[0]["correct_answer"], "A");
    let first_ids: Vec<i64> = saved.iter().map(|q| q["id"].as_i64().unwrap()).collect();

    // Importing the same paper again overwrites by (exam_type, subject, year, number).
    *app.tutor.extracted_key.lock().unwrap() = Some(("C".to_string(), "Genetics".to_string()));
    let reimported: Vec<Value> = client
        .post(format!("{}/api/past-questions/upload", app.address))
        .bearer_auth(&admin)
        .multipart(paper_form(&exam_type))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second_ids: Vec<i64> = reimported.iter().map(|q| q["id"].as_i64().unwrap()).collect();
    assert_eq!(second_ids, first_ids);

    let stored: Vec<(Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT correct_answer, topic FROM past_questions WHERE exam_type = $1 ORDER BY question_number",
    )
    .bind(&exam_type)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(stored.len(), 2);
    assert!(
        stored
            .iter()
            .all(|(answer, topic)| answer.as_deref() == Some("C") && topic.as_deref() == Some("Genetics"))
    );

    let available: Vec<Value> = client
        .get(format!("{}/api/past-questions/available?exam_type={}", app.address, exam_type))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["question_count"], 2);

    // Not a PDF
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"hello".to_vec())
                .file_name("notes.txt")
                .mime_str("text/plain")
                .unwrap(),
        )
        .text("exam_type", exam_type)
        .text("subject", "Biology")
        .text("year", "2021");
    let rejected = client
        .post(format!("{}/api/past-questions/upload", app.address))
        .bearer_auth(&admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status().as_u16(), 400);
}
