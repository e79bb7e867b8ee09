// tests/api_tests.rs
//
// HTTP round-trip tests against a live Postgres. Skipped (with a note)
// when DATABASE_URL is not set, so the suite runs without a database.

use std::collections::HashMap;

use quizdeck::{config::Config, routes, state::AppState, utils::hash::hash_password};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and a pool for
/// seeding, or None when no database is configured.
async fn spawn_app() -> Option<(String, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState::new(pool.clone(), config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some((address, pool))
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Inserts an instructor directly; registration only creates students.
async fn seed_instructor(pool: &PgPool, username: &str, password: &str) {
    let hashed = hash_password(password).expect("Failed to hash password");
    sqlx::query("INSERT INTO users (username, password, role) VALUES ($1, $2, 'instructor')")
        .bind(username)
        .bind(hashed)
        .execute(pool)
        .await
        .expect("Failed to seed instructor");
}

async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    resp["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();
    let username = unique_name("u");

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["role"], "student");
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let Some((address, _pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn quiz_lifecycle_flow() {
    // Arrange
    let Some((address, pool)) = spawn_app().await else {
        return;
    };
    let client = reqwest::Client::new();

    let instructor = unique_name("t");
    let student = unique_name("s");
    let password = "password123";

    seed_instructor(&pool, &instructor, password).await;
    let instructor_token = login(&client, &address, &instructor, password).await;

    // 1. Instructor creates a class
    let class: serde_json::Value = client
        .post(format!("{}/api/classes", address))
        .bearer_auth(&instructor_token)
        .json(&serde_json::json!({ "name": "Geography 101" }))
        .send()
        .await
        .expect("Create class failed")
        .json()
        .await
        .unwrap();
    let class_id = class["id"].as_i64().expect("Class id missing");

    // 2. Student registers and is enrolled by username
    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": student,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed");

    let enroll_resp = client
        .post(format!("{}/api/classes/{}/enroll", address, class_id))
        .bearer_auth(&instructor_token)
        .json(&serde_json::json!({ "username": student }))
        .send()
        .await
        .expect("Enroll failed");
    assert_eq!(enroll_resp.status().as_u16(), 201);

    // 3. Instructor authors a quiz: 1pt single-select + 2pt boolean
    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&instructor_token)
        .json(&serde_json::json!({
            "class_id": class_id,
            "title": "Capitals",
            "questions": [
                {
                    "kind": "single",
                    "prompt": "Capital of France?",
                    "points": 1,
                    "options": [
                        { "label": "Paris", "is_correct": true },
                        { "label": "Rome" }
                    ]
                },
                {
                    "kind": "boolean",
                    "prompt": "Ghana is in Africa.",
                    "points": 2,
                    "options": [
                        { "label": "True", "is_correct": true },
                        { "label": "False" }
                    ]
                }
            ]
        }))
        .send()
        .await
        .expect("Create quiz failed")
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().expect("Quiz id missing");

    // 4. Student starts an attempt; served questions hide correct flags
    let student_token = login(&client, &address, &student, password).await;

    let started: serde_json::Value = client
        .post(format!("{}/api/quizzes/{}/attempts", address, quiz_id))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("Start attempt failed")
        .json()
        .await
        .unwrap();

    let attempt_id = started["attempt"]["id"].as_i64().expect("Attempt id missing");
    let questions = started["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(questions[0]["options"][0].get("is_correct").is_none());

    let q1 = questions[0]["id"].as_i64().unwrap();
    let q2 = questions[1]["id"].as_i64().unwrap();

    // 5. Autosave, then submit: correct on 1pt, wrong on 2pt -> 33%
    let autosave_resp = client
        .put(format!("{}/api/attempts/{}/answers", address, attempt_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({ "question_id": q1, "response": "Paris" }))
        .send()
        .await
        .expect("Autosave failed");
    assert_eq!(autosave_resp.status().as_u16(), 204);

    let mut submitted_answers = HashMap::new();
    submitted_answers.insert(q1.to_string(), "Paris".to_string());
    submitted_answers.insert(q2.to_string(), "False".to_string());

    let result: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({ "answers": submitted_answers }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["score"], 33);
    assert_eq!(result["total_points"], 3);
    assert_eq!(result["answered_count"], 2);

    // 6. Recalculating is idempotent
    let recalced: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/recalculate", address, attempt_id))
        .bearer_auth(&instructor_token)
        .send()
        .await
        .expect("Recalculate failed")
        .json()
        .await
        .unwrap();
    assert_eq!(recalced["score"], 33);

    // 7. Dashboard shows the scored attempt
    let results: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/results", address, quiz_id))
        .bearer_auth(&instructor_token)
        .send()
        .await
        .expect("Results failed")
        .json()
        .await
        .unwrap();

    let rows = results.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["score"], 33);
    assert_eq!(rows[0]["pending_essays"], 0);
}
