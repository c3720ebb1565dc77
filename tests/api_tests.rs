// tests/api_tests.rs

use quizdeck::{config::Config, routes, state::AppState};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // Note: For Postgres, you must have a running database.
    // We'll read from DATABASE_URL environment variable.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers and logs in a creator, returning a Bearer token.
async fn creator_token(client: &reqwest::Client, address: &str) -> String {
    let email = unique_email("creator");
    let password = "password123";

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "name": "Test Creator", "email": email, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

/// Logs in a participant via the lightweight email-only login.
async fn participant_token(client: &reqwest::Client, address: &str) -> String {
    let resp: serde_json::Value = client
        .post(format!("{}/api/auth/play", address))
        .json(&json!({ "email": unique_email("player"), "name": "Player One" }))
        .send()
        .await
        .expect("Play login failed")
        .json()
        .await
        .expect("Failed to parse play login json");

    resp["token"].as_str().expect("Token not found").to_string()
}

/// A two-question quiz payload: multiple choice worth 2, true/false worth 1.
fn two_question_quiz(title: &str) -> serde_json::Value {
    json!({
        "title": title,
        "timer_mode": "none",
        "questions": [
            {
                "type": "multiple_choice",
                "text": "What is the capital of France?",
                "points": 2,
                "choices": [
                    { "text": "Paris", "is_correct": true },
                    { "text": "Lyon", "is_correct": false }
                ]
            },
            {
                "type": "true_false",
                "text": "The Seine flows through Paris.",
                "points": 1,
                "correct_bool": true
            }
        ]
    })
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Password too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": "Shorty",
            "email": unique_email("short"),
            "password": "abc"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn authoring_requires_creator_session() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quizzes", address))
        .json(&two_question_quiz("No session"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);

    // A participant token must not pass the creator middleware either.
    let token = participant_token(&client, &address).await;
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&two_question_quiz("Wrong scope"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn upsert_validation_rules() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = creator_token(&client, &address).await;

    // Global timer mode without a timer
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&json!({ "title": "Timed", "timer_mode": "global", "questions": [] }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Multiple choice with a single choice
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "One choice",
            "timer_mode": "none",
            "questions": [{
                "type": "multiple_choice",
                "text": "Pick the only option?",
                "choices": [{ "text": "Only", "is_correct": true }]
            }]
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Multiple choice with no correct choice
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "No answer",
            "timer_mode": "none",
            "questions": [{
                "type": "multiple_choice",
                "text": "Which one is right?",
                "choices": [
                    { "text": "A", "is_correct": false },
                    { "text": "B", "is_correct": false }
                ]
            }]
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn upsert_replaces_question_set() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = creator_token(&client, &address).await;

    let created: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&two_question_quiz("Replace me"))
        .send()
        .await
        .expect("Create failed")
        .json()
        .await
        .expect("Failed to parse create json");
    let quiz_id = created["id"].as_i64().expect("Quiz id missing");

    let fetched: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Get failed")
        .json()
        .await
        .expect("Failed to parse quiz json");
    assert_eq!(fetched["questions"].as_array().unwrap().len(), 2);

    // Update with a single question: the set is replaced, not merged.
    let update: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&json!({
            "id": quiz_id,
            "title": "Replaced",
            "timer_mode": "none",
            "questions": [{
                "type": "fill_in_blank",
                "text": "Name the capital of France.",
                "correct_answer": "Paris",
                "accepted_answers": "paris, city of light"
            }]
        }))
        .send()
        .await
        .expect("Update failed")
        .json()
        .await
        .expect("Failed to parse update json");
    assert_eq!(update["id"].as_i64(), Some(quiz_id));

    let fetched: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Get failed")
        .json()
        .await
        .expect("Failed to parse quiz json");
    assert_eq!(fetched["quiz"]["title"], "Replaced");
    assert_eq!(fetched["questions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_quiz_is_idempotent() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = creator_token(&client, &address).await;

    let created: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&two_question_quiz("Doomed"))
        .send()
        .await
        .expect("Create failed")
        .json()
        .await
        .expect("Failed to parse create json");
    let quiz_id = created["id"].as_i64().unwrap();

    for _ in 0..2 {
        let response = client
            .delete(format!("{}/api/quizzes/{}", address, quiz_id))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Delete failed");
        assert_eq!(response.status().as_u16(), 200);
    }
}

#[tokio::test]
async fn empty_report_has_no_division_errors() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = creator_token(&client, &address).await;

    let created: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&two_question_quiz("Untaken"))
        .send()
        .await
        .expect("Create failed")
        .json()
        .await
        .expect("Failed to parse create json");
    let quiz_id = created["id"].as_i64().unwrap();

    let report: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/report", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Report failed")
        .json()
        .await
        .expect("Failed to parse report json");

    assert_eq!(report["participant_count"], 0);
    assert_eq!(report["accuracy"], 0.0);
    assert_eq!(report["completion_rate"], 0.0);
    assert!(report["last_attempt"].is_null());
}

#[tokio::test]
async fn full_quiz_taking_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = creator_token(&client, &address).await;

    // 1. Author a two-question quiz (MC worth 2, TF worth 1).
    let created: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&two_question_quiz("Geography check"))
        .send()
        .await
        .expect("Create failed")
        .json()
        .await
        .expect("Failed to parse create json");
    let quiz_id = created["id"].as_i64().unwrap();

    let fetched: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Get failed")
        .json()
        .await
        .expect("Failed to parse quiz json");
    let code = fetched["code"].as_str().expect("Quiz code missing").to_string();

    // 2. Not yet live: public route shows offline, attempts are refused.
    let view: serde_json::Value = client
        .get(format!("{}/api/play/{}", address, code))
        .send()
        .await
        .expect("View failed")
        .json()
        .await
        .expect("Failed to parse view json");
    assert_eq!(view["state"], "offline-draft");

    let player = participant_token(&client, &address).await;
    let refused = client
        .post(format!("{}/api/play/{}/attempts", address, code))
        .bearer_auth(&player)
        .send()
        .await
        .expect("Start failed");
    assert_eq!(refused.status().as_u16(), 409);

    // 3. Go live.
    let response = client
        .patch(format!("{}/api/quizzes/{}/live", address, quiz_id))
        .bearer_auth(&token)
        .json(&json!({ "is_live": true }))
        .send()
        .await
        .expect("Set live failed");
    assert_eq!(response.status().as_u16(), 200);

    let view: serde_json::Value = client
        .get(format!("{}/api/play/{}", address, code))
        .send()
        .await
        .expect("View failed")
        .json()
        .await
        .expect("Failed to parse view json");
    assert_eq!(view["state"], "taking");
    let questions = view["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    // No correct-answer material on the public route.
    for q in questions {
        assert!(q.get("correct_bool").is_none());
        for c in q["choices"].as_array().unwrap() {
            assert!(c.get("is_correct").is_none());
        }
    }

    // 4. Start an attempt and answer both questions correctly.
    let started: serde_json::Value = client
        .post(format!("{}/api/play/{}/attempts", address, code))
        .bearer_auth(&player)
        .send()
        .await
        .expect("Start failed")
        .json()
        .await
        .expect("Failed to parse attempt json");
    let attempt_id = started["attempt_id"].as_i64().unwrap();

    let mc = questions
        .iter()
        .find(|q| q["type"] == "multiple_choice")
        .unwrap();
    let paris = mc["choices"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["text"] == "Paris")
        .unwrap();
    let tf = questions.iter().find(|q| q["type"] == "true_false").unwrap();

    let submitted: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&json!({
            "answers": [
                { "question_id": mc["id"], "choice_id": paris["id"] },
                { "question_id": tf["id"], "answer_bool": true }
            ]
        }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .expect("Failed to parse submit json");
    assert_eq!(submitted["score"], 3);
    assert_eq!(submitted["max_score"], 3);

    // 5. Re-submission conflicts: the attempt is immutable now.
    let again = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&json!({ "answers": [] }))
        .send()
        .await
        .expect("Resubmit failed");
    assert_eq!(again.status().as_u16(), 409);

    // 6. The creator's report shows a perfect run.
    let report: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}/report", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Report failed")
        .json()
        .await
        .expect("Failed to parse report json");
    assert_eq!(report["participant_count"], 1);
    assert_eq!(report["accuracy"], 100.0);
    assert_eq!(report["completion_rate"], 100.0);
    assert!(!report["last_attempt"].is_null());

    // 7. Taking the quiz offline flips the public route back.
    client
        .patch(format!("{}/api/quizzes/{}/live", address, quiz_id))
        .bearer_auth(&token)
        .json(&json!({ "is_live": false }))
        .send()
        .await
        .expect("Set live failed");

    let view: serde_json::Value = client
        .get(format!("{}/api/play/{}", address, code))
        .send()
        .await
        .expect("View failed")
        .json()
        .await
        .expect("Failed to parse view json");
    assert_eq!(view["state"], "offline-paused");
}

/// Authors a live two-question quiz and starts an attempt.
/// Returns (quiz public code, attempt id, questions from the public view).
async fn live_quiz_with_attempt(
    client: &reqwest::Client,
    address: &str,
    creator: &str,
    player: &str,
) -> (String, i64, Vec<serde_json::Value>) {
    let created: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(creator)
        .json(&two_question_quiz("Race course"))
        .send()
        .await
        .expect("Create failed")
        .json()
        .await
        .expect("Failed to parse create json");
    let quiz_id = created["id"].as_i64().unwrap();

    let fetched: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(creator)
        .send()
        .await
        .expect("Get failed")
        .json()
        .await
        .expect("Failed to parse quiz json");
    let code = fetched["code"].as_str().unwrap().to_string();

    client
        .patch(format!("{}/api/quizzes/{}/live", address, quiz_id))
        .bearer_auth(creator)
        .json(&json!({ "is_live": true }))
        .send()
        .await
        .expect("Set live failed");

    let view: serde_json::Value = client
        .get(format!("{}/api/play/{}", address, code))
        .send()
        .await
        .expect("View failed")
        .json()
        .await
        .expect("Failed to parse view json");
    let questions = view["questions"].as_array().unwrap().clone();

    let started: serde_json::Value = client
        .post(format!("{}/api/play/{}/attempts", address, code))
        .bearer_auth(player)
        .send()
        .await
        .expect("Start failed")
        .json()
        .await
        .expect("Failed to parse attempt json");
    let attempt_id = started["attempt_id"].as_i64().unwrap();

    (code, attempt_id, questions)
}

#[tokio::test]
async fn concurrent_submits_seal_attempt_once() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let creator = creator_token(&client, &address).await;
    let player = participant_token(&client, &address).await;

    let (_, attempt_id, questions) =
        live_quiz_with_attempt(&client, &address, &creator, &player).await;
    let tf = questions.iter().find(|q| q["type"] == "true_false").unwrap();
    let body = json!({
        "answers": [{ "question_id": tf["id"], "answer_bool": true }]
    });

    // Fire two submits of the same attempt at once: exactly one may
    // seal it, the other must see Conflict whichever way they interleave.
    let first = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&body)
        .send();
    let second = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&body)
        .send();

    let (a, b) = tokio::join!(first, second);
    let mut statuses = vec![
        a.expect("First submit failed").status().as_u16(),
        b.expect("Second submit failed").status().as_u16(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);
}

#[tokio::test]
async fn submit_rejects_malformed_answer_sets() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let creator = creator_token(&client, &address).await;
    let player = participant_token(&client, &address).await;

    let (_, attempt_id, questions) =
        live_quiz_with_attempt(&client, &address, &creator, &player).await;
    let tf = questions.iter().find(|q| q["type"] == "true_false").unwrap();

    // The same question answered twice in one payload.
    let duplicated = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&json!({
            "answers": [
                { "question_id": tf["id"], "answer_bool": true },
                { "question_id": tf["id"], "answer_bool": false }
            ]
        }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(duplicated.status().as_u16(), 400);

    // A question that does not belong to the quiz.
    let foreign = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&json!({
            "answers": [{ "question_id": 999_999_999, "answer_bool": true }]
        }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(foreign.status().as_u16(), 400);

    // Neither rejection sealed the attempt: a valid submit still lands.
    let valid = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&player)
        .json(&json!({
            "answers": [{ "question_id": tf["id"], "answer_bool": true }]
        }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(valid.status().as_u16(), 200);
}

#[tokio::test]
async fn display_status_drives_offline_gate() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = creator_token(&client, &address).await;

    // A scheduled quiz with a future start reads as offline-scheduled.
    let scheduled_at = (chrono::Utc::now() + chrono::Duration::hours(2)).to_rfc3339();
    let mut payload = two_question_quiz("Next week's round");
    payload["status"] = json!("scheduled");
    payload["scheduled_at"] = json!(scheduled_at);

    let created: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .expect("Create failed")
        .json()
        .await
        .expect("Failed to parse create json");
    let quiz_id = created["id"].as_i64().unwrap();

    let fetched: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Get failed")
        .json()
        .await
        .expect("Failed to parse quiz json");
    let code = fetched["code"].as_str().unwrap();

    let view: serde_json::Value = client
        .get(format!("{}/api/play/{}", address, code))
        .send()
        .await
        .expect("View failed")
        .json()
        .await
        .expect("Failed to parse view json");
    assert_eq!(view["state"], "offline-scheduled");

    // Marking the quiz ended flips the offline message.
    payload["id"] = json!(quiz_id);
    payload["status"] = json!("ended");
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .expect("Update failed");
    assert_eq!(response.status().as_u16(), 200);

    let view: serde_json::Value = client
        .get(format!("{}/api/play/{}", address, code))
        .send()
        .await
        .expect("View failed")
        .json()
        .await
        .expect("Failed to parse view json");
    assert_eq!(view["state"], "offline-ended");
}
