//! Integration tests for the talkstart HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket.

// Holding the env MutexGuard across await is intentional: tests that touch
// TALKSTART_* variables are serialized.
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::HeaderValue;
use axum_test::TestServer;
use serde_json::json;
use std::sync::{Arc, Mutex};
use talkstart::api::{
    AppState, CatalogResponse, HealthResponse, SaveResponse, SessionResponse, SessionStore,
    SessionView, create_router,
};
use talkstart_core::{Catalog, Phase, RecordingSink, ResultTier};

/// Serializes tests that read or write TALKSTART_* env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
        unsafe {
            std::env::remove_var("TALKSTART_API_KEY");
            std::env::remove_var("TALKSTART_RATE_LIMIT");
        }
    }
}

fn lock_env(api_key: Option<&str>) -> TestGuard {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::set_var("TALKSTART_RATE_LIMIT", "0");
        match api_key {
            Some(key) => std::env::set_var("TALKSTART_API_KEY", key),
            None => std::env::remove_var("TALKSTART_API_KEY"),
        }
    }
    TestGuard { _guard: guard }
}

/// Server over the standard catalog, recording analytics events.
fn create_test_server() -> (TestServer, Arc<RecordingSink>, TestGuard) {
    let guard = lock_env(None);
    let sink = Arc::new(RecordingSink::new());
    let state = AppState::new(Arc::new(Catalog::standard()), sink.clone());
    (
        TestServer::new(create_router(state)).unwrap(),
        sink,
        guard,
    )
}

async fn create_session(server: &TestServer) -> u64 {
    let response = server.post("/sessions").await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: SessionResponse = response.json();
    body.session.unwrap().id
}

fn view(response: &axum_test::TestResponse) -> SessionView {
    let body: SessionResponse = response.json();
    assert!(body.success, "unexpected error: {:?}", body.error);
    body.session.unwrap()
}

/// Drive a fresh session to the screening phase for `group`.
async fn start_screening(server: &TestServer, group: &str) -> u64 {
    let id = create_session(server).await;
    server
        .post(&format!("/sessions/{}/begin", id))
        .await
        .assert_status_ok();
    server
        .post(&format!("/sessions/{}/select", id))
        .json(&json!({ "age_group_id": group }))
        .await
        .assert_status_ok();
    id
}

async fn answer(server: &TestServer, id: u64, milestone: &str, value: bool) -> SessionView {
    let response = server
        .post(&format!("/sessions/{}/answer", id))
        .json(&json!({ "milestone_id": milestone, "value": value }))
        .await;
    response.assert_status_ok();
    view(&response)
}

// =============================================================================
// READ-ONLY ENDPOINTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _sink, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_catalog_endpoint() {
    let (server, _sink, _guard) = create_test_server();

    let response = server.get("/catalog").await;

    response.assert_status_ok();
    let catalog: CatalogResponse = response.json();
    let ids: Vec<&str> = catalog.groups.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["12-18", "18-24", "24-36"]);
    assert!(catalog.groups.iter().all(|g| g.milestones.len() == 4));
}

// =============================================================================
// SESSION FLOW
// =============================================================================

#[tokio::test]
async fn test_new_session_starts_at_welcome() {
    let (server, _sink, _guard) = create_test_server();
    let id = create_session(&server).await;

    let response = server.get(&format!("/sessions/{}", id)).await;

    response.assert_status_ok();
    let session = view(&response);
    assert_eq!(session.phase, Phase::Welcome);
    assert!(session.age_group.is_none());
    assert!(session.answers.is_empty());
}

#[tokio::test]
async fn test_full_screening_over_http() {
    let (server, sink, _guard) = create_test_server();
    let id = start_screening(&server, "18-24").await;

    let first = server.get(&format!("/sessions/{}", id)).await;
    let question = view(&first).current_question.unwrap();
    assert_eq!(question.milestone_id, "m5");
    assert_eq!((question.number, question.total), (1, 4));

    answer(&server, id, "m5", true).await;
    answer(&server, id, "m6", true).await;
    answer(&server, id, "m7", false).await;
    let done = answer(&server, id, "m8", true).await;

    assert_eq!(done.phase, Phase::Results);
    assert!(done.current_question.is_none());
    let result = done.result.unwrap();
    assert_eq!(result.score.achieved, 3);
    assert_eq!(result.score.percentage, 75);
    assert_eq!(result.tier, ResultTier::Caution);
    assert!(result.suggest_follow_up);
    assert_eq!(result.title, "Some Concerns");

    assert_eq!(
        sink.names(),
        vec![
            "select_age_group",
            "start_screening",
            "answer_question",
            "answer_question",
            "answer_question",
            "answer_question",
            "complete_screening",
        ]
    );
}

#[tokio::test]
async fn test_all_yes_is_positive() {
    let (server, _sink, _guard) = create_test_server();
    let id = start_screening(&server, "24-36").await;

    let mut last = None;
    for m in ["m9", "m10", "m11", "m12"] {
        last = Some(answer(&server, id, m, true).await);
    }

    let result = last.unwrap().result.unwrap();
    assert_eq!(result.score.percentage, 100);
    assert_eq!(result.tier, ResultTier::Positive);
    assert!(!result.suggest_follow_up);
}

// =============================================================================
// REJECTED ACTIONS
// =============================================================================

#[tokio::test]
async fn test_out_of_sequence_answer_is_conflict() {
    let (server, _sink, _guard) = create_test_server();
    let id = start_screening(&server, "12-18").await;

    let response = server
        .post(&format!("/sessions/{}/answer", id))
        .json(&json!({ "milestone_id": "m2", "value": true }))
        .await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: SessionResponse = response.json();
    assert!(!body.success);
    assert!(body.error.unwrap().contains("m1"));

    // State unchanged
    let session = view(&server.get(&format!("/sessions/{}", id)).await);
    assert!(session.answers.is_empty());
    assert_eq!(session.current_question.unwrap().milestone_id, "m1");
}

#[tokio::test]
async fn test_unknown_age_group_is_bad_request() {
    let (server, sink, _guard) = create_test_server();
    let id = create_session(&server).await;
    server.post(&format!("/sessions/{}/begin", id)).await;

    let response = server
        .post(&format!("/sessions/{}/select", id))
        .json(&json!({ "age_group_id": "48-60" }))
        .await;

    response.assert_status_bad_request();
    let session = view(&server.get(&format!("/sessions/{}", id)).await);
    assert_eq!(session.phase, Phase::AgeSelection);
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_undefined_transition_is_conflict() {
    let (server, _sink, _guard) = create_test_server();
    let id = create_session(&server).await;

    let restart = server.post(&format!("/sessions/{}/restart", id)).await;
    restart.assert_status(axum::http::StatusCode::CONFLICT);

    let save = server.post(&format!("/sessions/{}/save", id)).await;
    save.assert_status(axum::http::StatusCode::CONFLICT);
    let body: SaveResponse = save.json();
    assert!(body.report.is_none());
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (server, _sink, _guard) = create_test_server();

    server.get("/sessions/999").await.assert_status_not_found();
    server
        .post("/sessions/999/begin")
        .await
        .assert_status_not_found();
    server.delete("/sessions/999").await.assert_status_not_found();
}

#[tokio::test]
async fn test_session_limit_is_service_unavailable() {
    let _guard = lock_env(None);
    let state = AppState::with_store(
        Arc::new(Catalog::standard()),
        Arc::new(RecordingSink::new()),
        SessionStore::with_capacity(1),
    );
    let server = TestServer::new(create_router(state)).unwrap();

    server
        .post("/sessions")
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    server
        .post("/sessions")
        .await
        .assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// RESULTS ACTIONS
// =============================================================================

async fn finished_session(server: &TestServer) -> u64 {
    let id = start_screening(server, "12-18").await;
    for m in ["m1", "m2", "m3", "m4"] {
        answer(server, id, m, false).await;
    }
    id
}

#[tokio::test]
async fn test_save_is_repeatable() {
    let (server, sink, _guard) = create_test_server();
    let id = finished_session(&server).await;

    let first: SaveResponse = server.post(&format!("/sessions/{}/save", id)).await.json();
    let second: SaveResponse = server.post(&format!("/sessions/{}/save", id)).await.json();

    let report = first.report.unwrap();
    assert_eq!(report.tier, ResultTier::Concern);
    assert_eq!(report.score.percentage, 0);
    assert_eq!(report.answers.len(), 4);
    assert_eq!(second.report.unwrap(), report);

    let saves = sink
        .names()
        .into_iter()
        .filter(|n| *n == "save_results")
        .count();
    assert_eq!(saves, 2);

    let session = view(&server.get(&format!("/sessions/{}", id)).await);
    assert_eq!(session.phase, Phase::Results);
}

#[tokio::test]
async fn test_restart_clears_session() {
    let (server, _sink, _guard) = create_test_server();
    let id = finished_session(&server).await;

    let response = server.post(&format!("/sessions/{}/restart", id)).await;

    response.assert_status_ok();
    let session = view(&response);
    assert_eq!(session.phase, Phase::Welcome);
    assert!(session.age_group.is_none());
    assert!(session.answers.is_empty());
    assert!(session.result.is_none());
}

#[tokio::test]
async fn test_back_returns_to_welcome() {
    let (server, sink, _guard) = create_test_server();
    let id = create_session(&server).await;
    server.post(&format!("/sessions/{}/begin", id)).await;

    let response = server.post(&format!("/sessions/{}/back", id)).await;

    response.assert_status_ok();
    assert_eq!(view(&response).phase, Phase::Welcome);
    assert_eq!(sink.names(), vec!["go_back"]);

    // Only defined from age selection
    server
        .post(&format!("/sessions/{}/back", id))
        .await
        .assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reselecting_starts_clean_pass() {
    let (server, _sink, _guard) = create_test_server();
    let id = finished_session(&server).await;
    server.post(&format!("/sessions/{}/restart", id)).await;
    server.post(&format!("/sessions/{}/begin", id)).await;

    let again = server
        .post(&format!("/sessions/{}/select", id))
        .json(&json!({ "age_group_id": "18-24" }))
        .await;

    again.assert_status_ok();
    let session = view(&again);
    assert!(session.answers.is_empty());
    assert_eq!(session.progress.unwrap().answered, 0);
    assert_eq!(session.current_question.unwrap().milestone_id, "m5");
}

#[tokio::test]
async fn test_feedback_once_per_pass() {
    let (server, sink, _guard) = create_test_server();
    let id = finished_session(&server).await;

    let first = server
        .post(&format!("/sessions/{}/feedback", id))
        .json(&json!({ "rating": "helpful", "comment": "clear" }))
        .await;
    first.assert_status_ok();
    assert!(view(&first).feedback_submitted);

    let second = server
        .post(&format!("/sessions/{}/feedback", id))
        .json(&json!({ "rating": "not_helpful" }))
        .await;
    second.assert_status(axum::http::StatusCode::CONFLICT);

    assert_eq!(sink.names().last(), Some(&"provide_feedback"));
}

#[tokio::test]
async fn test_delete_session() {
    let (server, _sink, _guard) = create_test_server();
    let id = create_session(&server).await;

    server
        .delete(&format!("/sessions/{}", id))
        .await
        .assert_status_ok();
    server
        .get(&format!("/sessions/{}", id))
        .await
        .assert_status_not_found();
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server() -> TestServer {
    let state = AppState::new(
        Arc::new(Catalog::standard()),
        Arc::new(RecordingSink::new()),
    );
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let _guard = lock_env(Some(api_key));
    let server = create_auth_test_server();

    let response = server
        .get("/catalog")
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_or_missing_token_rejected() {
    let _guard = lock_env(Some("correct-key"));
    let server = create_auth_test_server();

    let wrong = server
        .post("/sessions")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;
    wrong.assert_status_unauthorized();

    server.get("/catalog").await.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_health_always_open() {
    let _guard = lock_env(Some("correct-key"));
    let server = create_auth_test_server();

    server.get("/health").await.assert_status_ok();
}
