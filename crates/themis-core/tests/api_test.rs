// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API integration tests.
//!
//! Drives the full router with in-process requests against an in-memory
//! SQLite store, covering authentication, triggering, polling, the completed
//! feed, bulk deletion and the health endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use themis_core::handlers::AppState;
use themis_core::model::{Issue, Severity};
use themis_core::server::build_router;
use themis_core::store::SqliteStore;
use themis_core::tags::TagCache;
use themis_core::worker::{AnalysisError, AnalysisTarget, Analyzer, CheckWorker};

const API_KEY: &str = "test-api-key";

struct FixedAnalyzer {
    issues: Vec<Issue>,
}

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, _target: &AnalysisTarget) -> Result<Vec<Issue>, AnalysisError> {
        Ok(self.issues.clone())
    }
}

/// Blocks analysis until the test releases it, so a run can be observed
/// while still pending or in progress.
struct GatedAnalyzer {
    gate: Arc<tokio::sync::Notify>,
}

#[async_trait]
impl Analyzer for GatedAnalyzer {
    async fn analyze(&self, _target: &AnalysisTarget) -> Result<Vec<Issue>, AnalysisError> {
        self.gate.notified().await;
        Ok(Vec::new())
    }
}

async fn test_app_with_analyzer(analyzer: Arc<dyn Analyzer>) -> (Router, Arc<SqliteStore>) {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    sqlx::migrate!("./migrations/sqlite")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(SqliteStore::new(pool));
    let tags = Arc::new(TagCache::new());
    let worker = Arc::new(CheckWorker::new(store.clone(), analyzer, tags.clone()));
    let state = Arc::new(AppState::new(store.clone(), worker, tags));
    let router = build_router(state, vec![API_KEY.to_string()]);
    (router, store)
}

async fn test_app_with(issues: Vec<Issue>) -> (Router, Arc<SqliteStore>) {
    test_app_with_analyzer(Arc::new(FixedAnalyzer { issues })).await
}

async fn test_app() -> (Router, Arc<SqliteStore>) {
    test_app_with(Vec::new()).await
}

fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
    request.header("x-api-key", API_KEY)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body was not JSON")
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed");
    let status = response.status();
    (status, json_body(response).await)
}

fn trigger_request(owner: &str, repo: &str) -> Request<Body> {
    authed(Request::builder().method("POST").uri("/checks"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"owner": owner, "repo": repo, "branchName": "main"}).to_string(),
        ))
        .unwrap()
}

async fn wait_for_terminal(router: &Router, check_run_id: &str) -> Value {
    for _ in 0..100 {
        let request = authed(
            Request::builder()
                .method("GET")
                .uri(format!("/checks/{}", check_run_id)),
        )
        .body(Body::empty())
        .unwrap();
        let (status, body) = send_json(router, request).await;
        assert_eq!(status, StatusCode::OK);
        let run_status = body["status"].as_str().unwrap();
        if run_status == "completed" || run_status == "failed" {
            return body;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("check run never reached a terminal state");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_api_key_rejected() {
    let (router, _store) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/stats")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_wrong_api_key_rejected() {
    let (router, _store) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/stats")
        .header("x-api-key", "wrong-key")
        .body(Body::empty())
        .unwrap();
    let (status, _body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let (router, _store) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/stats")
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, _body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_unauthenticated() {
    let (router, _store) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["activeChecks"], 0);
    assert!(body["uptimeMs"].as_i64().unwrap() >= 0);
}

// ============================================================================
// Trigger + poll
// ============================================================================

#[tokio::test]
async fn test_trigger_returns_pending_immediately() {
    let (router, _store) = test_app().await;

    let (status, body) = send_json(&router, trigger_request("acme", "mobile-app")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(!body["checkRunId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_trigger_rejects_empty_owner() {
    let (router, _store) = test_app().await;

    let (status, body) = send_json(&router, trigger_request("", "mobile-app")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_trigger_rejects_unknown_check_type() {
    let (router, _store) = test_app().await;

    let request = authed(Request::builder().method("POST").uri("/checks"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"owner": "acme", "repo": "app", "checkType": "FAX_MACHINE"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_poll_reaches_completed_with_summary() {
    let (router, _store) = test_app_with(vec![
        Issue {
            severity: Severity::High,
            description: "collects location without disclosure".to_string(),
            recommendation: Some("declare in data safety form".to_string()),
        },
        Issue {
            severity: Severity::Low,
            description: "privacy policy link missing from listing".to_string(),
            recommendation: None,
        },
    ])
    .await;

    let (_, triggered) = send_json(&router, trigger_request("acme", "mobile-app")).await;
    let id = triggered["checkRunId"].as_str().unwrap().to_string();

    let body = wait_for_terminal(&router, &id).await;

    assert_eq!(body["status"], "completed");
    assert!(body["completedAt"].is_string());
    assert_eq!(body["summary"]["totalIssues"], 2);
    assert_eq!(body["summary"]["highSeverity"], 1);
    assert!(body["errorMessage"].is_null());
}

#[tokio::test]
async fn test_poll_unknown_id_returns_not_found() {
    let (router, _store) = test_app().await;

    let request = authed(Request::builder().method("GET").uri("/checks/no-such-id"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "CHECK_NOT_FOUND");
}

// ============================================================================
// Completed feed
// ============================================================================

#[tokio::test]
async fn test_completed_feed_requires_since() {
    let (router, _store) = test_app().await;

    let request = authed(Request::builder().method("GET").uri("/checks/completed"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_completed_feed_rejects_bad_timestamp() {
    let (router, _store) = test_app().await;

    let request = authed(
        Request::builder()
            .method("GET")
            .uri("/checks/completed?since=yesterday"),
    )
    .body(Body::empty())
    .unwrap();
    let (status, _body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_completed_feed_lists_finished_runs() {
    let (router, _store) = test_app_with(vec![Issue {
        severity: Severity::Medium,
        description: "outdated privacy policy date".to_string(),
        recommendation: None,
    }])
    .await;

    let (_, triggered) = send_json(&router, trigger_request("acme", "mobile-app")).await;
    let id = triggered["checkRunId"].as_str().unwrap().to_string();
    wait_for_terminal(&router, &id).await;

    let request = authed(
        Request::builder()
            .method("GET")
            .uri("/checks/completed?since=2020-01-01T00:00:00Z"),
    )
    .body(Body::empty())
    .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["checkRunId"], id.as_str());
    assert_eq!(entries[0]["issueCount"], 1);
}

// ============================================================================
// Bulk delete
// ============================================================================

#[tokio::test]
async fn test_bulk_delete_rejects_empty_list() {
    let (router, _store) = test_app().await;

    let request = authed(
        Request::builder()
            .method("DELETE")
            .uri("/checks/bulk-delete"),
    )
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(json!({"checkRunIds": []}).to_string()))
    .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bulk_delete_rejects_non_string_ids() {
    let (router, _store) = test_app().await;

    let request = authed(
        Request::builder()
            .method("DELETE")
            .uri("/checks/bulk-delete"),
    )
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(json!({"checkRunIds": ["a", 7]}).to_string()))
    .unwrap();
    let (status, _body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_delete_skips_unknown_ids() {
    let (router, _store) = test_app().await;

    let (_, first) = send_json(&router, trigger_request("acme", "app-one")).await;
    let (_, second) = send_json(&router, trigger_request("acme", "app-two")).await;
    let first_id = first["checkRunId"].as_str().unwrap().to_string();
    let second_id = second["checkRunId"].as_str().unwrap().to_string();
    wait_for_terminal(&router, &first_id).await;
    wait_for_terminal(&router, &second_id).await;

    let request = authed(
        Request::builder()
            .method("DELETE")
            .uri("/checks/bulk-delete"),
    )
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(
        json!({"checkRunIds": [first_id, second_id, "no-such-id"]}).to_string(),
    ))
    .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedCount"], 2);

    let request = authed(
        Request::builder()
            .method("GET")
            .uri(format!("/checks/{}", first_id)),
    )
    .body(Body::empty())
    .unwrap();
    let (status, _body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn test_stats_cached_while_pending_refresh_after_completion() {
    let gate = Arc::new(tokio::sync::Notify::new());
    let (router, _store) = test_app_with_analyzer(Arc::new(GatedAnalyzer { gate: gate.clone() })).await;

    let (_, triggered) = send_json(&router, trigger_request("acme", "mobile-app")).await;
    let id = triggered["checkRunId"].as_str().unwrap().to_string();

    // Populate the cache while the run is not yet terminal.
    let request = authed(Request::builder().method("GET").uri("/stats"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 0);
    assert_eq!(body["total"], 1);

    gate.notify_one();
    wait_for_terminal(&router, &id).await;

    // The terminal transition happened in the background; the aggregate
    // must reflect it anyway.
    let request = authed(Request::builder().method("GET").uri("/stats"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"], 0);
    assert_eq!(body["inProgress"], 0);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_stats_counts_completed_runs() {
    let (router, _store) = test_app().await;

    let (_, triggered) = send_json(&router, trigger_request("acme", "mobile-app")).await;
    let id = triggered["checkRunId"].as_str().unwrap().to_string();
    wait_for_terminal(&router, &id).await;

    let request = authed(Request::builder().method("GET").uri("/stats"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["total"], 1);
}
