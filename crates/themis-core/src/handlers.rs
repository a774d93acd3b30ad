// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API handlers for themis-core.
//!
//! These handlers process requests from CI jobs and the dashboard for:
//! - Triggering compliance check runs
//! - Polling a run's status
//! - Listing recently completed runs
//! - Bulk-deleting runs
//! - Dashboard status counts
//! - Health check

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{CheckSummary, CheckType, NewCheckRun};
use crate::store::CheckStore;
use crate::tags::{TAG_CHECK_HISTORY, TAG_CHECKS, TAG_DASHBOARD_STATS, TagCache};
use crate::worker::CheckWorker;

/// Shared state for API handlers.
///
/// Contains the record store, the background worker, the response cache and
/// server metadata for health checks.
pub struct AppState {
    /// Persistent check-run store.
    pub store: Arc<dyn CheckStore>,
    /// Background worker that executes triggered runs.
    pub worker: Arc<CheckWorker>,
    /// Tag-keyed response cache, shared with the worker.
    pub tags: Arc<TagCache>,
    /// When the server started (for uptime calculation).
    pub start_time: std::time::Instant,
    /// Server version string.
    pub version: String,
}

impl AppState {
    /// Create handler state over the given store and worker.
    ///
    /// `tags` must be the same cache instance the worker was built with, so
    /// background terminal transitions invalidate what the handlers serve.
    pub fn new(
        store: Arc<dyn CheckStore>,
        worker: Arc<CheckWorker>,
        tags: Arc<TagCache>,
    ) -> Self {
        Self {
            store,
            worker,
            tags,
            start_time: std::time::Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Get the server uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }
}

// ============================================================================
// Trigger
// ============================================================================

/// Request body for triggering a check run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCheckRequest {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch to analyze.
    pub branch_name: Option<String>,
    /// Repository id at the provider.
    pub repository_id: Option<i64>,
    /// Which store policies to validate against.
    pub check_type: Option<String>,
}

/// Response body after triggering a check run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCheckResponse {
    /// Id for polling the run's status.
    pub check_run_id: String,
    /// Status at creation, always pending.
    pub status: String,
}

/// Handle a trigger request.
///
/// Creates a pending record, dispatches the run for background execution and
/// returns the id immediately; the analysis outcome is never part of this
/// response.
#[instrument(skip(state, request), fields(owner = %request.owner, repo = %request.repo))]
pub async fn handle_trigger_check(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TriggerCheckRequest>,
) -> Result<Json<TriggerCheckResponse>, CoreError> {
    if request.owner.trim().is_empty() {
        return Err(CoreError::ValidationError {
            field: "owner".to_string(),
            message: "owner must not be empty".to_string(),
        });
    }
    if request.repo.trim().is_empty() {
        return Err(CoreError::ValidationError {
            field: "repo".to_string(),
            message: "repo must not be empty".to_string(),
        });
    }

    let check_type = match request.check_type.as_deref() {
        None => CheckType::MobilePlatforms,
        Some(raw) => CheckType::parse(raw).ok_or_else(|| CoreError::ValidationError {
            field: "checkType".to_string(),
            message: format!("unknown check type: {}", raw),
        })?,
    };

    let new = NewCheckRun {
        check_run_id: Uuid::new_v4().to_string(),
        owner: request.owner,
        repo: request.repo,
        branch: request.branch_name,
        repository_id: request.repository_id,
        check_type,
    };

    state.store.create_check(&new).await?;
    state.worker.dispatch(new.check_run_id.clone());
    state
        .tags
        .invalidate(&[TAG_CHECKS, TAG_DASHBOARD_STATS, TAG_CHECK_HISTORY]);

    info!(check_run_id = %new.check_run_id, "Check run triggered");

    Ok(Json(TriggerCheckResponse {
        check_run_id: new.check_run_id,
        status: "pending".to_string(),
    }))
}

// ============================================================================
// Status
// ============================================================================

/// Response body for a single check run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRunResponse {
    /// Run id.
    pub check_run_id: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch analyzed, when one was requested.
    pub branch: Option<String>,
    /// Which store policies the run validates against.
    pub check_type: String,
    /// Lifecycle status.
    pub status: String,
    /// When the run was triggered.
    pub created_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Summary of the findings, present once completed.
    pub summary: Option<CheckSummary>,
    /// Why the run failed, present once failed.
    pub error_message: Option<String>,
}

/// Handle a status poll for one check run.
#[instrument(skip(state), fields(check_run_id = %check_run_id))]
pub async fn handle_get_check(
    State(state): State<Arc<AppState>>,
    Path(check_run_id): Path<String>,
) -> Result<Json<CheckRunResponse>, CoreError> {
    let record = state
        .store
        .get_check(&check_run_id)
        .await?
        .ok_or(CoreError::CheckNotFound { check_run_id })?;

    let summary = if record.status == "completed" {
        Some(CheckSummary::from_issues(&record.decode_issues()))
    } else {
        None
    };

    Ok(Json(CheckRunResponse {
        check_run_id: record.check_run_id,
        owner: record.owner,
        repo: record.repo,
        branch: record.branch,
        check_type: record.check_type,
        status: record.status,
        created_at: record.created_at,
        completed_at: record.completed_at,
        summary,
        error_message: record.error_message,
    }))
}

// ============================================================================
// Completed feed
// ============================================================================

/// Query parameters for the completed feed.
#[derive(Debug, Deserialize)]
pub struct CompletedQuery {
    /// Lower bound on completion time, RFC 3339.
    pub since: Option<String>,
}

/// One entry of the completed feed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCheckResponse {
    /// Run id.
    pub check_run_id: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch analyzed, when one was requested.
    pub branch: Option<String>,
    /// Which store policies the run validated against.
    pub check_type: String,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
    /// Number of issues the run found.
    pub issue_count: usize,
}

/// Handle the completed-runs feed.
///
/// Returns runs that completed at or after `since`, newest first. Failed
/// runs never appear here.
#[instrument(skip(state, query))]
pub async fn handle_list_completed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompletedQuery>,
) -> Result<Json<Vec<CompletedCheckResponse>>, CoreError> {
    let since = query.since.as_deref().ok_or(CoreError::ValidationError {
        field: "since".to_string(),
        message: "since query parameter is required".to_string(),
    })?;

    let since = DateTime::parse_from_rfc3339(since)
        .map_err(|e| CoreError::ValidationError {
            field: "since".to_string(),
            message: format!("since must be an RFC 3339 timestamp: {}", e),
        })?
        .with_timezone(&Utc);

    let records = state.store.list_completed_since(since).await?;
    debug!(count = records.len(), "Listing completed check runs");

    Ok(Json(
        records
            .into_iter()
            .map(|record| CompletedCheckResponse {
                check_run_id: record.check_run_id,
                owner: record.owner,
                repo: record.repo,
                branch: record.branch,
                check_type: record.check_type,
                completed_at: record.completed_at,
                issue_count: record.issue_count,
            })
            .collect(),
    ))
}

// ============================================================================
// Bulk delete
// ============================================================================

/// Response body after a bulk delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    /// Whether the delete ran.
    pub success: bool,
    /// How many records were actually removed.
    pub deleted_count: u64,
    /// Human-readable outcome.
    pub message: String,
}

/// Handle a bulk delete of check runs.
///
/// The body is validated by hand so malformed shapes yield a field-level
/// validation error instead of a generic deserialization failure. Ids with
/// no matching record are skipped; the count reflects actual removals.
#[instrument(skip(state, body))]
pub async fn handle_bulk_delete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<BulkDeleteResponse>, CoreError> {
    let ids = body
        .get("checkRunIds")
        .and_then(|v| v.as_array())
        .ok_or(CoreError::ValidationError {
            field: "checkRunIds".to_string(),
            message: "checkRunIds must be an array of strings".to_string(),
        })?;

    if ids.is_empty() {
        return Err(CoreError::ValidationError {
            field: "checkRunIds".to_string(),
            message: "checkRunIds must not be empty".to_string(),
        });
    }

    let mut check_run_ids = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.as_str().ok_or(CoreError::ValidationError {
            field: "checkRunIds".to_string(),
            message: "checkRunIds must contain only strings".to_string(),
        })?;
        check_run_ids.push(id.to_string());
    }

    let deleted_count = state.store.delete_checks_batch(&check_run_ids).await?;
    state
        .tags
        .invalidate(&[TAG_CHECKS, TAG_DASHBOARD_STATS, TAG_CHECK_HISTORY]);

    info!(
        requested = check_run_ids.len(),
        deleted = deleted_count,
        "Bulk delete completed"
    );

    Ok(Json(BulkDeleteResponse {
        success: true,
        deleted_count,
        message: format!("Deleted {} check runs", deleted_count),
    }))
}

// ============================================================================
// Stats
// ============================================================================

/// Handle the dashboard status-count aggregate.
///
/// The response is cached under the dashboard-stats tag; mutations
/// invalidate it.
#[instrument(skip(state))]
pub async fn handle_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, CoreError> {
    if let Some(cached) = state.tags.get(TAG_DASHBOARD_STATS) {
        debug!("Serving dashboard stats from cache");
        return Ok(Json(cached));
    }

    let counts = state.store.status_counts().await?;
    let stats = json!({
        "pending": counts.pending,
        "inProgress": counts.in_progress,
        "completed": counts.completed,
        "failed": counts.failed,
        "total": counts.pending + counts.in_progress + counts.completed + counts.failed,
    });

    state.tags.put(TAG_DASHBOARD_STATS, stats.clone());
    Ok(Json(stats))
}

// ============================================================================
// Health Check
// ============================================================================

/// Response body for the health check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Whether the database answered.
    pub healthy: bool,
    /// Server version string.
    pub version: String,
    /// Uptime in milliseconds.
    pub uptime_ms: i64,
    /// Count of pending plus in-progress runs.
    pub active_checks: i64,
}

/// Handle health check request.
///
/// Returns server health status including database connectivity, server
/// version, uptime in milliseconds and the count of active check runs.
#[instrument(skip(state))]
pub async fn handle_health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");

    let db_healthy = state.store.health_check_db().await.unwrap_or(false);

    let active_checks = if db_healthy {
        state.store.count_active_checks().await.unwrap_or(0)
    } else {
        0
    };

    Json(HealthResponse {
        healthy: db_healthy,
        version: state.version.clone(),
        uptime_ms: state.uptime_ms(),
        active_checks,
    })
}
