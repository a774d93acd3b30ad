// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP server wiring for themis-core.
//!
//! Builds the axum router, enforces API-key authentication on everything
//! except the health endpoint, and maps [`CoreError`] to JSON error bodies.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CoreError;
use crate::handlers::{
    AppState, handle_bulk_delete, handle_get_check, handle_health_check, handle_list_completed,
    handle_stats, handle_trigger_check,
};

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "errorCode": self.error_code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Authentication state shared by the API-key middleware.
#[derive(Clone)]
struct AuthState {
    api_keys: Arc<Vec<String>>,
}

/// Reject requests whose API key is missing or unknown.
///
/// Accepts the key in the `X-Api-Key` header or as a `Bearer` token.
async fn require_api_key(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, CoreError> {
    let headers = request.headers();

    let presented = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    match presented {
        Some(key) if auth.api_keys.iter().any(|k| k == key) => Ok(next.run(request).await),
        Some(_) => {
            warn!("Request with unknown API key rejected");
            Err(CoreError::AuthError {
                reason: "invalid API key".to_string(),
            })
        }
        None => Err(CoreError::AuthError {
            reason: "missing API key".to_string(),
        }),
    }
}

/// Build the API router over the given state.
pub fn build_router(state: Arc<AppState>, api_keys: Vec<String>) -> Router {
    let auth = AuthState {
        api_keys: Arc::new(api_keys),
    };

    let protected = Router::new()
        .route("/checks", post(handle_trigger_check))
        .route("/checks/completed", get(handle_list_completed))
        .route("/checks/bulk-delete", delete(handle_bulk_delete))
        .route("/checks/{check_run_id}", get(handle_get_check))
        .route("/stats", get(handle_stats))
        .layer(middleware::from_fn_with_state(auth, require_api_key));

    Router::new()
        .route("/health", get(handle_health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until shutdown.
pub async fn run(config: &Config, state: Arc<AppState>) -> Result<(), CoreError> {
    let router = build_router(state, config.api_keys.clone());

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .map_err(|e| CoreError::DatabaseError {
            operation: "bind".to_string(),
            details: format!("Failed to bind {}: {}", config.http_addr, e),
        })?;

    info!(addr = %config.http_addr, "themis-core listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CoreError::DatabaseError {
            operation: "serve".to_string(),
            details: format!("Server error: {}", e),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install shutdown handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
