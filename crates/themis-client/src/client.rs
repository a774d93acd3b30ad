// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP client for the themis-core API.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::types::{
    BulkDeleteRequest, BulkDeleteResponse, CheckRunView, CompletedCheckView, HealthView,
    TriggerCheckRequest, TriggerCheckResponse,
};

/// Client for the themis-core HTTP API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ThemisClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ThemisClient {
    /// Create a client from the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.app_url.trim_end_matches('/'), path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Trigger a check run; returns the id without waiting for analysis.
    #[instrument(skip(self, request), fields(owner = %request.owner, repo = %request.repo))]
    pub async fn trigger_check(
        &self,
        request: &TriggerCheckRequest,
    ) -> Result<TriggerCheckResponse> {
        let response = self
            .http
            .post(self.url("/checks"))
            .header("x-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let triggered: TriggerCheckResponse = Self::decode(response).await?;
        debug!(check_run_id = %triggered.check_run_id, "Check run triggered");
        Ok(triggered)
    }

    /// Fetch one check run's current state.
    #[instrument(skip(self))]
    pub async fn get_check(&self, check_run_id: &str) -> Result<CheckRunView> {
        let response = self
            .http
            .get(self.url(&format!("/checks/{}", check_run_id)))
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(check_run_id.to_string()));
        }

        Self::decode(response).await
    }

    /// List runs completed at or after `since`, newest first.
    #[instrument(skip(self))]
    pub async fn list_completed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<CompletedCheckView>> {
        let response = self
            .http
            .get(self.url("/checks/completed"))
            .query(&[("since", since.to_rfc3339())])
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Delete the given runs; unknown ids are skipped server-side.
    #[instrument(skip(self, check_run_ids), fields(count = check_run_ids.len()))]
    pub async fn bulk_delete(&self, check_run_ids: Vec<String>) -> Result<BulkDeleteResponse> {
        if check_run_ids.is_empty() {
            return Err(ClientError::InvalidInput(
                "checkRunIds must not be empty".to_string(),
            ));
        }

        let response = self
            .http
            .delete(self.url("/checks/bulk-delete"))
            .header("x-api-key", &self.config.api_key)
            .json(&BulkDeleteRequest { check_run_ids })
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Fetch server health. Does not require an API key.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthView> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::decode(response).await
    }
}
