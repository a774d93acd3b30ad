// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Check worker: claims triggered runs and drives them to a terminal state.
//!
//! Triggering and execution are decoupled. The trigger path inserts a
//! pending record and hands the id to [`CheckWorker::dispatch`], which runs
//! the analysis on its own tokio task so the triggering request never waits
//! on it. The claim is a conditional compare-and-set on status; with
//! multiple workers only one can win it, so a run is executed at most once.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::model::{CheckType, Issue};
use crate::store::CheckStore;
use crate::tags::{TAG_CHECK_HISTORY, TAG_CHECKS, TAG_DASHBOARD_STATS, TagCache};

/// Target of one analysis invocation.
#[derive(Debug, Clone)]
pub struct AnalysisTarget {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch to analyze, when one was requested.
    pub branch: Option<String>,
    /// Which store policies to validate against.
    pub check_type: CheckType,
}

/// The compliance analysis routine.
///
/// The production implementation calls out to an LLM and is provided by the
/// analysis crate; anything implementing this trait can back a worker.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run the analysis and return the issues found.
    ///
    /// An `Err` is captured into the run's failed state; it is never
    /// surfaced to the caller that triggered the run.
    async fn analyze(&self, target: &AnalysisTarget) -> Result<Vec<Issue>, AnalysisError>;
}

/// Failure of the analysis step itself.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct AnalysisError(pub String);

/// Executes compliance analysis for triggered check runs.
pub struct CheckWorker {
    store: Arc<dyn CheckStore>,
    analyzer: Arc<dyn Analyzer>,
    tags: Arc<TagCache>,
}

impl CheckWorker {
    /// Create a worker over the given store and analyzer.
    ///
    /// The tag cache must be the same instance the read handlers serve from;
    /// the worker invalidates it on every status transition it writes.
    pub fn new(
        store: Arc<dyn CheckStore>,
        analyzer: Arc<dyn Analyzer>,
        tags: Arc<TagCache>,
    ) -> Self {
        Self {
            store,
            analyzer,
            tags,
        }
    }

    fn invalidate_caches(&self) {
        self.tags
            .invalidate(&[TAG_CHECKS, TAG_DASHBOARD_STATS, TAG_CHECK_HISTORY]);
    }

    /// Dispatch a run for background execution and return immediately.
    pub fn dispatch(self: &Arc<Self>, check_run_id: String) {
        let worker = self.clone();
        tokio::spawn(async move {
            worker.run(&check_run_id).await;
        });
    }

    /// Execute one run to its terminal state.
    ///
    /// All failure paths end in the record's failed state or in a log line;
    /// nothing here propagates to the trigger caller.
    #[instrument(skip(self), fields(check_run_id = %check_run_id))]
    pub async fn run(&self, check_run_id: &str) {
        // Claim first: losing the CAS means another worker owns the run.
        match self.store.claim_check(check_run_id).await {
            Ok(true) => self.invalidate_caches(),
            Ok(false) => {
                warn!("Check run already claimed or terminal, skipping");
                return;
            }
            Err(e) => {
                error!("Failed to claim check run: {}", e);
                return;
            }
        }

        let record = match self.store.get_check(check_run_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                error!("Claimed check run disappeared");
                return;
            }
            Err(e) => {
                error!("Failed to load claimed check run: {}", e);
                return;
            }
        };

        let Some(check_type) = CheckType::parse(&record.check_type) else {
            self.finish_failed(check_run_id, "unknown check type on record")
                .await;
            return;
        };

        let target = AnalysisTarget {
            owner: record.owner,
            repo: record.repo,
            branch: record.branch,
            check_type,
        };

        info!(
            owner = %target.owner,
            repo = %target.repo,
            check_type = %target.check_type.as_str(),
            "Starting compliance analysis"
        );

        match self.analyzer.analyze(&target).await {
            Ok(issues) => {
                let issues_json = match serde_json::to_string(&issues) {
                    Ok(json) => json,
                    Err(e) => {
                        self.finish_failed(
                            check_run_id,
                            &format!("failed to serialize issues: {}", e),
                        )
                        .await;
                        return;
                    }
                };

                match self
                    .store
                    .complete_check(check_run_id, Utc::now(), &issues_json)
                    .await
                {
                    Ok(true) => {
                        self.invalidate_caches();
                        info!(issue_count = issues.len(), "Check run completed");
                    }
                    Ok(false) => {
                        warn!("Completion skipped: check run no longer in progress");
                    }
                    Err(e) => {
                        error!("Failed to write completed state: {}", e);
                    }
                }
            }
            Err(e) => {
                self.finish_failed(check_run_id, &e.0).await;
            }
        }
    }

    async fn finish_failed(&self, check_run_id: &str, message: &str) {
        warn!(error = %message, "Check run failed");
        match self.store.fail_check(check_run_id, Utc::now(), message).await {
            Ok(true) => self.invalidate_caches(),
            Ok(false) => warn!("Failure skipped: check run no longer in progress"),
            Err(e) => error!("Failed to write failed state: {}", e),
        }
    }
}
