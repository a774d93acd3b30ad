// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for check runs.
//!
//! This module defines the record-store abstraction and backend
//! implementations. The store is the sole owner of check-run records;
//! status transitions are applied as single guarded statements so readers
//! never observe a half-written transition.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::model::{CheckRunRecord, CompletedCheckRecord, NewCheckRun, StatusCounts};

/// Record store used by handlers and the worker.
#[async_trait]
pub trait CheckStore: Send + Sync {
    /// Insert a new check run in the pending state.
    async fn create_check(&self, new: &NewCheckRun) -> Result<(), CoreError>;

    /// Point lookup of a check run.
    async fn get_check(&self, check_run_id: &str) -> Result<Option<CheckRunRecord>, CoreError>;

    /// Atomically claim a pending check run for execution.
    ///
    /// This is a conditional compare-and-set on status (pending →
    /// in_progress). Returns true if this caller won the claim; false means
    /// another worker already owns the record (or it is terminal) and the
    /// caller must not execute it.
    async fn claim_check(&self, check_run_id: &str) -> Result<bool, CoreError>;

    /// Transition an in-progress check run to completed.
    ///
    /// Sets status, completed_at, and the issues payload in one statement.
    /// Returns true if the transition was applied; false if the record was
    /// not in_progress (already terminal, or never claimed).
    async fn complete_check(
        &self,
        check_run_id: &str,
        completed_at: DateTime<Utc>,
        issues_json: &str,
    ) -> Result<bool, CoreError>;

    /// Transition an in-progress check run to failed.
    ///
    /// Sets status, completed_at, and error_message in one statement.
    /// Returns true if the transition was applied.
    async fn fail_check(
        &self,
        check_run_id: &str,
        completed_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, CoreError>;

    /// Completed feed: runs with status completed and completed_at >= since,
    /// ordered by completed_at descending.
    async fn list_completed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<CompletedCheckRecord>, CoreError>;

    /// Delete check runs by id in one batch.
    ///
    /// Returns the number of records actually removed, which may be less
    /// than the number of ids when some did not exist.
    async fn delete_checks_batch(&self, check_run_ids: &[String]) -> Result<u64, CoreError>;

    /// Per-status record counts for the dashboard aggregate.
    async fn status_counts(&self) -> Result<StatusCounts, CoreError>;

    /// Count of non-terminal (pending or in_progress) check runs.
    async fn count_active_checks(&self) -> Result<i64, CoreError>;

    /// Verify database connectivity.
    async fn health_check_db(&self) -> Result<bool, CoreError>;
}
