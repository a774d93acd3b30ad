// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed record store implementation.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::error::CoreError;
use crate::model::{CheckRunRecord, CompletedCheckRecord, NewCheckRun, StatusCounts};

use super::CheckStore;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from an existing pool.
    ///
    /// The caller is responsible for running migrations; prefer
    /// [`SqliteStore::from_path`] unless the pool is shared.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a new SQLite store from a file path.
    ///
    /// This convenience constructor handles all setup:
    /// - Creates parent directories if they don't exist
    /// - Creates the database file if it doesn't exist
    /// - Connects with sensible defaults and runs all migrations
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::DatabaseError {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let path_str = path.to_string_lossy();
        let url = format!("sqlite:{}?mode=rwc", path_str);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }

    /// Connect to a SQLite URL and run migrations.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {}: {}", url, e),
            })?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }
}

/// Row shape for the completed feed before the issue count is derived.
#[derive(sqlx::FromRow)]
struct CompletedRow {
    check_run_id: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    check_type: String,
    completed_at: DateTime<Utc>,
    issues: Option<String>,
}

impl CompletedRow {
    fn into_record(self) -> CompletedCheckRecord {
        // Absent or malformed issue payloads count as zero issues.
        let issue_count = self
            .issues
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<serde_json::Value>>(raw).ok())
            .map(|v| v.len())
            .unwrap_or(0);

        CompletedCheckRecord {
            check_run_id: self.check_run_id,
            owner: self.owner,
            repo: self.repo,
            branch: self.branch,
            check_type: self.check_type,
            completed_at: self.completed_at,
            issue_count,
        }
    }
}

#[async_trait::async_trait]
impl CheckStore for SqliteStore {
    async fn create_check(&self, new: &NewCheckRun) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO check_runs
                (check_run_id, owner, repo, branch, repository_id, check_type, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&new.check_run_id)
        .bind(&new.owner)
        .bind(&new.repo)
        .bind(&new.branch)
        .bind(new.repository_id)
        .bind(new.check_type.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_check(&self, check_run_id: &str) -> Result<Option<CheckRunRecord>, CoreError> {
        let record = sqlx::query_as::<_, CheckRunRecord>(
            r#"
            SELECT check_run_id, owner, repo, branch, repository_id, check_type,
                   status, created_at, completed_at, issues, error_message
            FROM check_runs
            WHERE check_run_id = ?
            "#,
        )
        .bind(check_run_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn claim_check(&self, check_run_id: &str) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE check_runs
            SET status = 'in_progress'
            WHERE check_run_id = ? AND status = 'pending'
            "#,
        )
        .bind(check_run_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete_check(
        &self,
        check_run_id: &str,
        completed_at: DateTime<Utc>,
        issues_json: &str,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE check_runs
            SET status = 'completed', completed_at = ?, issues = ?
            WHERE check_run_id = ? AND status = 'in_progress'
            "#,
        )
        .bind(completed_at)
        .bind(issues_json)
        .bind(check_run_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_check(
        &self,
        check_run_id: &str,
        completed_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE check_runs
            SET status = 'failed', completed_at = ?, error_message = ?
            WHERE check_run_id = ? AND status = 'in_progress'
            "#,
        )
        .bind(completed_at)
        .bind(error_message)
        .bind(check_run_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_completed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<CompletedCheckRecord>, CoreError> {
        let rows = sqlx::query_as::<_, CompletedRow>(
            r#"
            SELECT check_run_id, owner, repo, branch, check_type, completed_at, issues
            FROM check_runs
            WHERE status = 'completed' AND completed_at >= ?
            ORDER BY completed_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CompletedRow::into_record).collect())
    }

    async fn delete_checks_batch(&self, check_run_ids: &[String]) -> Result<u64, CoreError> {
        if check_run_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; check_run_ids.len()].join(", ");
        let sql = format!(
            "DELETE FROM check_runs WHERE check_run_id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in check_run_ids {
            query = query.bind(id);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn status_counts(&self) -> Result<StatusCounts, CoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM check_runs GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => counts.pending = count,
                "in_progress" => counts.in_progress = count,
                "completed" => counts.completed = count,
                "failed" => counts.failed = count,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn count_active_checks(&self) -> Result<i64, CoreError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM check_runs WHERE status IN ('pending', 'in_progress')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn health_check_db(&self) -> Result<bool, CoreError> {
        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}
