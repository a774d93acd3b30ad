// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed record store implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::CoreError;
use crate::model::{CheckRunRecord, CompletedCheckRecord, NewCheckRun, StatusCounts};

use super::CheckStore;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/postgres");

/// PostgreSQL-backed record store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new Postgres store from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to a Postgres URL and run migrations.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to Postgres: {}", e),
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
impl CheckStore for PostgresStore {
    async fn create_check(&self, new: &NewCheckRun) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO check_runs
                (check_run_id, owner, repo, branch, repository_id, check_type, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
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
            WHERE check_run_id = $1
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
            WHERE check_run_id = $1 AND status = 'pending'
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
            SET status = 'completed', completed_at = $1, issues = $2
            WHERE check_run_id = $3 AND status = 'in_progress'
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
            SET status = 'failed', completed_at = $1, error_message = $2
            WHERE check_run_id = $3 AND status = 'in_progress'
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
            WHERE status = 'completed' AND completed_at >= $1
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

        let result = sqlx::query(
            r#"
            DELETE FROM check_runs WHERE check_run_id = ANY($1)
            "#,
        )
        .bind(check_run_ids)
        .execute(&self.pool)
        .await?;

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
