// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Data model for check runs.
//!
//! A check run is one invocation of the compliance analysis against a
//! specific repository/branch/check-type. Records are owned by the store;
//! only the trigger path creates them and only the worker transitions them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which store policies a check run validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    /// Apple App Store review guidelines.
    AppleAppStore,
    /// Google Play Store policies.
    GooglePlayStore,
    /// Chrome Web Store policies.
    ChromeWebStore,
    /// Both mobile stores (App Store + Play Store).
    MobilePlatforms,
    /// Every supported store.
    Both,
}

impl CheckType {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppleAppStore => "APPLE_APP_STORE",
            Self::GooglePlayStore => "GOOGLE_PLAY_STORE",
            Self::ChromeWebStore => "CHROME_WEB_STORE",
            Self::MobilePlatforms => "MOBILE_PLATFORMS",
            Self::Both => "BOTH",
        }
    }

    /// Parse the database/wire representation.
    ///
    /// Unknown strings are rejected rather than mapped to a default; adding
    /// a new check type is a compile-checked change in both directions.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APPLE_APP_STORE" => Some(Self::AppleAppStore),
            "GOOGLE_PLAY_STORE" => Some(Self::GooglePlayStore),
            "CHROME_WEB_STORE" => Some(Self::ChromeWebStore),
            "MOBILE_PLATFORMS" => Some(Self::MobilePlatforms),
            "BOTH" => Some(Self::Both),
            _ => None,
        }
    }

    /// Human-readable store name for notifications and CLI output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AppleAppStore => "Apple App Store",
            Self::GooglePlayStore => "Google Play Store",
            Self::ChromeWebStore => "Chrome Web Store",
            Self::MobilePlatforms => "App Store & Google Play",
            Self::Both => "All Stores",
        }
    }
}

/// Lifecycle status of a check run.
///
/// Transitions are monotonic: pending → in_progress → completed | failed.
/// Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Created, not yet claimed by a worker.
    Pending,
    /// Claimed by exactly one worker; analysis running.
    InProgress,
    /// Analysis finished; issues populated.
    Completed,
    /// Analysis failed; error message populated.
    Failed,
}

impl CheckStatus {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether no further transitions can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Severity of a single compliance issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the build in CI.
    High,
    /// Should be fixed before release.
    Medium,
    /// Informational.
    Low,
}

/// One compliance issue produced by the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// How serious the finding is.
    pub severity: Severity,
    /// What the analysis found.
    pub description: String,
    /// Suggested fix, when the analysis produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Issue counts by severity for a completed check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    /// Total number of issues.
    pub total_issues: usize,
    /// Count of high-severity issues. Any value > 0 blocks a CI build.
    pub high_severity: usize,
    /// Count of medium-severity issues.
    pub medium_severity: usize,
    /// Count of low-severity issues.
    pub low_severity: usize,
}

impl CheckSummary {
    /// Compute the summary from an issue sequence.
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut summary = Self {
            total_issues: issues.len(),
            high_severity: 0,
            medium_severity: 0,
            low_severity: 0,
        };
        for issue in issues {
            match issue.severity {
                Severity::High => summary.high_severity += 1,
                Severity::Medium => summary.medium_severity += 1,
                Severity::Low => summary.low_severity += 1,
            }
        }
        summary
    }
}

/// Check run record from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckRunRecord {
    /// Unique identifier for the check run.
    pub check_run_id: String,
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch under analysis, if one was requested.
    pub branch: Option<String>,
    /// External repository identifier, if known at trigger time.
    pub repository_id: Option<i64>,
    /// Which stores the run validates against (wire string).
    pub check_type: String,
    /// Current status (pending, in_progress, completed, failed).
    pub status: String,
    /// When the run was created. Immutable.
    pub created_at: DateTime<Utc>,
    /// When the run reached a terminal state. Set exactly once.
    pub completed_at: Option<DateTime<Utc>>,
    /// Issues as a JSON array. Populated iff status is completed.
    pub issues: Option<String>,
    /// Error message. Populated iff status is failed.
    pub error_message: Option<String>,
}

impl CheckRunRecord {
    /// Decode the issues column.
    ///
    /// An absent or malformed column decodes to an empty sequence; the
    /// completed feed and summaries must never fail on a bad payload.
    pub fn decode_issues(&self) -> Vec<Issue> {
        self.issues
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// Completed-feed projection: a reduced field set plus the derived issue count.
#[derive(Debug, Clone)]
pub struct CompletedCheckRecord {
    /// Unique identifier for the check run.
    pub check_run_id: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch under analysis, if one was requested.
    pub branch: Option<String>,
    /// Which stores the run validated against (wire string).
    pub check_type: String,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
    /// Number of issues found; 0 when the issues payload is absent or malformed.
    pub issue_count: usize,
}

/// Fields needed to create a new pending check run.
#[derive(Debug, Clone)]
pub struct NewCheckRun {
    /// Caller-supplied unique identifier.
    pub check_run_id: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch to analyze.
    pub branch: Option<String>,
    /// External repository identifier, if known.
    pub repository_id: Option<i64>,
    /// Which stores to validate against.
    pub check_type: CheckType,
}

/// Per-status record counts for the dashboard aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// Records in pending.
    pub pending: i64,
    /// Records in in_progress.
    pub in_progress: i64,
    /// Records in completed.
    pub completed: i64,
    /// Records in failed.
    pub failed: i64,
}
