// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire types exchanged with themis-core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which store policies a check run validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    /// Apple App Store guidelines.
    AppleAppStore,
    /// Google Play Store policies.
    GooglePlayStore,
    /// Chrome Web Store policies.
    ChromeWebStore,
    /// Apple and Google together.
    MobilePlatforms,
    /// Every supported store.
    Both,
}

impl CheckType {
    /// Parse the wire form, e.g. `MOBILE_PLATFORMS`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "APPLE_APP_STORE" => Some(Self::AppleAppStore),
            "GOOGLE_PLAY_STORE" => Some(Self::GooglePlayStore),
            "CHROME_WEB_STORE" => Some(Self::ChromeWebStore),
            "MOBILE_PLATFORMS" => Some(Self::MobilePlatforms),
            "BOTH" => Some(Self::Both),
            _ => None,
        }
    }

    /// Wire form of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppleAppStore => "APPLE_APP_STORE",
            Self::GooglePlayStore => "GOOGLE_PLAY_STORE",
            Self::ChromeWebStore => "CHROME_WEB_STORE",
            Self::MobilePlatforms => "MOBILE_PLATFORMS",
            Self::Both => "BOTH",
        }
    }

    /// Human-readable store name for CI output.
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
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Created, not yet picked up.
    Pending,
    /// Analysis is running.
    InProgress,
    /// Analysis finished; summary is available.
    Completed,
    /// Analysis errored; error message is available.
    Failed,
}

impl CheckStatus {
    /// Whether polling can stop at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Summary of a completed run's findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummaryView {
    /// Total number of issues.
    pub total_issues: usize,
    /// Issues with high severity.
    pub high_severity: usize,
    /// Issues with medium severity.
    pub medium_severity: usize,
    /// Issues with low severity.
    pub low_severity: usize,
}

impl CheckSummaryView {
    /// Whether the run should gate a pipeline.
    ///
    /// Only high-severity findings fail CI; medium and low are advisory.
    pub fn has_blocking_issues(&self) -> bool {
        self.high_severity > 0
    }
}

/// Request body for triggering a check run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCheckRequest {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch to analyze.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Repository id at the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<i64>,
    /// Which store policies to validate against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_type: Option<CheckType>,
}

/// Response body after triggering a check run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCheckResponse {
    /// Id for polling the run's status.
    pub check_run_id: String,
    /// Status at creation.
    pub status: CheckStatus,
}

/// One check run as returned by the status endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRunView {
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
    pub status: CheckStatus,
    /// When the run was triggered.
    pub created_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Summary of the findings, present once completed.
    pub summary: Option<CheckSummaryView>,
    /// Why the run failed, present once failed.
    pub error_message: Option<String>,
}

/// One entry of the completed feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCheckView {
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

/// Request body for a bulk delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    /// Ids of the runs to remove.
    pub check_run_ids: Vec<String>,
}

/// Response body after a bulk delete.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    /// Whether the delete ran.
    pub success: bool,
    /// How many records were actually removed.
    pub deleted_count: u64,
    /// Human-readable outcome.
    pub message: String,
}

/// Response body of the health endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthView {
    /// Whether the server's database answered.
    pub healthy: bool,
    /// Server version string.
    pub version: String,
    /// Uptime in milliseconds.
    pub uptime_ms: i64,
    /// Count of pending plus in-progress runs.
    pub active_checks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_type_wire_roundtrip() {
        for raw in [
            "APPLE_APP_STORE",
            "GOOGLE_PLAY_STORE",
            "CHROME_WEB_STORE",
            "MOBILE_PLATFORMS",
            "BOTH",
        ] {
            let parsed = CheckType::parse(raw).unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
        assert!(CheckType::parse("FAX_MACHINE").is_none());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!CheckStatus::Pending.is_terminal());
        assert!(!CheckStatus::InProgress.is_terminal());
        assert!(CheckStatus::Completed.is_terminal());
        assert!(CheckStatus::Failed.is_terminal());
    }

    #[test]
    fn test_summary_blocking_on_high_only() {
        let advisory = CheckSummaryView {
            total_issues: 3,
            high_severity: 0,
            medium_severity: 2,
            low_severity: 1,
        };
        assert!(!advisory.has_blocking_issues());

        let blocking = CheckSummaryView {
            total_issues: 1,
            high_severity: 1,
            medium_severity: 0,
            low_severity: 0,
        };
        assert!(blocking.has_blocking_issues());
    }

    #[test]
    fn test_check_run_view_deserializes_server_shape() {
        let body = serde_json::json!({
            "checkRunId": "run-1",
            "owner": "acme",
            "repo": "mobile-app",
            "branch": "main",
            "checkType": "MOBILE_PLATFORMS",
            "status": "completed",
            "createdAt": "2026-08-30T10:00:00Z",
            "completedAt": "2026-08-30T10:01:00Z",
            "summary": {
                "totalIssues": 1,
                "highSeverity": 0,
                "mediumSeverity": 1,
                "lowSeverity": 0
            },
            "errorMessage": null
        });

        let view: CheckRunView = serde_json::from_value(body).unwrap();
        assert_eq!(view.status, CheckStatus::Completed);
        assert_eq!(view.summary.unwrap().total_issues, 1);
    }
}
