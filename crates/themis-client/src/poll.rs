// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bounded polling of a check run until it reaches a terminal state.
//!
//! The poller fetches the run's status on a fixed interval with a fixed
//! attempt budget. Transient fetch failures (network errors, 5xx) are logged
//! and consume an attempt but never abort the poll; an exhausted budget is a
//! [`ClientError::Timeout`], distinct from the run itself failing.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::client::ThemisClient;
use crate::error::{ClientError, Result};
use crate::types::{CheckRunView, CheckStatus, CheckSummaryView};

/// Time between status fetches.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// How many fetches before giving up (5 minutes at the default interval).
pub const MAX_ATTEMPTS: u32 = 60;

/// Terminal outcome of a poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Run completed with no build-blocking findings.
    Passed {
        /// Summary of the findings.
        summary: CheckSummaryView,
    },
    /// Run completed with at least one high-severity finding.
    IssuesFound {
        /// Summary of the findings.
        summary: CheckSummaryView,
    },
    /// The run itself failed.
    CheckFailed {
        /// Error message recorded on the run.
        message: String,
    },
}

/// Polls a check run to completion.
pub struct Poller {
    client: ThemisClient,
    interval: Duration,
    max_attempts: u32,
}

impl Poller {
    /// Create a poller with the default interval and attempt budget.
    pub fn new(client: ThemisClient) -> Self {
        Self {
            client,
            interval: POLL_INTERVAL,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Set the time between fetches.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Poll until the run is terminal or the attempt budget is spent.
    ///
    /// Fatal errors (unknown id, 4xx responses) abort immediately; anything
    /// transient consumes an attempt and the loop continues.
    #[instrument(skip(self), fields(check_run_id = %check_run_id))]
    pub async fn poll(&self, check_run_id: &str) -> Result<PollOutcome> {
        for attempt in 1..=self.max_attempts {
            match self.client.get_check(check_run_id).await {
                Ok(run) if run.status.is_terminal() => {
                    return Ok(Self::outcome_of(run));
                }
                Ok(run) => {
                    info!(
                        attempt,
                        status = ?run.status,
                        "Check run not terminal yet"
                    );
                }
                Err(ClientError::NotFound(id)) => {
                    return Err(ClientError::NotFound(id));
                }
                Err(ClientError::Api { status, message }) if status < 500 => {
                    return Err(ClientError::Api { status, message });
                }
                Err(e) => {
                    warn!(attempt, "Transient fetch error: {}", e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(ClientError::Timeout(self.max_attempts))
    }

    fn outcome_of(run: CheckRunView) -> PollOutcome {
        match run.status {
            CheckStatus::Failed => PollOutcome::CheckFailed {
                message: run
                    .error_message
                    .unwrap_or_else(|| "no error message recorded".to_string()),
            },
            _ => {
                let summary = run.summary.unwrap_or(CheckSummaryView {
                    total_issues: 0,
                    high_severity: 0,
                    medium_severity: 0,
                    low_severity: 0,
                });
                if summary.has_blocking_issues() {
                    PollOutcome::IssuesFound { summary }
                } else {
                    PollOutcome::Passed { summary }
                }
            }
        }
    }
}
