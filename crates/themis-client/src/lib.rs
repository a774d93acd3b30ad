// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Themis Client SDK
//!
//! High-level client for the themis-core compliance-check service.
//!
//! This crate provides:
//! - An HTTP client for triggering runs, polling status, reading the
//!   completed feed and bulk-deleting runs
//! - A bounded poller for CI gates (5s interval, 60-attempt budget)
//! - A notification deduplicator over the completed feed with a persisted
//!   TTL ledger
//!
//! # Example
//!
//! ```no_run
//! use themis_client::{Poller, ThemisClient, TriggerCheckRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client from THEMIS_API_KEY / THEMIS_APP_URL
//! let client = ThemisClient::from_env()?;
//!
//! // Trigger a run
//! let triggered = client
//!     .trigger_check(&TriggerCheckRequest {
//!         owner: "acme".to_string(),
//!         repo: "mobile-app".to_string(),
//!         branch_name: Some("main".to_string()),
//!         repository_id: None,
//!         check_type: None,
//!     })
//!     .await?;
//!
//! // Poll it to completion
//! let outcome = Poller::new(client).poll(&triggered.check_run_id).await?;
//! println!("Outcome: {:?}", outcome);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod notify;
mod poll;
mod types;

pub use client::ThemisClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use poll::{MAX_ATTEMPTS, POLL_INTERVAL, PollOutcome, Poller};
pub use types::{
    BulkDeleteRequest, BulkDeleteResponse, CheckRunView, CheckStatus, CheckSummaryView, CheckType,
    CompletedCheckView, HealthView, TriggerCheckRequest, TriggerCheckResponse,
};
