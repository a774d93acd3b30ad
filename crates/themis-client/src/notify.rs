// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notification deduplication over the completed-runs feed.
//!
//! Polls the feed on a fixed tick and emits at most one notification per
//! check run, remembering notified ids in a persisted ledger. Entries expire
//! after [`NOTIFIED_TTL`]; expiry is a sweep performed once at load, not a
//! background timer, so behavior stays deterministic. Dismissing a
//! notification refreshes its entry's timestamp, extending suppression by a
//! full TTL window from the dismissal.
//!
//! The ledger assumes a single active writer; concurrent processes sharing
//! one ledger file can lose updates.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::client::ThemisClient;
use crate::error::{ClientError, Result};
use crate::types::{CheckType, CompletedCheckView};

/// How long a ledger entry suppresses re-notification.
pub const NOTIFIED_TTL: Duration = Duration::from_secs(60 * 60);
/// Trailing window of the completed feed each tick queries.
pub const FEED_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Time between feed queries.
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Persisted mapping from check-run id to last notification or dismissal time.
pub type Ledger = HashMap<String, DateTime<Utc>>;

/// Backing store for the ledger: whole-map load and store.
pub trait LedgerStore: Send + Sync {
    /// Load the full ledger. A store that was never written is empty.
    fn load(&self) -> Result<Ledger>;
    /// Replace the stored ledger.
    fn store(&self, ledger: &Ledger) -> Result<()>;
}

/// Ledger persisted as a JSON file.
pub struct JsonLedger {
    path: PathBuf,
}

impl JsonLedger {
    /// Create a ledger store at the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for JsonLedger {
    fn load(&self) -> Result<Ledger> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Ledger::new()),
            Err(e) => Err(ClientError::Serialization(format!(
                "failed to read ledger {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn store(&self, ledger: &Ledger) -> Result<()> {
        let raw = serde_json::to_string(ledger)?;
        std::fs::write(&self.path, raw).map_err(|e| {
            ClientError::Serialization(format!(
                "failed to write ledger {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// One user-facing notification about a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckNotification {
    /// Id of the completed run.
    pub check_run_id: String,
    /// Store name formatted from the run's check type.
    pub store_name: String,
    /// `owner/repo` of the analyzed repository.
    pub repository: String,
    /// Deep link to the run's results.
    pub link: String,
}

/// Sink for notifications: toast, desktop notification, chat message.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: &CheckNotification) -> Result<()>;
}

/// Drop entries older than [`NOTIFIED_TTL`]; returns how many were removed.
pub fn sweep_expired(ledger: &mut Ledger, now: DateTime<Utc>) -> usize {
    let ttl = chrono::Duration::from_std(NOTIFIED_TTL).unwrap_or(chrono::Duration::hours(1));
    let before = ledger.len();
    ledger.retain(|_, notified_at| now - *notified_at <= ttl);
    before - ledger.len()
}

/// Emits at most one notification per completed run within a TTL window.
pub struct NotificationDeduper<S: LedgerStore, N: Notifier> {
    client: ThemisClient,
    app_url: String,
    store: S,
    notifier: N,
    ledger: Ledger,
}

impl<S: LedgerStore, N: Notifier> NotificationDeduper<S, N> {
    /// Load the ledger, sweep expired entries and persist if anything fell out.
    pub fn load(
        client: ThemisClient,
        app_url: impl Into<String>,
        store: S,
        notifier: N,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut ledger = store.load()?;
        let removed = sweep_expired(&mut ledger, now);
        if removed > 0 {
            info!(removed, "Swept expired ledger entries");
            store.store(&ledger)?;
        }

        Ok(Self {
            client,
            app_url: app_url.into(),
            store,
            notifier,
            ledger,
        })
    }

    fn notification_for(&self, completed: &CompletedCheckView) -> CheckNotification {
        let store_name = CheckType::parse(&completed.check_type)
            .map(|t| t.display_name().to_string())
            .unwrap_or_else(|| completed.check_type.clone());

        CheckNotification {
            check_run_id: completed.check_run_id.clone(),
            store_name,
            repository: format!("{}/{}", completed.owner, completed.repo),
            link: format!(
                "{}/checks/{}",
                self.app_url.trim_end_matches('/'),
                completed.check_run_id
            ),
        }
    }

    /// One tick: query the feed window and notify unseen runs.
    ///
    /// Returns how many notifications were emitted. Each new id is recorded
    /// and persisted before its notification goes out, so a crash between
    /// the two suppresses rather than duplicates.
    #[instrument(skip(self))]
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let window = chrono::Duration::from_std(FEED_WINDOW).unwrap_or(chrono::Duration::minutes(5));
        let completed = self.client.list_completed_since(now - window).await?;

        let mut emitted = 0;
        for run in &completed {
            if self.ledger.contains_key(&run.check_run_id) {
                debug!(check_run_id = %run.check_run_id, "Already notified, suppressing");
                continue;
            }

            self.ledger.insert(run.check_run_id.clone(), now);
            self.store.store(&self.ledger)?;

            let notification = self.notification_for(run);
            if let Err(e) = self.notifier.notify(&notification).await {
                warn!(check_run_id = %run.check_run_id, "Notification delivery failed: {}", e);
                continue;
            }
            emitted += 1;
        }

        Ok(emitted)
    }

    /// Refresh the entry for a dismissed notification to the dismissal time.
    ///
    /// The entry is refreshed rather than removed, so suppression extends a
    /// full TTL window from the dismissal.
    pub fn dismiss(&mut self, check_run_id: &str, now: DateTime<Utc>) -> Result<()> {
        self.ledger.insert(check_run_id.to_string(), now);
        self.store.store(&self.ledger)
    }

    /// Run ticks forever on [`TICK_INTERVAL`]. Feed errors are logged and the
    /// loop continues.
    pub async fn run(&mut self) {
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        loop {
            tick.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                warn!("Completed-feed query failed: {}", e);
            }
        }
    }

    #[cfg(test)]
    fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
