// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Session installation cache with staleness gating.
//!
//! Sessions carry a snapshot of the user's GitHub App installation so request
//! handling does not hit the installations API on every call. The snapshot is
//! refreshed only when it is older than [`CACHE_MAX_AGE_SECS`]; a failed
//! refresh keeps serving the stale snapshot rather than erroring the request.
//!
//! The session-issuing layer (the GitHub OAuth surface, which lives outside
//! this crate) is the intended caller: it loads the session, passes it
//! through [`UserSession::with_refreshed_cache`], and stores the result.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{instrument, warn};

/// Snapshot age beyond which the installation data is considered stale.
pub const CACHE_MAX_AGE_SECS: i64 = 300;

/// Cached view of a GitHub App installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationCache {
    /// Installation id at the provider.
    pub installation_id: i64,
    /// Number of repositories the installation grants access to.
    pub total_repositories: i64,
    /// When this snapshot was taken.
    pub cached_at: DateTime<Utc>,
}

/// A user session holding the installation snapshot.
#[derive(Debug, Clone)]
pub struct UserSession {
    /// Login of the session's user.
    pub login: String,
    /// Installation snapshot, absent until the first successful lookup.
    pub installation: Option<InstallationCache>,
}

/// Source of fresh installation data.
#[async_trait]
pub trait InstallationLookup: Send + Sync {
    /// Fetch the current installation for `login`.
    async fn fetch_installation(&self, login: &str) -> Result<InstallationCache, LookupError>;
}

/// Failure to reach the installation source.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct LookupError(pub String);

/// Whether a snapshot taken at `cached_at` is still usable at `now`.
///
/// A missing snapshot is never valid. Exactly at the threshold the snapshot
/// is already stale.
pub fn is_cache_valid(cached_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match cached_at {
        Some(cached_at) => now - cached_at < Duration::seconds(CACHE_MAX_AGE_SECS),
        None => false,
    }
}

impl UserSession {
    /// Create a session with no installation data yet.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            installation: None,
        }
    }

    /// Return a session whose snapshot is fresh as of `now`.
    ///
    /// Refreshes through `lookup` only when the current snapshot is stale or
    /// absent. A lookup failure is logged and the existing snapshot (possibly
    /// none) is kept.
    #[instrument(skip(self, lookup), fields(login = %self.login))]
    pub async fn with_refreshed_cache(
        self,
        lookup: &dyn InstallationLookup,
        now: DateTime<Utc>,
    ) -> Self {
        if is_cache_valid(self.installation.as_ref().map(|c| c.cached_at), now) {
            return self;
        }

        match lookup.fetch_installation(&self.login).await {
            Ok(installation) => Self {
                installation: Some(installation),
                ..self
            },
            Err(e) => {
                warn!("Installation refresh failed, keeping cached data: {}", e);
                self
            }
        }
    }
}
