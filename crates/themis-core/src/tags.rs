// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tag-keyed response cache with explicit invalidation.
//!
//! Read endpoints cache their serialized responses under a tag. Mutations
//! that change the underlying data invalidate the tags they affect, so the
//! next read recomputes. Invalidating a tag that holds no entry is a no-op.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

/// Tag for cached check listings.
pub const TAG_CHECKS: &str = "checks";
/// Tag for cached dashboard aggregates.
pub const TAG_DASHBOARD_STATS: &str = "dashboard-stats";
/// Tag for cached per-repository check history.
pub const TAG_CHECK_HISTORY: &str = "check-history";

/// In-process cache of responses keyed by tag.
#[derive(Default)]
pub struct TagCache {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl TagCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value under `tag`, if present.
    pub fn get(&self, tag: &str) -> Option<serde_json::Value> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(tag).cloned())
    }

    /// Store `value` under `tag`, replacing any previous entry.
    pub fn put(&self, tag: &str, value: serde_json::Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(tag.to_string(), value);
        }
    }

    /// Drop the entries for the given tags. Absent tags are skipped silently.
    pub fn invalidate(&self, tags: &[&str]) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        for tag in tags {
            if entries.remove(*tag).is_some() {
                debug!(tag = %tag, "Invalidated cache tag");
            }
        }
    }
}
