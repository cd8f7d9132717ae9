//! Replay cache for JWT-assertion identifiers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::StorageResult;

/// Cache of previously seen JWT `jti` values.
///
/// An identifier present in the cache at lookup time is an automatic
/// rejection. Identifiers are recorded whether or not the surrounding
/// assertion turns out to be valid: a partially valid assertion must
/// not be replayable after the client fixes the rest of it.
#[async_trait]
pub trait JtiReplayCache: Send + Sync {
    /// Atomically records `jti` and reports whether it was fresh.
    ///
    /// Returns `true` exactly once per identifier: of two concurrent
    /// calls with the same value, at most one sees `true`.
    async fn check_and_insert(&self, jti: &str) -> StorageResult<bool>;

    /// Drops identifiers first seen before `cutoff` and returns how
    /// many were dropped.
    async fn evict_seen_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;
}

/// In-memory replay cache.
#[derive(Debug, Default)]
pub struct InMemoryJtiReplayCache {
    seen: DashMap<String, DateTime<Utc>>,
}

impl InMemoryJtiReplayCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JtiReplayCache for InMemoryJtiReplayCache {
    async fn check_and_insert(&self, jti: &str) -> StorageResult<bool> {
        // The entry API holds the shard lock across the check and the
        // insert, which makes this a true check-and-insert.
        match self.seen.entry(jti.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(Utc::now());
                Ok(true)
            }
        }
    }

    async fn evict_seen_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let before = self.seen.len();
        self.seen.retain(|_, seen_at| *seen_at >= cutoff);
        Ok((before - self.seen.len()) as u64)
    }
}
