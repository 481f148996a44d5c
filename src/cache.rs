//! Time-bounded cache of rendered pages, keyed by the literal URL string.
//!
//! Entries expire a fixed TTL after they were written. Expired entries are
//! invisible to readers immediately; they are physically removed on access
//! or by the background sweeper. There is no size bound and no eviction
//! other than expiry.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default lifetime of a cached page.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Bytes,
    /// `None` when `created + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

#[derive(Debug)]
pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl TtlCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached bytes for `key` if an unexpired entry exists.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        // The shard guard is released above; a concurrent refresh wins.
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Inserts or replaces `key`, valid for `ttl` from now.
    pub fn set(&self, key: impl Into<String>, value: Bytes, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// [`set`](Self::set) with the cache's default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: Bytes) {
        self.set(key, value, self.default_ttl);
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of stored entries, expired-but-unswept ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purges expired entries every `interval` until `shutdown` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep(interval) => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            debug!(removed, remaining = cache.len(), "swept expired cache entries");
                        }
                    }
                }
            }
        })
    }
}
