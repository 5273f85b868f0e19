//! Time-bounded storage for fetched price series.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::shared::types::{PriceSeries, Window};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// `{symbol}_{window}`, window `0` for latest-only requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(symbol: &str, window: Window) -> Self {
        Self(format!("{}_{}", symbol, window))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage seam for fetched series. An entry is never returned once its
/// TTL has elapsed.
#[async_trait]
pub trait SeriesCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<PriceSeries>;

    async fn put(&self, key: CacheKey, series: PriceSeries, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: PriceSeries,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local cache. Expired entries are dropped lazily on read, or in
/// bulk by [`InMemorySeriesCache::purge_expired`].
#[derive(Default)]
pub struct InMemorySeriesCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemorySeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove every expired entry, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live_at(now));
        before - entries.len()
    }

    /// Periodically purge expired entries until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = self.purge_expired().await;
                if purged > 0 {
                    debug!("Purged {} expired cache entries", purged);
                }
            }
        })
    }
}

#[async_trait]
impl SeriesCache for InMemorySeriesCache {
    async fn get(&self, key: &CacheKey) -> Option<PriceSeries> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live_at(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live_at(Instant::now())) {
            entries.remove(key);
        }
        None
    }

    async fn put(&self, key: CacheKey, series: PriceSeries, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value: series,
            expires_at: now.checked_add(ttl).unwrap_or(now + DEFAULT_CACHE_TTL),
        };
        self.entries.write().await.insert(key, entry);
    }
}
