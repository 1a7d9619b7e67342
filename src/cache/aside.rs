use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::keys::tag_index_key;
use super::store::CacheStore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

impl CacheOptions {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

/// Read-through cache over a [`CacheStore`]. Store failures are logged and
/// degrade to a miss; they never fail the caller.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Returns the cached value for `key`, or runs `fetcher` and writes its
    /// result back. Only the fetcher's own error is propagated.
    pub async fn get_cached_data<T, E, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        options: CacheOptions,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.read(key).await {
            tracing::debug!(key, "Cache hit");
            return Ok(Cached {
                value,
                status: CacheStatus::Hit,
            });
        }

        tracing::debug!(key, "Cache miss");
        let value = fetcher().await?;
        self.write(key, &value, &options).await;

        Ok(Cached {
            value,
            status: CacheStatus::Miss,
        })
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, "Cache read failed, falling back to source: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Null) => None,
            Ok(json) => match serde_json::from_value(json) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, "Cached value has an unexpected shape: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!(key, "Cached value is not valid JSON: {}", e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, options: &CacheOptions) {
        let ttl = options.ttl.unwrap_or(self.default_ttl);

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, "Failed to serialize value for cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, &json, ttl).await {
            tracing::warn!(key, "Cache write failed: {}", e);
            return;
        }

        for tag in &options.tags {
            if let Err(e) = self.store.track(&tag_index_key(tag), key, ttl).await {
                tracing::warn!(key, tag = %tag, "Failed to index cache key under tag: {}", e);
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        match self.store.del(key).await {
            Ok(()) => tracing::debug!(key, "Cache key invalidated"),
            Err(e) => tracing::warn!(key, "Cache invalidation failed: {}", e),
        }
    }

    /// Deletes every key written under `tag`, then the tag index itself.
    /// Returns how many keys were deleted.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let index = tag_index_key(tag);
        let keys = match self.store.tracked(&index).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(tag, "Failed to read cache tag index: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in &keys {
            match self.store.del(key).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(key = %key, tag, "Cache invalidation failed: {}", e),
            }
        }
        self.invalidate(&index).await;

        tracing::debug!(tag, removed, "Cache tag invalidated");
        removed
    }
}
