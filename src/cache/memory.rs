use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::store::{CacheError, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct TagSet {
    keys: HashSet<String>,
    expires_at: Instant,
}

/// In-process store for local runs (`REDIS_URL=memory://`) and tests.
///
/// Expired entries are dropped when read and swept on every write, so the
/// maps only ever hold what is still live plus whatever expired since the
/// last write.
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, Entry>,
    sets: DashMap<String, TagSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values and tag sets currently held, expired or not.
    pub fn len(&self) -> usize {
        self.values.len() + self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, now: Instant) {
        self.values.retain(|_, entry| entry.expires_at > now);
        self.sets.retain(|_, set| set.expires_at > now);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.values.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.values.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        self.sweep(now);
        self.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.values.remove(key);
        self.sets.remove(key);
        Ok(())
    }

    async fn track(&self, index: &str, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        self.sweep(now);

        let mut set = self.sets.entry(index.to_string()).or_insert_with(|| TagSet {
            keys: HashSet::new(),
            expires_at: now,
        });
        set.keys.insert(key.to_string());
        set.expires_at = set.expires_at.max(now + ttl);
        Ok(())
    }

    async fn tracked(&self, index: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        Ok(match self.sets.get(index) {
            Some(set) if set.expires_at > now => set.keys.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }
}
