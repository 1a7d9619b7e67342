use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, aio::ConnectionManager};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Key-value operations the cache helper consumes.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Adds `key` to the set stored at `index`, keeping the set alive for at
    /// least `ttl`.
    async fn track(&self, index: &str, key: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn tracked(&self, index: &str) -> Result<Vec<String>, CacheError>;
}

/// Redis-backed store sharing one auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(client: RedisClient) -> Result<Self, CacheError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn track(&self, index: &str, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let (remaining,): (i64,) = redis::pipe()
            .sadd(index, key)
            .ignore()
            .ttl(index)
            .query_async(&mut conn)
            .await?;

        // Only ever extend the index lifetime.
        let wanted = ttl.as_secs().max(1) as i64;
        if remaining < wanted {
            let _: () = conn.expire(index, wanted).await?;
        }
        Ok(())
    }

    async fn tracked(&self, index: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(index).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_reports_unreachable_server() {
        let client = RedisClient::open("redis://127.0.0.1:1/").unwrap();
        let result = tokio::time::timeout(Duration::from_secs(60), RedisStore::connect(client))
            .await
            .expect("connect gave up within the retry budget");
        assert!(matches!(result, Err(CacheError::Redis(_))));
    }
}
