use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{RecordStore, StoreError};

/// Redis-backed record store. Sorted indices are ZSETs, membership sets are SETs.
///
/// The handle is opened once per invocation and passed to every component
/// that needs it; nothing in the crate holds a global connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`.
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379/1")
    pub async fn open(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        tracing::debug!(%pong, "connected to record store");

        Ok(Self { conn })
    }

    /// Release the connection. Dropping the handle has the same effect.
    pub async fn close(self) {
        drop(self.conn);
        tracing::debug!("record store closed");
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn range_all(&self, index: &str) -> Result<Vec<(f64, String)>, StoreError> {
        let mut conn = self.conn.clone();
        let entries: Vec<(String, f64)> = conn.zrange_withscores(index, 0, -1).await?;
        Ok(entries.into_iter().map(|(member, score)| (score, member)).collect())
    }

    async fn add_to_sorted_index(&self, index: &str, score: f64, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(index, member, score).await?;
        Ok(())
    }

    async fn remove_from_sorted_index(&self, index: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.zrem(index, member).await?;
        Ok(())
    }

    async fn add_to_set(&self, set: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(set, value).await?;
        Ok(added > 0)
    }

    async fn remove_from_set(&self, set: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(set, value).await?;
        Ok(())
    }

    async fn delete_index(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
