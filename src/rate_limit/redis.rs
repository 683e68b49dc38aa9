use async_trait::async_trait;
use redis::Client;
use std::time::{SystemTime, UNIX_EPOCH};

use super::store::{CounterStore, StoreError, WindowState};

/// Redis-backed counter store for multi-instance deployments.
///
/// Counters live on window-indexed keys (`ratelimit:<key>:<window index>`),
/// so a single atomic INCR both creates and advances windows. Windows are
/// epoch-aligned here, unlike the in-process store which starts a window at
/// an identity's first request.
pub struct RedisCounterStore {
    client: Client,
}

impl RedisCounterStore {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("failed to create redis client: {e}")))?;
        Ok(Self { client })
    }

    // Round-trip a PING so a bad address fails at startup, not on the first check
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(format!("redis PING failed: {e}")))?;
        Ok(())
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("redis connection failed: {e}")))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str, window_secs: u64) -> Result<WindowState, StoreError> {
        let mut conn = self.connection().await?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let window_index = now / window_secs;
        let redis_key = format!("ratelimit:{key}:{window_index}");

        // Keys outlive their window by one extra window, then expire on their own
        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&redis_key, 1u32)
            .expire(&redis_key, (window_secs * 2) as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(format!("redis INCR failed: {e}")))?;

        Ok(WindowState {
            count,
            reset_after_secs: window_secs - (now % window_secs),
        })
    }
}
