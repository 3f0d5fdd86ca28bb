use crate::counter::{CounterError, CounterResult, CounterStore, VisitCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed visit counter (INCR + EXPIRE).
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCounterStore {
    /// Connect to `address` and verify the connection with a PING.
    ///
    /// Accepts either a bare `host:port` or a full `redis://` / `rediss://` URL.
    pub async fn connect(address: &str, ttl: Duration) -> Result<Self> {
        let url = if address.contains("://") {
            address.to_string()
        } else {
            format!("redis://{address}/0")
        };

        let client = ::redis::Client::open(url.as_str())
            .with_context(|| format!("invalid redis address '{address}'"))?;
        let mut conn = ConnectionManager::new(client)
            .await
            .with_context(|| format!("failed to connect to redis at '{address}'"))?;

        let _: String = ::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis PING failed")?;

        Ok(Self { conn, ttl })
    }

    fn ttl_secs(&self) -> i64 {
        self.ttl.as_secs().max(1) as i64
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_refresh(&self, key: &str) -> CounterResult<i64> {
        // ConnectionManager clones share the same multiplexed connection
        let mut conn = self.conn.clone();

        let count: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| CounterError::Increment(e.into()))?;

        let refreshed: bool = conn
            .expire(key, self.ttl_secs())
            .await
            .map_err(|e| CounterError::Refresh(e.into()))?;

        if !refreshed {
            return Err(CounterError::RefreshMissingKey);
        }

        Ok(count)
    }

    async fn peek(&self, key: &str) -> CounterResult<Option<VisitCount>> {
        let mut conn = self.conn.clone();

        let (count, ttl): (Option<i64>, i64) = ::redis::pipe()
            .get(key)
            .ttl(key)
            .query_async(&mut conn)
            .await
            .context("failed to read counter")?;

        Ok(count.map(|count| VisitCount {
            count,
            // -1: no expiry, -2: missing (raced with expiry)
            ttl: u64::try_from(ttl).ok().map(Duration::from_secs),
        }))
    }

    async fn reset(&self, key: &str) -> CounterResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await.context("failed to delete counter")?;
        Ok(removed > 0)
    }
}
