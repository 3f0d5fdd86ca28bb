use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("failed to increment counter")]
    Increment(#[source] anyhow::Error),
    #[error("failed to refresh counter expiry")]
    Refresh(#[source] anyhow::Error),
    #[error("counter key vanished before its expiry could be set")]
    RefreshMissingKey,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CounterResult<T> = Result<T, CounterError>;

/// Snapshot of a counter as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitCount {
    pub count: i64,
    /// Remaining time to live, `None` when the key has no expiry.
    pub ttl: Option<Duration>,
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the integer at `key` (creating it at 1), then reset its expiry.
    ///
    /// The expiry is only touched after the increment succeeded. Failing to
    /// set it is an error: a counter without a confirmed expiry would never
    /// reset.
    async fn increment_and_refresh(&self, key: &str) -> CounterResult<i64>;

    /// Read the counter without modifying it.
    async fn peek(&self, key: &str) -> CounterResult<Option<VisitCount>>;

    /// Delete the counter. Returns whether it existed.
    async fn reset(&self, key: &str) -> CounterResult<bool>;
}
