use crate::counter::{CounterResult, CounterStore, VisitCount};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{self, Instant};

#[derive(Debug, Clone, Copy)]
struct CounterRecord {
    count: i64,
    expires_at: Instant,
}

impl CounterRecord {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process counter store with the same expiry semantics as the Redis one.
///
/// Counts are local to the process, so this backend is only suitable for a
/// single replica (local development, tests).
pub struct MemoryCounterStore {
    counters: DashMap<String, CounterRecord>,
    ttl: Duration,
}

impl MemoryCounterStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            ttl,
        }
    }

    /// Periodically drop expired counters. The task stops once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = time::interval(every);
            loop {
                interval.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        let removed = store.sweep_expired();
                        if removed > 0 {
                            tracing::debug!(removed, "swept expired visit counters");
                        }
                    }
                    None => break,
                }
            }
        });
    }

    /// Remove expired counters, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, record| record.is_live(now));
        before.saturating_sub(self.counters.len())
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_and_refresh(&self, key: &str) -> CounterResult<i64> {
        let now = Instant::now();

        // The entry guard holds the shard lock, so increment and refresh are atomic here
        let mut record = self.counters.entry(key.to_string()).or_insert(CounterRecord {
            count: 0,
            expires_at: now,
        });

        if !record.is_live(now) {
            record.count = 0;
        }
        record.count += 1;
        record.expires_at = now + self.ttl;

        Ok(record.count)
    }

    async fn peek(&self, key: &str) -> CounterResult<Option<VisitCount>> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| VisitCount {
                count: record.count,
                ttl: Some(record.expires_at - now),
            }))
    }

    async fn reset(&self, key: &str) -> CounterResult<bool> {
        let now = Instant::now();
        Ok(self
            .counters
            .remove(key)
            .is_some_and(|(_, record)| record.is_live(now)))
    }
}
