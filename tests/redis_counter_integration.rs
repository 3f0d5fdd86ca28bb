//! Integration tests for the Redis counter store
//!
//! These tests need a running Redis server and are skipped unless `REDIS_URL`
//! is set:
//! - `REDIS_URL=redis://127.0.0.1:6379/0 cargo test --test redis_counter_integration`

use ip_visit_counter::counter::{visit_key, CounterStore, RedisCounterStore, VISIT_TTL};
use redis::AsyncCommands;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn redis_url() -> Option<String> {
    match std::env::var("REDIS_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            println!("SKIPPED: REDIS_URL not set");
            None
        }
    }
}

/// Helper to create a Redis store with the given expiry
async fn create_redis_store(ttl: Duration) -> Option<RedisCounterStore> {
    let url = redis_url()?;
    Some(RedisCounterStore::connect(&url, ttl).await.unwrap())
}

/// Raw connection for inspecting keys behind the store's back
async fn raw_connection() -> redis::aio::MultiplexedConnection {
    let url = redis_url().unwrap();
    redis::Client::open(url.as_str())
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

/// Key for a client name that no other test run uses
fn unique_key(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    visit_key(&format!("{name}-{}-{nanos}", std::process::id()))
}

#[tokio::test]
async fn test_redis_counts_every_visit() {
    let Some(store) = create_redis_store(VISIT_TTL).await else {
        return;
    };
    let key = unique_key("counts");

    for expected in 1..=5 {
        assert_eq!(store.increment_and_refresh(&key).await.unwrap(), expected);
    }

    let snapshot = store.peek(&key).await.unwrap().unwrap();
    assert_eq!(snapshot.count, 5);

    store.reset(&key).await.unwrap();
}

#[tokio::test]
async fn test_redis_increment_sets_visit_ttl() {
    let Some(store) = create_redis_store(VISIT_TTL).await else {
        return;
    };
    let key = unique_key("ttl");

    store.increment_and_refresh(&key).await.unwrap();

    let mut conn = raw_connection().await;
    let ttl: i64 = conn.ttl(&key).await.unwrap();
    assert!((118..=120).contains(&ttl), "unexpected ttl {ttl}");

    store.reset(&key).await.unwrap();
}

#[tokio::test]
async fn test_redis_increment_restores_expiry() {
    let Some(store) = create_redis_store(VISIT_TTL).await else {
        return;
    };
    let key = unique_key("refresh");
    let mut conn = raw_connection().await;

    // Existing counter without an expiry, as left behind by an interrupted refresh
    let _: () = conn.set(&key, 41).await.unwrap();
    assert_eq!(conn.ttl::<_, i64>(&key).await.unwrap(), -1);

    assert_eq!(store.increment_and_refresh(&key).await.unwrap(), 42);

    let ttl: i64 = conn.ttl(&key).await.unwrap();
    assert!((118..=120).contains(&ttl), "unexpected ttl {ttl}");

    // A shortened expiry is pushed back out by the next visit
    let _: bool = conn.expire(&key, 5).await.unwrap();
    store.increment_and_refresh(&key).await.unwrap();
    let ttl: i64 = conn.ttl(&key).await.unwrap();
    assert!(ttl > 5, "expiry not refreshed, ttl {ttl}");

    store.reset(&key).await.unwrap();
}

#[tokio::test]
async fn test_redis_idle_counter_starts_over() {
    let Some(store) = create_redis_store(Duration::from_secs(1)).await else {
        return;
    };
    let key = unique_key("idle");

    store.increment_and_refresh(&key).await.unwrap();
    store.increment_and_refresh(&key).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(store.peek(&key).await.unwrap(), None);
    assert_eq!(store.increment_and_refresh(&key).await.unwrap(), 1);

    store.reset(&key).await.unwrap();
}

#[tokio::test]
async fn test_redis_keys_use_visit_prefix() {
    let Some(store) = create_redis_store(VISIT_TTL).await else {
        return;
    };
    let key = unique_key("prefix");
    assert!(key.starts_with("ip-visit-counter-"));

    store.increment_and_refresh(&key).await.unwrap();

    let mut conn = raw_connection().await;
    let raw: Option<i64> = conn.get(&key).await.unwrap();
    assert_eq!(raw, Some(1));

    // Case-sensitive keys
    let upper = key.to_uppercase();
    assert_eq!(store.peek(&upper).await.unwrap(), None);

    store.reset(&key).await.unwrap();
}

#[tokio::test]
async fn test_redis_reset() {
    let Some(store) = create_redis_store(VISIT_TTL).await else {
        return;
    };
    let key = unique_key("reset");

    assert!(!store.reset(&key).await.unwrap());

    store.increment_and_refresh(&key).await.unwrap();
    assert!(store.reset(&key).await.unwrap());
    assert_eq!(store.peek(&key).await.unwrap(), None);
}
