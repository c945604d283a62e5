use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Keyed byte store with per-entry TTL.
///
/// Backs both JSON payloads (generated tour content) and opaque blobs
/// (synthesized audio). Each get/set is independent; there is no cross-key
/// transactionality and every operation is safe to retry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
    async fn delete(&self, key: &str);
}

/// Deserialize a cached JSON value. A corrupt entry reads as a miss.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let bytes = cache.get(key).await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Discarding unreadable cache entry");
            cache.delete(key).await;
            None
        }
    }
}

/// Serialize and store a JSON value. Serialization failures are logged, not
/// propagated: the cache is an optimization, never a correctness dependency.
pub async fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    match serde_json::to_vec(value) {
        Ok(bytes) => cache.set(key, bytes, ttl).await,
        Err(e) => tracing::warn!(key = key, error = %e, "Failed to serialize cache entry"),
    }
}

#[derive(Clone)]
struct Entry {
    bytes: Vec<u8>,
    ttl: Duration,
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process cache backed by moka with per-entry expiration
pub struct MemoryCache {
    inner: MokaCache<String, Entry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.map(|entry| entry.bytes)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        self.inner
            .insert(key.to_string(), Entry { bytes: value, ttl })
            .await;
    }

    async fn delete(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}
