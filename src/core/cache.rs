//! Key-value storage abstraction for rate snapshots

use async_trait::async_trait;
use std::time::Duration;

/// A typed key-value collection with optional per-entry expiry.
///
/// Storage errors are logged by implementations and surface as cache misses;
/// a snapshot that cannot be read or written only costs a tier of fallback.
#[async_trait]
pub trait KeyValueCollection<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V>;

    async fn put(&self, key: K, value: V, ttl: Option<Duration>);

    async fn remove(&self, key: &K);
}
