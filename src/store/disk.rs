use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<SystemTime>,
}

/// Collection persisted in a fjall partition; keys and values are stored as JSON.
pub struct DiskCollection<K, V> {
    keyspace: Keyspace,
    partition: PartitionHandle,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> DiskCollection<K, V> {
    pub fn open(path: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(name, PartitionCreateOptions::default())?;
        debug!("Opened disk collection {} at {}", name, path.display());
        Ok(Self {
            keyspace,
            partition,
            _marker: PhantomData,
        })
    }
}

impl<K, V> DiskCollection<K, V>
where
    K: Serialize + Debug,
    V: Serialize + DeserializeOwned,
{
    fn read(&self, key: &K) -> Result<Option<V>> {
        let key_bytes = serde_json::to_vec(key)?;
        let Some(raw) = self.partition.get(&key_bytes)? else {
            debug!("Cache MISS for key: {:?}", key);
            return Ok(None);
        };

        let entry: CacheEntry<V> = serde_json::from_slice(&raw)?;
        if entry.expires_at.is_some_and(|expiry| SystemTime::now() > expiry) {
            debug!("Cache entry expired for key: {:?}", key);
            self.partition.remove(key_bytes)?;
            return Ok(None);
        }
        debug!("Cache HIT for key: {:?}", key);
        Ok(Some(entry.value))
    }

    fn write(&self, key: &K, value: V, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|d| SystemTime::now() + d);
        let entry = CacheEntry { value, expires_at };
        self.partition
            .insert(serde_json::to_vec(key)?, serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        debug!("Cache PUT for key: {:?}", key);
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<()> {
        self.partition.remove(serde_json::to_vec(key)?)?;
        Ok(())
    }
}

#[async_trait]
impl<K, V> KeyValueCollection<K, V> for DiskCollection<K, V>
where
    K: Serialize + Debug + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        match self.read(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        if let Err(e) = self.write(&key, value, ttl) {
            debug!("DiskCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &K) {
        if let Err(e) = self.delete(key) {
            debug!("DiskCollection remove error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_disk_cache_get_put() {
        let dir = tempdir().unwrap();
        let cache = DiskCollection::<String, f64>::open(dir.path(), "rates").unwrap();

        assert!(cache.get(&"latest".to_string()).await.is_none());

        cache.put("latest".to_string(), 1340.5, None).await;
        assert_eq!(cache.get(&"latest".to_string()).await, Some(1340.5));
    }

    #[tokio::test]
    async fn test_disk_cache_ttl_expiration() {
        let dir = tempdir().unwrap();
        let cache = DiskCollection::<String, f64>::open(dir.path(), "rates").unwrap();

        cache
            .put("latest".to_string(), 1340.5, Some(Duration::from_millis(10)))
            .await;
        assert_eq!(cache.get(&"latest".to_string()).await, Some(1340.5));

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&"latest".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_remove() {
        let dir = tempdir().unwrap();
        let cache = DiskCollection::<String, f64>::open(dir.path(), "rates").unwrap();

        cache.put("latest".to_string(), 1340.5, None).await;
        cache.remove(&"latest".to_string()).await;
        assert!(cache.get(&"latest".to_string()).await.is_none());
    }
}
