pub mod disk;
pub mod memory;

use crate::core::cache::KeyValueCollection;
use crate::core::config::AppConfig;
use crate::core::rate::RateTable;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use disk::DiskCollection;
use memory::MemoryCollection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SNAPSHOT_COLLECTION: &str = "snapshots";
const LATEST_KEY: &str = "latest";

/// A live rate table kept as the last-known-good copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub table: RateTable,
    pub fetched_at: DateTime<Utc>,
}

/// Holds the most recent successfully fetched rate table.
#[derive(Clone)]
pub struct SnapshotStore {
    collection: Arc<dyn KeyValueCollection<String, RateSnapshot>>,
    ttl: Option<Duration>,
}

impl SnapshotStore {
    pub fn in_memory(ttl: Option<Duration>) -> Self {
        Self {
            collection: Arc::new(MemoryCollection::new()),
            ttl,
        }
    }

    pub fn persistent(path: &Path, ttl: Option<Duration>) -> Result<Self> {
        let collection = DiskCollection::open(path, SNAPSHOT_COLLECTION)
            .with_context(|| format!("Failed to open snapshot store at {}", path.display()))?;
        Ok(Self {
            collection: Arc::new(collection),
            ttl,
        })
    }

    /// Builds the store the config asks for, or `None` when snapshots are off.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        if !config.snapshot.enabled {
            debug!("Rate snapshots disabled");
            return Ok(None);
        }
        let ttl = config.snapshot.ttl();
        if config.snapshot.persist {
            let path = config.data_path()?.join("cache");
            return Self::persistent(&path, ttl).map(Some);
        }
        Ok(Some(Self::in_memory(ttl)))
    }

    pub async fn save(&self, table: &RateTable) {
        let snapshot = RateSnapshot {
            table: table.clone(),
            fetched_at: Utc::now(),
        };
        self.collection
            .put(LATEST_KEY.to_string(), snapshot, self.ttl)
            .await;
    }

    pub async fn latest(&self) -> Option<RateSnapshot> {
        self.collection.get(&LATEST_KEY.to_string()).await
    }

    pub async fn clear(&self) {
        self.collection.remove(&LATEST_KEY.to_string()).await;
    }
}
