//! Mock PartitionStore implementation for testing.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::sample::{Sample, TypeName};
use crate::storage::{PartitionStore, Result, StorageError};

/// Mock partition store that keeps samples in memory.
///
/// Each partition is kept sorted by timestamp; samples sharing a timestamp
/// stay in insertion order.
#[derive(Default)]
pub struct MockPartitionStore {
    partitions: RwLock<HashMap<TypeName, Vec<Sample>>>,
    fail_on_append: RwLock<bool>,
    fail_on_query: RwLock<bool>,
}

impl MockPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    pub async fn set_fail_on_query(&self, fail: bool) {
        *self.fail_on_query.write().await = fail;
    }

    /// Total number of stored samples across all partitions.
    pub async fn stored_count(&self) -> usize {
        self.partitions.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl PartitionStore for MockPartitionStore {
    async fn ensure_partition(&self, type_name: &TypeName) -> Result<()> {
        self.partitions
            .write()
            .await
            .entry(type_name.clone())
            .or_default();
        Ok(())
    }

    async fn partition_exists(&self, type_name: &TypeName) -> Result<bool> {
        Ok(self.partitions.read().await.contains_key(type_name))
    }

    async fn append(&self, sample: Sample) -> Result<()> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::write_failure(
                sample.type_name(),
                "Mock append failure",
            ));
        }
        let mut partitions = self.partitions.write().await;
        let partition = partitions.entry(sample.type_name().clone()).or_default();
        let index = partition.partition_point(|s| s.timestamp() <= sample.timestamp());
        partition.insert(index, sample);
        Ok(())
    }

    async fn query(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        if *self.fail_on_query.read().await {
            return Err(StorageError::connectivity("Mock query failure"));
        }
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(type_name)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp() >= from && s.timestamp() < to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_partitions(&self) -> Result<BTreeSet<TypeName>> {
        if *self.fail_on_query.read().await {
            return Err(StorageError::connectivity("Mock query failure"));
        }
        Ok(self.partitions.read().await.keys().cloned().collect())
    }
}
