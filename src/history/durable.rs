//! History backed by a partition store.
//!
//! Incremental reads work per partition: each call captures one `now`
//! snapshot, queries every partition for `[boundary, now)`, and moves the
//! boundary of each partition that returned data to `now`. Partitions that
//! returned nothing keep their boundary and are queried from the same point
//! on the next call.
//!
//! # Late commits
//!
//! A sample with timestamp `t < now` that commits after its partition was
//! queried is not part of that call's result. If the partition's boundary
//! later moves past `t`, the sample is never returned by `retrieve_new`
//! (it remains reachable through `retrieve_range`). Producers are expected
//! to commit before advertising availability.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::cursor::CursorTracker;
use crate::sample::{Sample, TypeName};
use crate::storage::{PartitionStore, Result};

use super::{Dictionary, History};

/// Durable history with per-partition read cursors.
pub struct DurableHistory {
    store: Arc<dyn PartitionStore>,
    dictionary: Arc<dyn Dictionary>,
    clock: Arc<dyn Clock>,
    cursors: Mutex<CursorTracker>,
}

impl DurableHistory {
    pub fn new(store: Arc<dyn PartitionStore>, dictionary: Arc<dyn Dictionary>) -> Self {
        Self::with_clock(store, dictionary, Arc::new(SystemClock))
    }

    /// Cursor origin is the clock's current instant.
    pub fn with_clock(
        store: Arc<dyn PartitionStore>,
        dictionary: Arc<dyn Dictionary>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let origin = clock.now();
        Self {
            store,
            dictionary,
            clock,
            cursors: Mutex::new(CursorTracker::new(origin)),
        }
    }

    pub fn store(&self) -> &Arc<dyn PartitionStore> {
        &self.store
    }

    /// Current lower bound of the next incremental read of `type_name`.
    pub async fn boundary_for(&self, type_name: &TypeName) -> DateTime<Utc> {
        self.cursors.lock().await.boundary_for(type_name)
    }

    /// Recorded boundary, or `None` while the partition is still unread.
    pub async fn cursor(&self, type_name: &TypeName) -> Option<DateTime<Utc>> {
        self.cursors.lock().await.cursor(type_name)
    }

    fn reconstruct(&self, sample: Sample) -> Option<Sample> {
        let type_name = sample.type_name().clone();
        let timestamp = sample.timestamp();
        self.dictionary
            .reconstruct(&type_name, sample.into_value())
            .map(|value| Sample::new(type_name, timestamp, value))
    }
}

#[async_trait]
impl History for DurableHistory {
    async fn record(&self, sample: Sample) -> Result<()> {
        self.store.append(sample).await
    }

    async fn retrieve_range(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let samples = self.store.query(type_name, from, to).await?;
        if !self.dictionary.contains(type_name) {
            return Ok(samples);
        }
        Ok(samples
            .into_iter()
            .filter_map(|sample| self.reconstruct(sample))
            .collect())
    }

    async fn retrieve_new(&self) -> Result<Vec<Sample>> {
        let mut cursors = self.cursors.lock().await;
        let now = self.clock.now();

        let mut result = Vec::new();
        let mut observed = Vec::new();

        for type_name in self.store.list_partitions().await? {
            if !self.dictionary.contains(&type_name) {
                debug!(partition = %type_name, "No schema registered, skipping partition");
                continue;
            }

            let lower = cursors.boundary_for(&type_name);
            let samples = self.store.query(&type_name, lower, now).await?;
            debug!(
                partition = %type_name,
                %lower,
                %now,
                count = samples.len(),
                "Incremental read"
            );

            if samples.is_empty() {
                continue;
            }
            result.extend(samples.into_iter().filter_map(|s| self.reconstruct(s)));
            observed.push(type_name);
        }

        // Cursors move only once every partition has been read.
        for type_name in &observed {
            cursors.advance(type_name, now);
        }

        Ok(result)
    }

    /// Always 0: samples live in the backing store, not in process.
    async fn size(&self) -> usize {
        0
    }

    /// No-op: retention belongs to the backing store.
    async fn clear(&self, start: Option<usize>) {
        debug!(?start, "clear() has no effect on a durable history");
    }
}
