//! Decoder pipeline boundary.
//!
//! The decoder pipeline owns one sample stream per [`HistorySlot`] and hands
//! every decoded sample to the consumers registered for that stream.
//! [`ConsumerRegistry`] is the registration half of that contract;
//! [`SampleRouter`] is an in-process implementation that also delivers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::history::History;
use crate::sample::Sample;
use crate::storage::Result;

/// Named sample streams, one history slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySlot {
    Commands,
    Events,
    Channels,
}

impl HistorySlot {
    pub const ALL: [HistorySlot; 3] = [Self::Commands, Self::Events, Self::Channels];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Events => "events",
            Self::Channels => "channels",
        }
    }
}

impl fmt::Display for HistorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration of sample consumers with the decoder pipeline.
#[async_trait]
pub trait ConsumerRegistry: Send + Sync {
    async fn register_consumer(&self, slot: HistorySlot, consumer: Arc<dyn History>);

    /// Remove a previously registered consumer. Unknown consumers are ignored.
    async fn remove_consumer(&self, slot: HistorySlot, consumer: &Arc<dyn History>);
}

/// Identity comparison for trait objects, ignoring vtable pointers.
pub(crate) fn same_consumer(a: &Arc<dyn History>, b: &Arc<dyn History>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// In-process consumer registry that routes samples by slot.
#[derive(Default)]
pub struct SampleRouter {
    consumers: RwLock<HashMap<HistorySlot, Vec<Arc<dyn History>>>>,
}

impl SampleRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a decoded sample to every consumer of `slot`.
    ///
    /// Stops at the first failing consumer and returns its error.
    pub async fn publish(&self, slot: HistorySlot, sample: Sample) -> Result<()> {
        let consumers = self
            .consumers
            .read()
            .await
            .get(&slot)
            .cloned()
            .unwrap_or_default();

        if consumers.is_empty() {
            debug!(%slot, partition = %sample.type_name(), "No consumer registered, dropping sample");
            return Ok(());
        }

        for consumer in &consumers {
            consumer.record(sample.clone()).await?;
        }
        Ok(())
    }

    pub async fn consumer_count(&self, slot: HistorySlot) -> usize {
        self.consumers
            .read()
            .await
            .get(&slot)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ConsumerRegistry for SampleRouter {
    async fn register_consumer(&self, slot: HistorySlot, consumer: Arc<dyn History>) {
        let mut consumers = self.consumers.write().await;
        let registered = consumers.entry(slot).or_default();
        if !registered.is_empty() {
            warn!(%slot, count = registered.len(), "Slot already has a consumer");
        }
        registered.push(consumer);
    }

    async fn remove_consumer(&self, slot: HistorySlot, consumer: &Arc<dyn History>) {
        if let Some(registered) = self.consumers.write().await.get_mut(&slot) {
            registered.retain(|c| !same_consumer(c, consumer));
        }
    }
}
