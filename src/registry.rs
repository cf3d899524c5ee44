//! History registry.
//!
//! [`Histories`] holds one history per [`HistorySlot`] and keeps the decoder
//! pipeline's consumer registrations in step with the slot contents. Each
//! slot's history is the only consumer the registry registers for that
//! stream.
//!
//! Lifecycle: unwired until [`Histories::setup_histories`] is called, then
//! swappable through [`Histories::set_slot`] until [`Histories::finalize`].

use std::sync::Arc;

use tracing::info;

use crate::config::{HistoriesConfig, HistoryBackendType};
use crate::history::{Dictionary, DurableHistory, History, RamHistory};
use crate::pipeline::{ConsumerRegistry, HistorySlot};
use crate::storage::PartitionStore;

/// Errors from registry wiring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Cannot set the {0} history before histories are set up")]
    NotWired(HistorySlot),

    #[error("Cannot change the {0} history after the pipeline is finalized")]
    Finalized(HistorySlot),

    #[error("Cannot set up histories after the pipeline is finalized")]
    AlreadyFinalized,
}

/// Storage variant used to build a slot's history.
#[derive(Clone)]
pub enum HistoryBackend {
    /// In-process buffer.
    Ram,
    /// Partition store with per-partition cursors.
    Durable {
        store: Arc<dyn PartitionStore>,
        dictionary: Arc<dyn Dictionary>,
    },
}

impl HistoryBackend {
    pub fn build(&self) -> Arc<dyn History> {
        match self {
            Self::Ram => Arc::new(RamHistory::new()),
            Self::Durable { store, dictionary } => {
                Arc::new(DurableHistory::new(store.clone(), dictionary.clone()))
            }
        }
    }
}

/// Backend selection for each slot.
#[derive(Clone)]
pub struct SlotBackends {
    pub commands: HistoryBackend,
    pub events: HistoryBackend,
    pub channels: HistoryBackend,
}

impl SlotBackends {
    /// Every slot buffered in memory.
    pub fn ram() -> Self {
        Self {
            commands: HistoryBackend::Ram,
            events: HistoryBackend::Ram,
            channels: HistoryBackend::Ram,
        }
    }

    /// Resolve configured backend types against an initialized store.
    pub fn from_config(
        config: &HistoriesConfig,
        store: Arc<dyn PartitionStore>,
        dictionary: Arc<dyn Dictionary>,
    ) -> Self {
        let resolve = |backend: HistoryBackendType| match backend {
            HistoryBackendType::Ram => HistoryBackend::Ram,
            HistoryBackendType::Durable => HistoryBackend::Durable {
                store: store.clone(),
                dictionary: dictionary.clone(),
            },
        };
        Self {
            commands: resolve(config.commands),
            events: resolve(config.events),
            channels: resolve(config.channels),
        }
    }

    pub fn get(&self, slot: HistorySlot) -> &HistoryBackend {
        match slot {
            HistorySlot::Commands => &self.commands,
            HistorySlot::Events => &self.events,
            HistorySlot::Channels => &self.channels,
        }
    }
}

/// The commands, events and channels histories of one pipeline.
#[derive(Default)]
pub struct Histories {
    coders: Option<Arc<dyn ConsumerRegistry>>,
    commands: Option<Arc<dyn History>>,
    events: Option<Arc<dyn History>>,
    channels: Option<Arc<dyn History>>,
    finalized: bool,
}

impl Histories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one history per slot and register each with `coders`.
    ///
    /// Calling this again re-wires every slot, deregistering the previous
    /// histories first.
    pub async fn setup_histories(
        &mut self,
        coders: Arc<dyn ConsumerRegistry>,
        backends: &SlotBackends,
    ) -> Result<(), ConfigurationError> {
        if self.finalized {
            return Err(ConfigurationError::AlreadyFinalized);
        }
        if let Some(previous) = self.coders.take() {
            for slot in HistorySlot::ALL {
                if let Some(history) = self.slot_mut(slot).take() {
                    previous.remove_consumer(slot, &history).await;
                }
            }
        }

        self.coders = Some(coders);
        for slot in HistorySlot::ALL {
            self.set_slot(slot, backends.get(slot).build()).await?;
        }
        info!("Histories set up");
        Ok(())
    }

    /// Replace the history in `slot`.
    ///
    /// The previous history is deregistered before the new one is registered.
    pub async fn set_slot(
        &mut self,
        slot: HistorySlot,
        history: Arc<dyn History>,
    ) -> Result<(), ConfigurationError> {
        if self.finalized {
            return Err(ConfigurationError::Finalized(slot));
        }
        let coders = self
            .coders
            .clone()
            .ok_or(ConfigurationError::NotWired(slot))?;

        if let Some(previous) = self.slot_mut(slot).take() {
            coders.remove_consumer(slot, &previous).await;
        }
        coders.register_consumer(slot, history.clone()).await;
        *self.slot_mut(slot) = Some(history);
        Ok(())
    }

    /// Mark the pipeline as wired. Slots can no longer be changed.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn get(&self, slot: HistorySlot) -> Option<&Arc<dyn History>> {
        match slot {
            HistorySlot::Commands => self.commands.as_ref(),
            HistorySlot::Events => self.events.as_ref(),
            HistorySlot::Channels => self.channels.as_ref(),
        }
    }

    pub fn commands(&self) -> Option<&Arc<dyn History>> {
        self.commands.as_ref()
    }

    pub fn events(&self) -> Option<&Arc<dyn History>> {
        self.events.as_ref()
    }

    pub fn channels(&self) -> Option<&Arc<dyn History>> {
        self.channels.as_ref()
    }

    fn slot_mut(&mut self, slot: HistorySlot) -> &mut Option<Arc<dyn History>> {
        match slot {
            HistorySlot::Commands => &mut self.commands,
            HistorySlot::Events => &mut self.events,
            HistorySlot::Channels => &mut self.channels,
        }
    }
}
