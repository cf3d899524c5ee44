//! History slot configuration.

use serde::Deserialize;

/// Which history variant backs a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackendType {
    Ram,
    Durable,
}

/// Backend type per history slot.
///
/// Defaults keep commands and events in memory and persist channels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoriesConfig {
    pub commands: HistoryBackendType,
    pub events: HistoryBackendType,
    pub channels: HistoryBackendType,
}

impl Default for HistoriesConfig {
    fn default() -> Self {
        Self {
            commands: HistoryBackendType::Ram,
            events: HistoryBackendType::Ram,
            channels: HistoryBackendType::Durable,
        }
    }
}
