//! Telemetry history - per-type partitioned sample storage
//!
//! Stores decoded telemetry samples (channels, events, commands) in one
//! partition per sample type and serves them either as time-range queries or
//! as an incremental "what's new since the last read" feed.

pub mod clock;
pub mod config;
pub mod cursor;
pub mod history;
pub mod pipeline;
pub mod registry;
pub mod sample;
pub mod storage;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cursor::CursorTracker;
pub use history::{Dictionary, DurableHistory, History, RamHistory, TemplateDictionary};
pub use pipeline::{ConsumerRegistry, HistorySlot, SampleRouter};
pub use registry::{ConfigurationError, Histories, HistoryBackend, SlotBackends};
pub use sample::{Sample, TypeName};
pub use storage::{PartitionStore, StorageError};
