//! History façades.
//!
//! This module contains:
//! - `History` trait: the read/write contract used by producers and consumers
//! - `DurableHistory`: backed by a `PartitionStore` with per-partition cursors
//! - `RamHistory`: in-process buffer
//! - `Dictionary` trait: reconstruction of stored raw values

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::sample::{Sample, TypeName};
use crate::storage::Result;

mod dictionary;
mod durable;
mod ram;

pub use dictionary::{Dictionary, TemplateDictionary};
pub use durable::DurableHistory;
pub use ram::RamHistory;

/// Interface for sample histories.
///
/// Writers call `record`; a single logical consumer calls the `retrieve_*`
/// methods. The two sides may run concurrently.
///
/// Implementations:
/// - `DurableHistory`: external durable storage, `size()` is always 0
/// - `RamHistory`: in-memory buffer, `size()` is the buffered count
#[async_trait]
pub trait History: Send + Sync {
    /// Store one decoded sample.
    async fn record(&self, sample: Sample) -> Result<()>;

    /// Samples of one type with `from <= timestamp < to`, ascending.
    ///
    /// Does not move any read cursor.
    async fn retrieve_range(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>>;

    /// Samples not yet returned by a previous `retrieve_new` call.
    async fn retrieve_new(&self) -> Result<Vec<Sample>>;

    /// Number of samples held in process.
    async fn size(&self) -> usize;

    /// Drop buffered samples up to `start`, or all of them when `None`.
    async fn clear(&self, start: Option<usize>);
}
