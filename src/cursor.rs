//! Per-partition read cursors.
//!
//! Tracks, for each partition, the instant up to which the owning reader has
//! already retrieved data. A partition with no cursor has never been observed
//! by an incremental read and reads from the tracker's origin, so a fresh
//! tracker does not replay history older than its own construction.
//!
//! Cursors live for the process session only; a restart resets every
//! partition to "never read".

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::sample::TypeName;

/// Boundary bookkeeping for the incremental-read contract.
#[derive(Debug, Clone)]
pub struct CursorTracker {
    origin: DateTime<Utc>,
    boundaries: HashMap<TypeName, DateTime<Utc>>,
}

impl CursorTracker {
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            boundaries: HashMap::new(),
        }
    }

    /// Construction instant, the default boundary of unread partitions.
    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    /// Lower bound for the next incremental read of `type_name`.
    pub fn boundary_for(&self, type_name: &TypeName) -> DateTime<Utc> {
        self.cursor(type_name).unwrap_or(self.origin)
    }

    /// Recorded boundary, or `None` while the partition is still unread.
    pub fn cursor(&self, type_name: &TypeName) -> Option<DateTime<Utc>> {
        self.boundaries.get(type_name).copied()
    }

    /// Set the boundary for `type_name`.
    ///
    /// Monotonicity is the caller's contract. A regression is accepted and
    /// logged.
    pub fn advance(&mut self, type_name: &TypeName, new_boundary: DateTime<Utc>) {
        if let Some(previous) = self
            .boundaries
            .insert(type_name.clone(), new_boundary)
            .filter(|previous| *previous > new_boundary)
        {
            warn!(
                partition = %type_name,
                %previous,
                %new_boundary,
                "Cursor boundary moved backwards"
            );
        }
    }

    /// Number of partitions that have been observed at least once.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}
