//! In-memory storage implementations.
//!
//! Used for testing and for `storage.type = memory` deployments where
//! samples do not need to outlive the process.

mod partition_store;

pub use partition_store::MockPartitionStore;
