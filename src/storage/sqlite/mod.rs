//! SQLite implementation of the partition store.

mod partition_store;

pub use partition_store::SqlitePartitionStore;
