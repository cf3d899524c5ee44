//! MongoDB implementation of the partition store.
//!
//! Each partition is its own collection, named after the partition's type
//! name. Documents carry the sample instant under [`TIME_FIELD`] and the raw
//! value under [`VALUE_FIELD`].

mod partition_store;

pub use partition_store::MongoPartitionStore;

/// Document field holding the sample timestamp.
pub(crate) const TIME_FIELD: &str = "time";
/// Document field holding the raw sample value.
pub(crate) const VALUE_FIELD: &str = "dict";

/// Server error code for "collection already exists".
pub(crate) const NAMESPACE_EXISTS: i32 = 48;
