//! Shared storage integration tests.
//!
//! Tests the PartitionStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod partition_store_tests;
