//! Process-level helpers.
//!
//! Tracing setup, backend connection retries, and consumer-side read retries.

pub mod bootstrap;
pub mod retry;
