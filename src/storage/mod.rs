//! Partitioned sample storage.
//!
//! This module contains:
//! - `PartitionStore` trait: append-only, per-type sample partitions
//! - `StorageError`: the storage error taxonomy
//! - Implementations: in-memory mock, SQLite, MongoDB

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::sample::{Sample, TypeName};

pub mod mock;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use mock::MockPartitionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePartitionStore;

#[cfg(feature = "mongodb")]
pub use mongodb::MongoPartitionStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected a write (timeout, serialization, connectivity).
    #[error("Write to partition '{partition}' failed: {reason}")]
    WriteFailure { partition: String, reason: String },

    /// The backend could not be reached at call time.
    #[error("Storage backend unreachable: {0}")]
    Connectivity(String),

    /// A stored record could not be turned back into a sample.
    #[error("Corrupt record in partition '{partition}': {reason}")]
    CorruptRecord { partition: String, reason: String },

    /// The configured backend is unknown or not compiled in.
    #[error("Unsupported storage backend: {0}")]
    Unsupported(String),
}

impl StorageError {
    pub fn write_failure(partition: &TypeName, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailure {
            partition: partition.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn connectivity(reason: impl std::fmt::Display) -> Self {
        Self::Connectivity(reason.to_string())
    }

    pub fn corrupt(partition: &str, reason: impl std::fmt::Display) -> Self {
        Self::CorruptRecord {
            partition: partition.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether repeating the failed call may succeed.
    ///
    /// Corrupt records and configuration problems fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteFailure { .. } | Self::Connectivity(_))
    }
}

/// Interface for partitioned sample persistence.
///
/// Each distinct [`TypeName`] owns one partition. Partitions are created
/// lazily on first write and are never deleted implicitly. Range queries
/// filter and order by sample timestamp, not insertion order.
///
/// Implementations:
/// - `MockPartitionStore`: In-memory store with failure injection
/// - `SqlitePartitionStore`: SQLite storage
/// - `MongoPartitionStore`: MongoDB storage, one collection per partition
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Create the partition if absent.
    ///
    /// Losing a creation race to a concurrent caller is success.
    async fn ensure_partition(&self, type_name: &TypeName) -> Result<()>;

    /// Whether the partition exists.
    async fn partition_exists(&self, type_name: &TypeName) -> Result<bool>;

    /// Append one sample to the partition named by its type.
    ///
    /// Creates the partition if needed. The sample is visible to subsequent
    /// queries on the same store instance once this returns.
    async fn append(&self, sample: Sample) -> Result<()>;

    /// Samples with `from <= timestamp < to`, ascending by timestamp.
    ///
    /// An unknown partition yields an empty result.
    async fn query(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>>;

    /// Partitions known to the store at call time.
    async fn list_partitions(&self) -> Result<BTreeSet<TypeName>>;
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn PartitionStore>> {
    info!("Storage: {:?}", config.storage_type);

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MockPartitionStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let path = &config.sqlite.path;
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(StorageError::connectivity)?;
            }

            let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path))
                .await
                .map_err(StorageError::connectivity)?;

            let store = SqlitePartitionStore::new(pool);
            store.init().await?;
            info!(path = %path, "SQLite partition store ready");

            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Unsupported("sqlite feature not enabled".to_string()))
        }
        #[cfg(feature = "mongodb")]
        StorageType::Mongodb => {
            let uri = config.mongodb.uri.clone();
            let client = crate::utils::bootstrap::connect_with_retry(
                "mongodb",
                &uri,
                crate::utils::retry::connection_backoff(),
                || {
                    let uri = uri.clone();
                    async move {
                        let client = ::mongodb::Client::with_uri_str(&uri).await?;
                        client
                            .database("admin")
                            .run_command(::mongodb::bson::doc! { "ping": 1 })
                            .await?;
                        Ok::<_, ::mongodb::error::Error>(client)
                    }
                },
            )
            .await
            .map_err(StorageError::connectivity)?;

            let store = MongoPartitionStore::new(&client, &config.mongodb.database).await?;
            info!(database = %config.mongodb.database, "MongoDB partition store ready");

            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageType::Mongodb => {
            tracing::error!("MongoDB storage requested but 'mongodb' feature is not enabled");
            Err(StorageError::Unsupported("mongodb feature not enabled".to_string()))
        }
    }
}
