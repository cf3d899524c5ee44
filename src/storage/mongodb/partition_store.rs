//! MongoDB PartitionStore implementation.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::ErrorKind;
use mongodb::{Client, Collection, Database, IndexModel};
use tokio::sync::RwLock;
use tracing::debug;

use crate::sample::{Sample, TypeName};
use crate::storage::{PartitionStore, Result, StorageError};

use super::{NAMESPACE_EXISTS, TIME_FIELD, VALUE_FIELD};

/// MongoDB implementation of PartitionStore.
///
/// BSON datetimes carry millisecond precision; sub-millisecond parts of a
/// sample timestamp are truncated on write.
pub struct MongoPartitionStore {
    database: Database,
    known: RwLock<HashSet<TypeName>>,
}

impl MongoPartitionStore {
    /// Create a new MongoDB partition store over `database_name`.
    ///
    /// The database should be dedicated to samples: every collection in it
    /// is reported as a partition. Existing collections are loaded as known
    /// partitions.
    pub async fn new(client: &Client, database_name: &str) -> Result<Self> {
        let database = client.database(database_name);
        let known: HashSet<TypeName> = database
            .list_collection_names()
            .await
            .map_err(StorageError::connectivity)?
            .into_iter()
            .map(TypeName::from)
            .collect();

        debug!(database = %database_name, partitions = known.len(), "Loaded existing partitions");

        Ok(Self {
            database,
            known: RwLock::new(known),
        })
    }

    /// Whether `type_name` is in the local partition cache.
    pub async fn is_known(&self, type_name: &TypeName) -> bool {
        self.known.read().await.contains(type_name)
    }

    /// Get the database reference.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, type_name: &TypeName) -> Collection<Document> {
        self.database.collection(type_name.as_str())
    }

    /// Create the collection and its time index.
    async fn create_partition(&self, type_name: &TypeName) -> Result<()> {
        match self.database.create_collection(type_name.as_str()).await {
            Ok(()) => {}
            Err(e) if is_namespace_exists(&e) => {
                debug!(partition = %type_name, "Partition created concurrently");
            }
            Err(e) => return Err(StorageError::write_failure(type_name, e)),
        }

        let index = IndexModel::builder().keys(doc! { TIME_FIELD: 1 }).build();
        self.collection(type_name)
            .create_index(index)
            .await
            .map_err(|e| StorageError::write_failure(type_name, e))?;

        Ok(())
    }
}

fn is_namespace_exists(error: &mongodb::error::Error) -> bool {
    matches!(*error.kind, ErrorKind::Command(ref command) if command.code == NAMESPACE_EXISTS)
}

fn to_document(sample: &Sample) -> Result<Document> {
    let value = mongodb::bson::to_bson(sample.value())
        .map_err(|e| StorageError::write_failure(sample.type_name(), e))?;
    Ok(doc! {
        TIME_FIELD: BsonDateTime::from_millis(sample.timestamp().timestamp_millis()),
        VALUE_FIELD: value,
    })
}

fn from_document(type_name: &TypeName, doc: &Document) -> Result<Sample> {
    let time = doc
        .get_datetime(TIME_FIELD)
        .map_err(|e| StorageError::corrupt(type_name.as_str(), e))?;
    let timestamp = DateTime::from_timestamp_millis(time.timestamp_millis()).ok_or_else(|| {
        StorageError::corrupt(type_name.as_str(), format!("timestamp out of range: {time}"))
    })?;
    let value = doc
        .get(VALUE_FIELD)
        .cloned()
        .map(Bson::into_relaxed_extjson)
        .ok_or_else(|| StorageError::corrupt(type_name.as_str(), "missing value field"))?;
    Ok(Sample::new(type_name.clone(), timestamp, value))
}

#[async_trait]
impl PartitionStore for MongoPartitionStore {
    async fn ensure_partition(&self, type_name: &TypeName) -> Result<()> {
        if self.known.read().await.contains(type_name) {
            return Ok(());
        }
        if !self.partition_exists(type_name).await? {
            self.create_partition(type_name).await?;
        }
        self.known.write().await.insert(type_name.clone());
        Ok(())
    }

    async fn partition_exists(&self, type_name: &TypeName) -> Result<bool> {
        let names = self
            .database
            .list_collection_names()
            .filter(doc! { "name": type_name.as_str() })
            .await
            .map_err(StorageError::connectivity)?;
        Ok(!names.is_empty())
    }

    async fn append(&self, sample: Sample) -> Result<()> {
        let document = to_document(&sample)?;
        self.ensure_partition(sample.type_name()).await?;
        self.collection(sample.type_name())
            .insert_one(document)
            .await
            .map_err(|e| StorageError::write_failure(sample.type_name(), e))?;
        Ok(())
    }

    async fn query(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let filter = doc! {
            TIME_FIELD: {
                "$gte": BsonDateTime::from_millis(from.timestamp_millis()),
                "$lt": BsonDateTime::from_millis(to.timestamp_millis()),
            }
        };

        // Querying a missing collection yields an empty cursor.
        let mut cursor = self
            .collection(type_name)
            .find(filter)
            .sort(doc! { TIME_FIELD: 1, "_id": 1 })
            .await
            .map_err(StorageError::connectivity)?;

        let mut samples = Vec::new();
        while cursor.advance().await.map_err(StorageError::connectivity)? {
            let doc = cursor
                .deserialize_current()
                .map_err(|e| StorageError::corrupt(type_name.as_str(), e))?;
            samples.push(from_document(type_name, &doc)?);
        }

        debug!(partition = %type_name, count = samples.len(), "MongoDB range query");

        Ok(samples)
    }

    async fn list_partitions(&self) -> Result<BTreeSet<TypeName>> {
        let names = self
            .database
            .list_collection_names()
            .await
            .map_err(StorageError::connectivity)?;
        Ok(names.into_iter().map(TypeName::from).collect())
    }
}
