//! SQLite PartitionStore implementation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::sample::{Sample, TypeName};
use crate::storage::schema::{Partitions, Samples, CREATE_PARTITIONS_TABLE, CREATE_SAMPLES_TABLE};
use crate::storage::{PartitionStore, Result, StorageError};

/// SQLite implementation of PartitionStore.
///
/// All partitions share one `samples` table keyed by partition name; the
/// `partitions` table records which partitions exist.
pub struct SqlitePartitionStore {
    pool: SqlitePool,
}

impl SqlitePartitionStore {
    /// Create a new SQLite partition store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_PARTITIONS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(StorageError::connectivity)?;
        sqlx::raw_sql(CREATE_SAMPLES_TABLE)
            .execute(&self.pool)
            .await
            .map_err(StorageError::connectivity)?;
        Ok(())
    }

    /// Shared connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Register a partition name, tolerating an existing row.
    async fn insert_partition(
        conn: &mut SqliteConnection,
        type_name: &TypeName,
    ) -> std::result::Result<(), sqlx::Error> {
        let (sql, values) = Query::insert()
            .into_table(Partitions::Table)
            .columns([Partitions::Name, Partitions::CreatedAt])
            .values_panic([
                type_name.as_str().into(),
                Utc::now().timestamp_micros().into(),
            ])
            .on_conflict(OnConflict::column(Partitions::Name).do_nothing().to_owned())
            .build_sqlx(SqliteQueryBuilder);

        sqlx::query_with(&sql, values).execute(&mut *conn).await?;
        Ok(())
    }

    /// Insert one sample within an already-started transaction.
    async fn insert_sample(
        conn: &mut SqliteConnection,
        sample: &Sample,
        value: String,
    ) -> std::result::Result<(), sqlx::Error> {
        Self::insert_partition(conn, sample.type_name()).await?;

        let (sql, values) = Query::insert()
            .into_table(Samples::Table)
            .columns([Samples::Partition, Samples::Timestamp, Samples::Value])
            .values_panic([
                sample.type_name().as_str().into(),
                sample.timestamp().timestamp_micros().into(),
                value.into(),
            ])
            .build_sqlx(SqliteQueryBuilder);

        sqlx::query_with(&sql, values).execute(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl PartitionStore for SqlitePartitionStore {
    async fn ensure_partition(&self, type_name: &TypeName) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::write_failure(type_name, e))?;
        Self::insert_partition(&mut conn, type_name)
            .await
            .map_err(|e| StorageError::write_failure(type_name, e))
    }

    async fn partition_exists(&self, type_name: &TypeName) -> Result<bool> {
        let (sql, values) = Query::select()
            .column(Partitions::Name)
            .from(Partitions::Table)
            .and_where(Expr::col(Partitions::Name).eq(type_name.as_str()))
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::connectivity)?;

        Ok(row.is_some())
    }

    async fn append(&self, sample: Sample) -> Result<()> {
        let type_name = sample.type_name();
        let value = serde_json::to_string(sample.value())
            .map_err(|e| StorageError::write_failure(type_name, e))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::write_failure(type_name, e))?;

        Self::insert_sample(&mut tx, &sample, value)
            .await
            .map_err(|e| StorageError::write_failure(type_name, e))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::write_failure(type_name, e))?;

        Ok(())
    }

    async fn query(
        &self,
        type_name: &TypeName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let (sql, values) = Query::select()
            .columns([Samples::Timestamp, Samples::Value])
            .from(Samples::Table)
            .and_where(Expr::col(Samples::Partition).eq(type_name.as_str()))
            .and_where(Expr::col(Samples::Timestamp).gte(from.timestamp_micros()))
            .and_where(Expr::col(Samples::Timestamp).lt(to.timestamp_micros()))
            .order_by(Samples::Timestamp, Order::Asc)
            .order_by(Samples::Id, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::connectivity)?;

        debug!(partition = %type_name, rows = rows.len(), "SQLite range query");

        let mut samples = Vec::with_capacity(rows.len());
        for row in rows {
            let micros: i64 = row
                .try_get("timestamp")
                .map_err(|e| StorageError::corrupt(type_name.as_str(), e))?;
            let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                StorageError::corrupt(type_name.as_str(), format!("timestamp out of range: {micros}"))
            })?;
            let text: String = row
                .try_get("value")
                .map_err(|e| StorageError::corrupt(type_name.as_str(), e))?;
            let value = serde_json::from_str(&text)
                .map_err(|e| StorageError::corrupt(type_name.as_str(), e))?;
            samples.push(Sample::new(type_name.clone(), timestamp, value));
        }

        Ok(samples)
    }

    async fn list_partitions(&self) -> Result<BTreeSet<TypeName>> {
        let (sql, values) = Query::select()
            .column(Partitions::Name)
            .from(Partitions::Table)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::connectivity)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map(TypeName::from)
                    .map_err(|e| StorageError::corrupt("partitions", e))
            })
            .collect()
    }
}
