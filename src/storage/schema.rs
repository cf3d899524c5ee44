//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Partition registry table schema.
#[derive(Iden)]
pub enum Partitions {
    Table,
    #[iden = "name"]
    Name,
    #[iden = "created_at"]
    CreatedAt,
}

/// Samples table schema.
#[derive(Iden)]
pub enum Samples {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "partition_name"]
    Partition,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "value"]
    Value,
}

/// SQL for creating the partitions table.
pub const CREATE_PARTITIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS partitions (
    name TEXT PRIMARY KEY NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

/// SQL for creating the samples table.
///
/// `timestamp` holds microseconds since the Unix epoch; `value` holds JSON text.
pub const CREATE_SAMPLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    partition_name TEXT NOT NULL REFERENCES partitions(name),
    timestamp INTEGER NOT NULL,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_samples_partition_timestamp ON samples(partition_name, timestamp);
"#;
