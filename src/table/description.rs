//! Table description
//!
//! Serializable snapshot of a table's metadata, as returned by create,
//! describe, update and delete.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{TableStatus, Throughput};
use crate::model::{Key, KeySchemaElement};

/// Provisioned throughput with the timestamps of the last changes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThroughputDescription {
    pub read_capacity_units: u64,
    pub write_capacity_units: u64,

    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub last_increase_date_time: Option<DateTime<Utc>>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub last_decrease_date_time: Option<DateTime<Utc>>,
}

impl ThroughputDescription {
    pub fn throughput(&self) -> Throughput {
        Throughput::new(self.read_capacity_units, self.write_capacity_units)
    }
}

/// Table metadata snapshot
///
/// `item_count` and `table_size_bytes` are only filled by verbose
/// descriptions; the size includes the per-item index overhead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDescription {
    pub table_name: String,
    pub table_status: TableStatus,
    pub key_schema: Vec<KeySchemaElement>,
    pub attribute_definitions: Vec<Key>,
    pub provisioned_throughput: ThroughputDescription,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub creation_date_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_size_bytes: Option<usize>,
}
