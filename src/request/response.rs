//! Response definitions
//!
//! One output struct per operation, serialized with DynamoDB JSON field
//! names. Optional fields are omitted rather than emitted as `null`.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::Item;
use crate::table::TableDescription;

// =============================================================================
// Table operations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableOutput {
    pub table_description: TableDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableOutput {
    pub table: TableDescription,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesOutput {
    pub table_names: Vec<String>,

    /// Set when `Limit` cut the listing short
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTableOutput {
    pub table_description: TableDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableOutput {
    pub table_description: TableDescription,
}

// =============================================================================
// Item operations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemOutput {
    pub consumed_capacity_units: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    pub consumed_capacity_units: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemOutput {
    pub consumed_capacity_units: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemOutput {
    pub consumed_capacity_units: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    pub items: Vec<Item>,
    pub count: usize,
    pub consumed_capacity_units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanOutput {
    pub items: Vec<Item>,
    pub count: usize,
    pub scanned_count: usize,
    pub consumed_capacity_units: f64,
}

// =============================================================================
// Batch operations
// =============================================================================

/// Items read from one table by a batch get
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetTableOutput {
    pub items: Vec<Item>,
    pub consumed_capacity_units: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemOutput {
    pub responses: HashMap<String, BatchGetTableOutput>,

    /// Always empty: every key is processed
    pub unprocessed_keys: HashMap<String, Vec<Item>>,
}

/// Capacity consumed on one table by a batch write
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteTableOutput {
    pub consumed_capacity_units: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemOutput {
    pub responses: HashMap<String, BatchWriteTableOutput>,

    /// Always empty: every write is applied
    pub unprocessed_items: HashMap<String, Vec<Item>>,
}

// =============================================================================
// Response
// =============================================================================

/// Result of a successful request; serializes as the bare output body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    CreateTable(CreateTableOutput),
    DescribeTable(DescribeTableOutput),
    ListTables(ListTablesOutput),
    UpdateTable(UpdateTableOutput),
    DeleteTable(DeleteTableOutput),
    PutItem(PutItemOutput),
    GetItem(GetItemOutput),
    UpdateItem(UpdateItemOutput),
    DeleteItem(DeleteItemOutput),
    Query(QueryOutput),
    Scan(ScanOutput),
    BatchGetItem(BatchGetItemOutput),
    BatchWriteItem(BatchWriteItemOutput),
}
