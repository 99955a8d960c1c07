//! Request definitions
//!
//! One typed input per operation, deserializable from DynamoDB JSON. Shape
//! and type checks happen during deserialization (or in the constructors);
//! the engine only sees well-formed values.

use std::collections::HashMap;

use serde::Deserialize;

use crate::model::{AttributeUpdates, AttributeValue, Condition, Conditions, Expected, Item, Key, KeySchemaElement};
use crate::table::Throughput;

/// What an item mutation reports back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnValues {
    #[default]
    None,
    AllOld,
    UpdatedOld,
    AllNew,
    UpdatedNew,
}

impl ReturnValues {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnValues::None => "NONE",
            ReturnValues::AllOld => "ALL_OLD",
            ReturnValues::UpdatedOld => "UPDATED_OLD",
            ReturnValues::AllNew => "ALL_NEW",
            ReturnValues::UpdatedNew => "UPDATED_NEW",
        }
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Table operations
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    pub table_name: String,
    pub key_schema: Vec<KeySchemaElement>,
    pub attribute_definitions: Vec<Key>,
    pub provisioned_throughput: Throughput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableInput {
    pub table_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesInput {
    #[serde(default)]
    pub exclusive_start_table_name: Option<String>,

    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTableInput {
    pub table_name: String,
    pub provisioned_throughput: Throughput,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    pub table_name: String,
}

// =============================================================================
// Item operations
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    pub table_name: String,
    pub item: Item,

    #[serde(default)]
    pub expected: Option<Expected>,

    #[serde(default)]
    pub return_values: ReturnValues,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    pub table_name: String,
    pub key: Item,

    #[serde(default)]
    pub attributes_to_get: Vec<String>,

    #[serde(default)]
    pub consistent_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    pub table_name: String,
    pub key: Item,

    #[serde(default)]
    pub attribute_updates: AttributeUpdates,

    #[serde(default)]
    pub expected: Option<Expected>,

    #[serde(default)]
    pub return_values: ReturnValues,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    pub table_name: String,
    pub key: Item,

    #[serde(default)]
    pub expected: Option<Expected>,

    #[serde(default)]
    pub return_values: ReturnValues,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    pub table_name: String,
    pub hash_key_value: AttributeValue,

    #[serde(default)]
    pub range_key_condition: Option<Condition>,

    #[serde(default)]
    pub attributes_to_get: Vec<String>,

    #[serde(default)]
    pub limit: Option<usize>,

    /// Ascending range key order when true (the default)
    #[serde(default = "default_true")]
    pub scan_index_forward: bool,

    #[serde(default)]
    pub consistent_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    pub table_name: String,

    #[serde(default)]
    pub scan_filter: Option<Conditions>,

    #[serde(default)]
    pub attributes_to_get: Vec<String>,

    #[serde(default)]
    pub limit: Option<usize>,
}

// =============================================================================
// Batch operations
// =============================================================================

/// Keys to read from one table in a batch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeysAndAttributes {
    pub keys: Vec<Item>,

    #[serde(default)]
    pub attributes_to_get: Vec<String>,

    #[serde(default)]
    pub consistent_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemInput {
    pub request_items: HashMap<String, KeysAndAttributes>,
}

/// One unconditional write in a batch
#[derive(Debug, Clone, Deserialize)]
pub enum WriteRequest {
    PutRequest {
        #[serde(rename = "Item")]
        item: Item,
    },
    DeleteRequest {
        #[serde(rename = "Key")]
        key: Item,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemInput {
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

// =============================================================================
// Request
// =============================================================================

/// A parsed request, tagged by `"Operation"` on the wire
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "Operation")]
pub enum Request {
    CreateTable(CreateTableInput),
    DescribeTable(DescribeTableInput),
    ListTables(ListTablesInput),
    UpdateTable(UpdateTableInput),
    DeleteTable(DeleteTableInput),
    PutItem(PutItemInput),
    GetItem(GetItemInput),
    UpdateItem(UpdateItemInput),
    DeleteItem(DeleteItemInput),
    Query(QueryInput),
    Scan(ScanInput),
    BatchGetItem(BatchGetItemInput),
    BatchWriteItem(BatchWriteItemInput),
}

impl Request {
    /// Wire operation name
    pub fn operation(&self) -> &'static str {
        match self {
            Request::CreateTable(_) => "CreateTable",
            Request::DescribeTable(_) => "DescribeTable",
            Request::ListTables(_) => "ListTables",
            Request::UpdateTable(_) => "UpdateTable",
            Request::DeleteTable(_) => "DeleteTable",
            Request::PutItem(_) => "PutItem",
            Request::GetItem(_) => "GetItem",
            Request::UpdateItem(_) => "UpdateItem",
            Request::DeleteItem(_) => "DeleteItem",
            Request::Query(_) => "Query",
            Request::Scan(_) => "Scan",
            Request::BatchGetItem(_) => "BatchGetItem",
            Request::BatchWriteItem(_) => "BatchWriteItem",
        }
    }

    /// Whether the operation changes state
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Request::CreateTable(_)
                | Request::UpdateTable(_)
                | Request::DeleteTable(_)
                | Request::PutItem(_)
                | Request::UpdateItem(_)
                | Request::DeleteItem(_)
                | Request::BatchWriteItem(_)
        )
    }
}
