//! Request Module
//!
//! The typed boundary in front of the engine.
//!
//! ## Responsibilities
//! - Define one input and one output struct per operation
//! - Decode DynamoDB JSON requests (`{"Operation": "PutItem", ...}`)
//! - Select return values and account consumed capacity
//!
//! ## Consumed capacity
//! Capacity is counted in whole 1 KiB units, never below one:
//! - get: units of the stored item, halved unless consistent
//! - put / update: the larger of the old and new item's units
//! - delete: units of the removed item
//! - query: units of all matched items together, halved unless consistent
//! - scan: half the units of everything examined, matching or not

mod command;
mod response;
pub(crate) mod handler;

pub use command::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    DescribeTableInput, GetItemInput, KeysAndAttributes, ListTablesInput, PutItemInput, QueryInput,
    Request, ReturnValues, ScanInput, UpdateItemInput, UpdateTableInput, WriteRequest,
};
pub use handler::{MAX_BATCH_GET_KEYS, MAX_BATCH_WRITES};
pub use response::{
    BatchGetItemOutput, BatchGetTableOutput, BatchWriteItemOutput, BatchWriteTableOutput,
    CreateTableOutput, DeleteItemOutput, DeleteTableOutput, DescribeTableOutput, GetItemOutput,
    ListTablesOutput, PutItemOutput, QueryOutput, Response, ScanOutput, UpdateItemOutput,
    UpdateTableOutput,
};
