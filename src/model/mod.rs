//! Model Module
//!
//! The item data model every other layer builds on.
//!
//! ## Contents
//! - `value`: typed attribute values (S, N, B, SS, NS, BS) and their sizes
//! - `item`: attribute maps, phantom items, capacity units, projection
//! - `schema`: hash/range key descriptors and storage key values
//! - `condition`: comparison operators for query and scan
//! - `update`: UpdateItem directives (PUT / ADD / DELETE)
//! - `expected`: optimistic-concurrency preconditions

mod value;
mod item;
mod schema;
mod condition;
mod update;
mod expected;

pub use value::{AttributeValue, Number};
pub use item::{Item, ItemSize, CAPACITY_UNIT_SIZE};
pub use schema::{Key, KeyRole, KeySchema, KeySchemaElement, KeyValue, PrimaryKey, ScalarType};
pub use condition::{ComparisonOperator, Condition, Conditions};
pub use update::{AttributeUpdates, UpdateAction};
pub use expected::{Expected, ExpectedValue};
