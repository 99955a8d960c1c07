//! # ddbmem
//!
//! An in-memory, DynamoDB-style key-attribute store for exercising clients
//! without a live service:
//! - Tables with a hash key and an optional range key
//! - Conditional put/update/delete with `Expected` preconditions
//! - Query and scan with comparison operators and projections
//! - Table lifecycle (CREATING, ACTIVE, UPDATING, DELETING) driven by timers
//! - Provisioned throughput rules and consumed-capacity accounting
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Request (typed, from JSON)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Database::execute
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Database (registry)                         │
//! │        RwLock<name -> Arc<Table>>, table-count ceiling       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │    Table    │◄─────────│ TimerService │
//!   │  (RwLock)   │  Weak    │ (delay queue)│
//!   └──────┬──────┘          └──────────────┘
//!          │
//!          ▼
//!   hash key -> range key -> Item
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ddbmem::{AttributeValue, Database, Item, Key, KeySchema, ScalarType, TableSpec, Throughput};
//!
//! let db = Database::with_defaults()?;
//! let schema = KeySchema::hash(Key::new("id", ScalarType::S));
//! db.create_table(TableSpec::new("Orders", schema, Throughput::new(5, 5)))?;
//!
//! let table = db.get_table("Orders")?;
//! table.put(Item::new().with("id", AttributeValue::s("A1")), None)?;
//! # Ok::<(), ddbmem::DbError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod timer;
pub mod table;
pub mod database;
pub mod request;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DbError, Result};
pub use config::Config;
pub use database::Database;
pub use model::{
    AttributeValue, ComparisonOperator, Condition, Conditions, Expected, ExpectedValue, Item,
    ItemSize, Key, KeySchema, KeyValue, Number, ScalarType, UpdateAction,
};
pub use request::{Request, Response, ReturnValues};
pub use table::{Table, TableDescription, TableSpec, TableStatus, Throughput};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ddbmem
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
