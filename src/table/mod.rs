//! Table Module
//!
//! One table's item storage, throughput settings and lifecycle.
//!
//! ## Lifecycle
//! ```text
//!   CREATING ──(delay)──► ACTIVE ◄──(delay)── UPDATING
//!                           │  └──update_throughput──┘
//!                           │
//!                     schedule_delete
//!                           ▼
//!                       DELETING ──(delay)──► removed
//! ```
//!
//! ## Storage Layout
//! Two levels of ordered maps: hash key value, then range key value. Tables
//! without a range key keep a single `None` slot per hash key.

mod table;
mod description;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use table::{Results, Table};
pub use description::{ThroughputDescription, TableDescription};

use crate::config::Config;
use crate::error::{DbError, Result};
use crate::model::KeySchema;

/// Shortest and longest allowed table names
pub const TABLE_NAME_MIN_LEN: usize = 3;
pub const TABLE_NAME_MAX_LEN: usize = 255;

/// Lifecycle status of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Active => "ACTIVE",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisioned read/write capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    #[serde(rename = "ReadCapacityUnits")]
    pub read: u64,

    #[serde(rename = "WriteCapacityUnits")]
    pub write: u64,
}

impl Throughput {
    pub fn new(read: u64, write: u64) -> Self {
        Self { read, write }
    }

    /// Check both values against the configured bounds
    pub fn validate(&self, config: &Config) -> Result<()> {
        for (label, value) in [("ReadCapacityUnits", self.read), ("WriteCapacityUnits", self.write)] {
            if value < config.min_throughput || value > config.max_throughput {
                return Err(DbError::Validation(format!(
                    "{} must be within [{}, {}], got {}",
                    label, config.min_throughput, config.max_throughput, value
                )));
            }
        }
        Ok(())
    }
}

/// Everything needed to create a table
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub schema: KeySchema,
    pub throughput: Throughput,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, schema: KeySchema, throughput: Throughput) -> Self {
        Self {
            name: name.into(),
            schema,
            throughput,
        }
    }

    pub fn validate(&self, config: &Config) -> Result<()> {
        validate_table_name(&self.name)?;
        self.throughput.validate(config)
    }
}

/// Table names: 3-255 characters from `[A-Za-z0-9_.-]`
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid_len = (TABLE_NAME_MIN_LEN..=TABLE_NAME_MAX_LEN).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if !valid_len || !valid_chars {
        return Err(DbError::Validation(format!(
            "Invalid table name {:?}: must be {}-{} characters of [a-zA-Z0-9_.-]",
            name, TABLE_NAME_MIN_LEN, TABLE_NAME_MAX_LEN
        )));
    }
    Ok(())
}

