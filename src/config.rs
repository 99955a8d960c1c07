//! Configuration for ddbmem
//!
//! Centralized limits and lifecycle delays with defaults matching the hosted
//! service. Nothing here is persisted; every value can be overridden through
//! [`Config::builder`].

use std::time::Duration;

use crate::error::{DbError, Result};

/// Main configuration for a [`Database`](crate::Database) instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Registry Limits
    // -------------------------------------------------------------------------
    /// Maximum number of tables a registry may hold
    pub max_tables: usize,

    // -------------------------------------------------------------------------
    // Item Limits (bytes)
    // -------------------------------------------------------------------------
    /// Maximum encoded size of a hash key value
    pub max_hash_key_size: usize,

    /// Maximum encoded size of a range key value
    pub max_range_key_size: usize,

    /// Maximum item size, not including the index overhead
    pub max_item_size: usize,

    /// Added to each item size when computing table storage
    pub index_overhead: usize,

    // -------------------------------------------------------------------------
    // Throughput Governance
    // -------------------------------------------------------------------------
    /// Lowest provisioned read/write capacity
    pub min_throughput: u64,

    /// Highest provisioned read/write capacity
    pub max_throughput: u64,

    /// Minimum change (percent) for any non-zero throughput update
    pub min_throughput_change_pct: u64,

    /// Maximum increase (percent) in a single throughput update
    pub max_throughput_increase_pct: u64,

    /// Minimum time between two throughput decreases
    pub min_decrease_interval: Duration,

    // -------------------------------------------------------------------------
    // Lifecycle Delays
    // -------------------------------------------------------------------------
    /// CREATING -> ACTIVE
    pub delay_creating: Duration,

    /// UPDATING -> ACTIVE
    pub delay_updating: Duration,

    /// DELETING -> removed from the registry
    pub delay_deleting: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tables: 256,
            max_hash_key_size: 2048,
            max_range_key_size: 1024,
            max_item_size: 64 * 1024, // 64 KiB
            index_overhead: 100,
            min_throughput: 1,
            max_throughput: 10_000,
            min_throughput_change_pct: 10,
            max_throughput_increase_pct: 100,
            min_decrease_interval: Duration::from_secs(24 * 60 * 60),
            delay_creating: Duration::from_secs(1),
            delay_updating: Duration::from_secs(1),
            delay_deleting: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings that cannot describe a working table service
    pub fn validate(&self) -> Result<()> {
        if self.max_tables == 0 {
            return Err(DbError::Config("max_tables must be at least 1".into()));
        }
        if self.min_throughput == 0 || self.min_throughput > self.max_throughput {
            return Err(DbError::Config(format!(
                "throughput bounds [{}, {}] are invalid",
                self.min_throughput, self.max_throughput
            )));
        }
        if self.max_range_key_size == 0 || self.max_hash_key_size == 0 {
            return Err(DbError::Config("key size limits must be non-zero".into()));
        }
        if self.max_item_size < self.max_hash_key_size {
            return Err(DbError::Config(format!(
                "max_item_size ({}) is smaller than max_hash_key_size ({})",
                self.max_item_size, self.max_hash_key_size
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the table-count ceiling
    pub fn max_tables(mut self, count: usize) -> Self {
        self.config.max_tables = count;
        self
    }

    /// Set the maximum hash key size (in bytes)
    pub fn max_hash_key_size(mut self, size: usize) -> Self {
        self.config.max_hash_key_size = size;
        self
    }

    /// Set the maximum range key size (in bytes)
    pub fn max_range_key_size(mut self, size: usize) -> Self {
        self.config.max_range_key_size = size;
        self
    }

    /// Set the maximum item size (in bytes)
    pub fn max_item_size(mut self, size: usize) -> Self {
        self.config.max_item_size = size;
        self
    }

    /// Set the per-item index overhead used for table storage reporting
    pub fn index_overhead(mut self, size: usize) -> Self {
        self.config.index_overhead = size;
        self
    }

    /// Set the provisioned throughput bounds
    pub fn throughput_bounds(mut self, min: u64, max: u64) -> Self {
        self.config.min_throughput = min;
        self.config.max_throughput = max;
        self
    }

    /// Set the minimum throughput change (percent)
    pub fn min_throughput_change_pct(mut self, pct: u64) -> Self {
        self.config.min_throughput_change_pct = pct;
        self
    }

    /// Set the maximum throughput increase per update (percent)
    pub fn max_throughput_increase_pct(mut self, pct: u64) -> Self {
        self.config.max_throughput_increase_pct = pct;
        self
    }

    /// Set the minimum interval between two throughput decreases
    pub fn min_decrease_interval(mut self, interval: Duration) -> Self {
        self.config.min_decrease_interval = interval;
        self
    }

    /// Set the CREATING -> ACTIVE delay
    pub fn delay_creating(mut self, delay: Duration) -> Self {
        self.config.delay_creating = delay;
        self
    }

    /// Set the UPDATING -> ACTIVE delay
    pub fn delay_updating(mut self, delay: Duration) -> Self {
        self.config.delay_updating = delay;
        self
    }

    /// Set the DELETING -> removed delay
    pub fn delay_deleting(mut self, delay: Duration) -> Self {
        self.config.delay_deleting = delay;
        self
    }

    /// Set all three lifecycle delays at once
    pub fn lifecycle_delays(self, delay: Duration) -> Self {
        self.delay_creating(delay)
            .delay_updating(delay)
            .delay_deleting(delay)
    }

    pub fn build(self) -> Config {
        self.config
    }
}
