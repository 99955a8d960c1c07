//! Table implementation
//!
//! Item storage plus the lifecycle state machine, behind one RwLock.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::description::{TableDescription, ThroughputDescription};
use super::{TableSpec, TableStatus, Throughput};
use crate::config::Config;
use crate::error::{DbError, Result};
use crate::model::{
    AttributeUpdates, AttributeValue, Condition, Conditions, Expected, Item, ItemSize, Key,
    KeyRole, KeySchema, KeyValue,
};
use crate::timer::TimerService;

/// Range-key buckets under one hash key; `None` when the table has no range key
type RangeBuckets = BTreeMap<Option<KeyValue>, Item>;

/// Items collected by a query or scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    /// Field-filtered copies of the matching items
    pub items: Vec<Item>,

    /// Accumulated raw size used for capacity billing
    pub size: ItemSize,

    /// Number of items examined
    pub scanned: usize,
}

/// Mutable table state
///
/// Status and storage share one lock so that a lifecycle change can never
/// interleave with an item read-modify-write.
struct TableState {
    status: TableStatus,
    throughput: Throughput,
    last_increase: Option<DateTime<Utc>>,
    last_decrease: Option<DateTime<Utc>>,
    data: BTreeMap<KeyValue, RangeBuckets>,
    /// Number of real items in `data`
    count: usize,
}

impl TableState {
    /// Copy of the stored item, or a phantom when the slot is empty
    fn lookup(&self, hash: &KeyValue, range: &Option<KeyValue>) -> Item {
        self.data
            .get(hash)
            .and_then(|buckets| buckets.get(range))
            .cloned()
            .unwrap_or_else(Item::phantom)
    }

    fn store(&mut self, hash: KeyValue, range: Option<KeyValue>, item: Item) {
        self.data.entry(hash).or_default().insert(range, item);
    }

    fn remove(&mut self, hash: &KeyValue, range: &Option<KeyValue>) {
        if let Some(buckets) = self.data.get_mut(hash) {
            buckets.remove(range);
            if buckets.is_empty() {
                self.data.remove(hash);
            }
        }
    }

    fn items(&self) -> impl Iterator<Item = &Item> {
        self.data.values().flat_map(|buckets| buckets.values())
    }
}

/// A single table
///
/// ## Concurrency
/// - Everything mutable lives in `state` (one `RwLock` per table)
/// - Reads (get/query/scan/describe) take the read lock and return copies
/// - Mutations resolve the slot, check `Expected` and commit under one write
///   lock, so no other request can observe or commit in between
/// - Timer jobs hold a `Weak<Table>` and do nothing once the table is gone
pub struct Table {
    /// Registry-assigned instance id; distinguishes re-created tables
    id: u64,
    name: String,
    schema: KeySchema,
    created_at: DateTime<Utc>,
    config: Arc<Config>,
    timers: TimerService,
    state: RwLock<TableState>,
    this: Weak<Table>,
}

impl Table {
    /// Create a table in CREATING and schedule its activation
    pub fn create(id: u64, spec: TableSpec, config: Arc<Config>, timers: TimerService) -> Arc<Self> {
        let delay = config.delay_creating;

        let table = Arc::new_cyclic(|this| Table {
            id,
            name: spec.name,
            schema: spec.schema,
            created_at: Utc::now(),
            config,
            timers,
            state: RwLock::new(TableState {
                status: TableStatus::Creating,
                throughput: spec.throughput,
                last_increase: None,
                last_decrease: None,
                data: BTreeMap::new(),
                count: 0,
            }),
            this: this.clone(),
        });

        table.schedule_activation(delay);
        tracing::info!(table = %table.name, id, "Table created");
        table
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn status(&self) -> TableStatus {
        self.state.read().status
    }

    pub fn throughput(&self) -> Throughput {
        self.state.read().throughput
    }

    /// Number of items stored
    pub fn item_count(&self) -> usize {
        self.state.read().count
    }

    /// Sum of every item's billed size (raw size plus index overhead)
    pub fn billed_size(&self) -> usize {
        let state = self.state.read();
        self.billed_size_locked(&state)
    }

    fn billed_size_locked(&self, state: &TableState) -> usize {
        state
            .items()
            .map(|item| item.size().with_index_overhead(self.config.index_overhead))
            .sum()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn schedule_activation(&self, delay: std::time::Duration) {
        let target = self.this.clone();
        self.timers.schedule("activate", delay, move || {
            if let Some(table) = target.upgrade() {
                table.activate();
            }
        });
    }

    /// CREATING/UPDATING -> ACTIVE; any other status is left alone
    fn activate(&self) {
        let mut state = self.state.write();
        if matches!(state.status, TableStatus::Creating | TableStatus::Updating) {
            tracing::info!(table = %self.name, from = %state.status, "Table is now ACTIVE");
            state.status = TableStatus::Active;
        }
    }

    fn ensure_active(&self, state: &TableState, action: &str) -> Result<()> {
        if state.status != TableStatus::Active {
            return Err(DbError::ResourceInUse(format!(
                "Table {} is in {} state. Can not {}.",
                self.name, state.status, action
            )));
        }
        Ok(())
    }

    /// Change provisioned throughput
    ///
    /// Rules, checked in order:
    /// - the table must be ACTIVE
    /// - a non-zero change must be at least `min_throughput_change_pct`
    /// - a decrease needs `min_decrease_interval` since the last decrease
    /// - an increase may be at most `max_throughput_increase_pct`
    pub fn update_throughput(&self, requested: Throughput) -> Result<TableDescription> {
        requested.validate(&self.config)?;

        let mut state = self.state.write();
        self.ensure_active(&state, "UPDATE")?;

        let current = state.throughput;
        let dimensions = [
            ("ReadCapacityUnits", current.read, requested.read),
            ("WriteCapacityUnits", current.write, requested.write),
        ];

        for (label, from, to) in dimensions {
            if change_below_threshold(from, to, self.config.min_throughput_change_pct) {
                tracing::warn!(table = %self.name, label, from, to, "Throughput change too small");
                return Err(DbError::LimitExceeded(format!(
                    "Requested provisioned throughput change is not allowed. The {} change must be at least {} percent of current value. Current {} provisioned for the table: {}. Requested {}: {}.",
                    label, self.config.min_throughput_change_pct, label, from, label, to
                )));
            }
        }

        let now = Utc::now();
        let is_decrease = requested.read < current.read || requested.write < current.write;
        let is_increase = requested.read > current.read || requested.write > current.write;

        if is_decrease {
            if let Some(last) = state.last_decrease {
                let elapsed = (now - last).to_std().unwrap_or_default();
                if elapsed < self.config.min_decrease_interval {
                    tracing::warn!(table = %self.name, "Throughput decreased too recently");
                    return Err(DbError::LimitExceeded(format!(
                        "Subscriber limit exceeded: Provisioned throughput can be decreased only once within {:?}. Last decrease time: {}. Request time: {}",
                        self.config.min_decrease_interval, last, now
                    )));
                }
            }
        }

        if is_increase {
            for (label, from, to) in dimensions {
                if increase_above_limit(from, to, self.config.max_throughput_increase_pct) {
                    tracing::warn!(table = %self.name, label, from, to, "Throughput increase too large");
                    return Err(DbError::LimitExceeded(format!(
                        "Requested provisioned throughput change is not allowed. The {} change must be at most {} percent of current value. Current {} provisioned for the table: {}. Requested {}: {}.",
                        label, self.config.max_throughput_increase_pct, label, from, label, to
                    )));
                }
            }
        }

        if is_decrease {
            state.last_decrease = Some(now);
        }
        if is_increase {
            state.last_increase = Some(now);
        }

        state.status = TableStatus::Updating;
        state.throughput = requested;
        tracing::info!(
            table = %self.name,
            read = requested.read,
            write = requested.write,
            "Table is now UPDATING"
        );

        self.schedule_activation(self.config.delay_updating);
        Ok(self.describe_locked(&state, false))
    }

    /// ACTIVE -> DELETING, then `on_complete(name)` after the deletion delay
    ///
    /// Returns the description with status DELETING.
    pub fn schedule_delete<F>(&self, on_complete: F) -> Result<TableDescription>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let mut state = self.state.write();
        self.ensure_active(&state, "DELETE")?;

        state.status = TableStatus::Deleting;
        tracing::info!(table = %self.name, "Table is now DELETING");

        let name = self.name.clone();
        self.timers
            .schedule("delete", self.config.delay_deleting, move || on_complete(name));

        Ok(self.describe_locked(&state, false))
    }

    // =========================================================================
    // Description
    // =========================================================================

    /// Snapshot of the table metadata; `verbose` adds item count and size
    pub fn describe(&self, verbose: bool) -> TableDescription {
        let state = self.state.read();
        self.describe_locked(&state, verbose)
    }

    fn describe_locked(&self, state: &TableState, verbose: bool) -> TableDescription {
        let keys = self.schema.primary_keys();

        TableDescription {
            table_name: self.name.clone(),
            table_status: state.status,
            key_schema: keys.iter().map(|k| k.element()).collect(),
            attribute_definitions: keys
                .iter()
                .map(|k| Key::new(k.name.clone(), k.scalar_type))
                .collect(),
            provisioned_throughput: ThroughputDescription {
                read_capacity_units: state.throughput.read,
                write_capacity_units: state.throughput.write,
                last_increase_date_time: state.last_increase,
                last_decrease_date_time: state.last_decrease,
            },
            creation_date_time: self.created_at,
            item_count: verbose.then_some(state.count),
            table_size_bytes: verbose.then(|| self.billed_size_locked(state)),
        }
    }

    // =========================================================================
    // Key resolution
    // =========================================================================

    /// Hash and range key values of a full item
    fn item_key(&self, item: &Item) -> Result<(KeyValue, Option<KeyValue>)> {
        let hash = item.read_key(&self.schema.hash, KeyRole::Hash, self.config.max_hash_key_size)?;
        let range = match &self.schema.range {
            Some(range) => Some(item.read_key(range, KeyRole::Range, self.config.max_range_key_size)?),
            None => None,
        };
        Ok((hash, range))
    }

    /// Hash and range key values of a key map, which may hold nothing else
    fn resolve_key(&self, key: &Item) -> Result<(KeyValue, Option<KeyValue>)> {
        if let Some(extra) = key.names().find(|name| !self.schema.is_key_attribute(name)) {
            return Err(DbError::Validation(format!(
                "The provided key element {} does not match the schema of table {}",
                extra, self.name
            )));
        }
        self.item_key(key)
    }

    fn stamp_keys(&self, item: &mut Item, hash: &KeyValue, range: &Option<KeyValue>) {
        item.insert(self.schema.hash.name.clone(), AttributeValue::from(hash.clone()));
        if let (Some(key), Some(value)) = (&self.schema.range, range) {
            item.insert(key.name.clone(), AttributeValue::from(value.clone()));
        }
    }

    /// Check that `put` would accept `item`, without storing it
    pub fn validate_item(&self, item: &Item) -> Result<()> {
        item.validate()?;
        self.check_item_size(item, "")?;
        self.item_key(item).map(|_| ())
    }

    /// Check that `key` is a well-formed key map for this table
    pub fn validate_key(&self, key: &Item) -> Result<()> {
        self.resolve_key(key).map(|_| ())
    }

    fn check_item_size(&self, item: &Item, context: &str) -> Result<()> {
        let size = item.size().bytes();
        if size > self.config.max_item_size {
            return Err(DbError::Validation(format!(
                "Items must be smaller than {} bytes. Got {}{}",
                self.config.max_item_size, size, context
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Item operations
    // =========================================================================

    /// Store `item`, replacing whatever is at its key
    ///
    /// Returns `(previous item or phantom, new item)`.
    pub fn put(&self, item: Item, expected: Option<&Expected>) -> Result<(Item, Item)> {
        self.validate_item(&item)?;
        let (hash, range) = self.item_key(&item)?;

        let mut state = self.state.write();
        let old = state.lookup(&hash, &range);
        if let Some(expected) = expected {
            old.assert_matches_expected(expected)?;
        }

        let mut new = item;
        new.materialize();
        state.store(hash, range, new.clone());
        if old.is_phantom() {
            state.count += 1;
        }

        tracing::debug!(table = %self.name, created = old.is_phantom(), "put");
        Ok((old, new))
    }

    /// Apply update directives to the item at `key`, creating it if needed
    ///
    /// The directives run on a working copy; nothing is stored unless the
    /// result passes the size check. Returns `(old, new)`.
    pub fn update_item(
        &self,
        key: &Item,
        actions: &AttributeUpdates,
        expected: Option<&Expected>,
    ) -> Result<(Item, Item)> {
        let (hash, range) = self.resolve_key(key)?;

        let mut state = self.state.write();
        let old = state.lookup(&hash, &range);
        if let Some(expected) = expected {
            old.assert_matches_expected(expected)?;
        }

        if let Some(name) = actions.keys().find(|name| self.schema.is_key_attribute(name)) {
            return Err(DbError::Validation(format!(
                "UpdateItem can not alter the key attribute {}",
                name
            )));
        }

        let mut new = old.clone();
        new.apply_actions(actions)?;
        if old.is_phantom() {
            self.stamp_keys(&mut new, &hash, &range);
            new.materialize();
        }

        // Rejecting here leaves the stored item as it was
        self.check_item_size(&new, " after applying update")?;

        state.store(hash, range, new.clone());
        if old.is_phantom() {
            state.count += 1;
        }

        tracing::debug!(table = %self.name, created = old.is_phantom(), "update_item");
        Ok((old, new))
    }

    /// Remove the item at `key`; returns it, or a phantom if there was none
    pub fn delete_item(&self, key: &Item, expected: Option<&Expected>) -> Result<Item> {
        let (hash, range) = self.resolve_key(key)?;

        let mut state = self.state.write();
        let old = state.lookup(&hash, &range);
        if let Some(expected) = expected {
            old.assert_matches_expected(expected)?;
        }

        if self.schema.range.is_none() {
            state.data.remove(&hash);
        } else {
            state.remove(&hash, &range);
        }

        if !old.is_phantom() {
            state.count -= 1;
        }

        tracing::debug!(table = %self.name, existed = !old.is_phantom(), "delete_item");
        Ok(old)
    }

    /// Field-filtered copy of the item at `key`, or `None`
    pub fn get(&self, key: &Item, fields: &[String]) -> Result<Option<Item>> {
        let (hash, range) = self.resolve_key(key)?;

        let state = self.state.read();
        let item = state.lookup(&hash, &range);
        if item.is_phantom() {
            return Ok(None);
        }
        Ok(Some(item.filter(fields)))
    }

    /// Items under one hash key, in range key order
    ///
    /// Stops once `limit` matching items are collected. The accumulated size
    /// covers the matching items only.
    pub fn query(
        &self,
        hash_key: &AttributeValue,
        range_condition: Option<&Condition>,
        fields: &[String],
        limit: Option<usize>,
        reverse: bool,
    ) -> Result<Results> {
        let hash = KeyValue::from_attribute(hash_key)
            .filter(|k| k.scalar_type() == self.schema.hash.scalar_type)
            .ok_or_else(|| {
                DbError::Validation(format!(
                    "Hash key {} must be of type {}, got {}",
                    self.schema.hash.name,
                    self.schema.hash.scalar_type,
                    hash_key.type_name()
                ))
            })?;

        let range_name = match (&self.schema.range, range_condition) {
            (None, Some(_)) => {
                return Err(DbError::Validation(format!(
                    "Table {} has no range key; a range key condition is not allowed",
                    self.name
                )))
            }
            (Some(_), Some(condition)) if !condition.operator().is_range_key_operator() => {
                return Err(DbError::Validation(format!(
                    "ComparisonOperator {} is not valid for a range key condition",
                    condition.operator()
                )))
            }
            (Some(range), Some(condition))
                if condition
                    .values()
                    .iter()
                    .any(|value| value.type_name() != range.scalar_type.as_str()) =>
            {
                return Err(DbError::Validation(format!(
                    "Range key condition values for {} must be of type {}",
                    range.name, range.scalar_type
                )))
            }
            (range, _) => range.as_ref().map(|k| k.name.as_str()),
        };

        let state = self.state.read();
        let mut results = Results::default();

        let Some(buckets) = state.data.get(&hash) else {
            return Ok(results);
        };

        let ordered: Box<dyn Iterator<Item = &Item> + '_> = if reverse {
            Box::new(buckets.values().rev())
        } else {
            Box::new(buckets.values())
        };

        for item in ordered {
            if limit.is_some_and(|limit| results.items.len() >= limit) {
                break;
            }
            results.scanned += 1;

            let matched = match range_name {
                Some(name) => item.field_matches(name, range_condition),
                None => true,
            };
            if matched {
                results.size += item.size();
                results.items.push(item.filter(fields));
            }
        }

        Ok(results)
    }

    /// Every item in the table, filtered by `conditions`
    ///
    /// Every examined item counts towards `scanned` and `size`, matching or
    /// not. `limit` caps the number of items examined.
    pub fn scan(
        &self,
        conditions: Option<&Conditions>,
        fields: &[String],
        limit: Option<usize>,
    ) -> Result<Results> {
        let state = self.state.read();
        let mut results = Results::default();

        for item in state.items() {
            if limit.is_some_and(|limit| results.scanned >= limit) {
                break;
            }
            results.scanned += 1;
            results.size += item.size();

            if item.matches(conditions) {
                results.items.push(item.filter(fields));
            }
        }

        Ok(results)
    }
}

/// True iff `0 < |change| < threshold` percent of `current`
fn change_below_threshold(current: u64, requested: u64, threshold_pct: u64) -> bool {
    current != requested && current.abs_diff(requested) * 100 < threshold_pct * current
}

/// True iff the increase exceeds `limit_pct` percent of `current`
fn increase_above_limit(current: u64, requested: u64, limit_pct: u64) -> bool {
    requested > current && (requested - current) * 100 > limit_pct * current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_threshold() {
        assert!(change_below_threshold(100, 105, 10));
        assert!(!change_below_threshold(100, 110, 10));
        assert!(!change_below_threshold(100, 100, 10));
        assert!(change_below_threshold(100, 95, 10));
        assert!(!change_below_threshold(100, 90, 10));
    }

    #[test]
    fn test_increase_limit() {
        assert!(increase_above_limit(100, 201, 100));
        assert!(!increase_above_limit(100, 200, 100));
        assert!(!increase_above_limit(100, 50, 100));
    }
}
