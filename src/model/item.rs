//! Items
//!
//! An item maps attribute names to values. Sizes are derived on demand from
//! the contents; nothing about the size is cached.

use std::collections::HashMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use super::schema::{Key, KeyRole, KeyValue};
use super::value::AttributeValue;
use crate::error::{DbError, Result};

/// Bytes per capacity unit
pub const CAPACITY_UNIT_SIZE: usize = 1024;

// =============================================================================
// ItemSize
// =============================================================================

/// Raw encoded size of one item or of a group of items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemSize(usize);

impl ItemSize {
    pub fn new(bytes: usize) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> usize {
        self.0
    }

    /// Billed size: raw size plus the per-item index overhead
    pub fn with_index_overhead(&self, overhead: usize) -> usize {
        self.0 + overhead
    }

    /// Whole capacity units, `ceil(size / 1 KiB)` and never below one
    pub fn as_units(&self) -> u64 {
        (self.0.div_ceil(CAPACITY_UNIT_SIZE) as u64).max(1)
    }

    /// Read units: halved for eventually consistent reads
    pub fn read_capacity(&self, consistent: bool) -> f64 {
        let base = if consistent { 1.0 } else { 0.5 };
        base * self.as_units() as f64
    }

    /// Write units
    pub fn write_capacity(&self) -> f64 {
        self.as_units() as f64
    }
}

impl Add for ItemSize {
    type Output = ItemSize;

    fn add(self, rhs: ItemSize) -> ItemSize {
        ItemSize(self.0 + rhs.0)
    }
}

impl AddAssign for ItemSize {
    fn add_assign(&mut self, rhs: ItemSize) {
        self.0 += rhs.0;
    }
}

impl Sum for ItemSize {
    fn sum<I: Iterator<Item = ItemSize>>(iter: I) -> Self {
        iter.fold(ItemSize::default(), Add::add)
    }
}

// =============================================================================
// Item
// =============================================================================

/// A set of named attributes
///
/// A *phantom* item stands for a storage slot that was never written. It is
/// only ever produced by a lookup miss and is never stored, which keeps it
/// distinct from a real item that happens to have no attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    attributes: HashMap<String, AttributeValue>,

    #[serde(skip)]
    phantom: bool,
}

impl Item {
    /// Create a new, empty, real item
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for a slot that holds nothing
    pub fn phantom() -> Self {
        Self {
            attributes: HashMap::new(),
            phantom: true,
        }
    }

    /// True if this item came from a lookup miss rather than a write
    pub fn is_phantom(&self) -> bool {
        self.phantom
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.insert(name, value);
        self
    }

    // -------------------------------------------------------------------------
    // Map access
    // -------------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Insert an attribute; the item stops being a phantom
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        self.phantom = false;
        self.attributes.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.attributes.keys()
    }

    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        self.attributes
    }

    /// Turn a working copy into a real item
    pub(crate) fn materialize(&mut self) {
        self.phantom = false;
    }

    // -------------------------------------------------------------------------
    // Size
    // -------------------------------------------------------------------------

    /// Sum of each attribute's name length plus its value's encoded length
    pub fn size(&self) -> ItemSize {
        ItemSize(
            self.attributes
                .iter()
                .map(|(name, value)| name.len() + value.size())
                .sum(),
        )
    }

    // -------------------------------------------------------------------------
    // Validation and projection
    // -------------------------------------------------------------------------

    /// Check every value's own invariants
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.attributes {
            if name.is_empty() {
                return Err(DbError::Validation("Attribute names must not be empty".into()));
            }
            value.validate()?;
        }
        Ok(())
    }

    /// Extract and validate one key component
    ///
    /// Fails if the attribute is missing, is not of the key's scalar type, or
    /// is larger than `max_size` bytes.
    pub fn read_key(&self, key: &Key, role: KeyRole, max_size: usize) -> Result<KeyValue> {
        let value = self.attributes.get(&key.name).ok_or_else(|| {
            DbError::Validation(format!(
                "One of the required keys was not given a value: {} ({})",
                key.name, role
            ))
        })?;

        let key_value = KeyValue::from_attribute(value)
            .filter(|k| k.scalar_type() == key.scalar_type)
            .ok_or_else(|| {
                DbError::Validation(format!(
                    "Type mismatch for key {}: expected {}, got {}",
                    key.name,
                    key.scalar_type,
                    value.type_name()
                ))
            })?;

        let size = value.size();
        if size > max_size {
            return Err(DbError::Validation(format!(
                "{} key {} must be at most {} bytes, got {}",
                role, key.name, max_size, size
            )));
        }

        Ok(key_value)
    }

    /// Projected copy holding only `fields`; all attributes if `fields` is empty
    pub fn filter(&self, fields: &[String]) -> Item {
        if fields.is_empty() {
            return self.clone();
        }

        let attributes = fields
            .iter()
            .filter_map(|name| {
                self.attributes
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();

        Item {
            attributes,
            phantom: self.phantom,
        }
    }
}

impl FromIterator<(String, AttributeValue)> for Item {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Item {
            attributes: iter.into_iter().collect(),
            phantom: false,
        }
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Item {
            attributes,
            phantom: false,
        }
    }
}
