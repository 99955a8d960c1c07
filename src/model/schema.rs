//! Key schema
//!
//! A table's primary key is a mandatory hash (partition) key and an optional
//! range (sort) key, each naming one scalar attribute.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::value::{AttributeValue, Number};
use crate::error::{DbError, Result};

/// Scalar attribute types allowed for key attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    #[serde(rename = "S")]
    S,
    #[serde(rename = "N")]
    N,
    #[serde(rename = "B")]
    B,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::S => "S",
            ScalarType::N => "N",
            ScalarType::B => "B",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a key attribute within the primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyRole {
    #[serde(rename = "HASH")]
    Hash,
    #[serde(rename = "RANGE")]
    Range,
}

impl KeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Hash => "HASH",
            KeyRole::Range => "RANGE",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key attribute: name and scalar type
///
/// Serialized as an attribute definition (`AttributeName`, `AttributeType`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "AttributeName")]
    pub name: String,

    #[serde(rename = "AttributeType")]
    pub scalar_type: ScalarType,
}

impl Key {
    pub fn new(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar_type,
        }
    }

    /// Attach a role, producing the described form of this key
    pub fn with_role(&self, role: KeyRole) -> PrimaryKey {
        PrimaryKey {
            name: self.name.clone(),
            scalar_type: self.scalar_type,
            role,
        }
    }
}

/// A key attribute together with its role tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub name: String,
    pub scalar_type: ScalarType,
    pub role: KeyRole,
}

impl PrimaryKey {
    /// Key schema element for description output
    pub fn element(&self) -> KeySchemaElement {
        KeySchemaElement {
            attribute_name: self.name.clone(),
            key_type: self.role,
        }
    }
}

/// One entry of a wire key schema (`AttributeName`, `KeyType`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyRole,
}

/// Hash key plus optional range key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub hash: Key,
    pub range: Option<Key>,
}

impl KeySchema {
    /// Schema with a hash key only
    pub fn hash(hash: Key) -> Self {
        Self { hash, range: None }
    }

    /// Schema with hash and range keys
    pub fn hash_range(hash: Key, range: Key) -> Self {
        Self {
            hash,
            range: Some(range),
        }
    }

    /// Build a schema from wire elements and attribute definitions
    ///
    /// Exactly one HASH element is required, at most one RANGE element is
    /// allowed, and every element must have a matching definition.
    pub fn from_elements(elements: &[KeySchemaElement], definitions: &[Key]) -> Result<Self> {
        let lookup = |element: &KeySchemaElement| -> Result<Key> {
            definitions
                .iter()
                .find(|d| d.name == element.attribute_name)
                .cloned()
                .ok_or_else(|| {
                    DbError::Validation(format!(
                        "No attribute definition for key attribute {}",
                        element.attribute_name
                    ))
                })
        };

        let hashes: Vec<_> = elements.iter().filter(|e| e.key_type == KeyRole::Hash).collect();
        let ranges: Vec<_> = elements.iter().filter(|e| e.key_type == KeyRole::Range).collect();

        if hashes.len() != 1 || ranges.len() > 1 {
            return Err(DbError::Validation(
                "Key schema must have exactly one HASH key and at most one RANGE key".into(),
            ));
        }

        let hash = lookup(hashes[0])?;
        let range = ranges.first().map(|e| lookup(*e)).transpose()?;

        if let Some(range) = &range {
            if range.name == hash.name {
                return Err(DbError::Validation(
                    "HASH and RANGE keys must name different attributes".into(),
                ));
            }
        }

        Ok(Self { hash, range })
    }

    /// Whether `name` is the hash or range key attribute
    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.hash.name == name || self.range.as_ref().is_some_and(|r| r.name == name)
    }

    /// Keys with their role tags, hash first
    pub fn primary_keys(&self) -> Vec<PrimaryKey> {
        let mut keys = vec![self.hash.with_role(KeyRole::Hash)];
        if let Some(range) = &self.range {
            keys.push(range.with_role(KeyRole::Range));
        }
        keys
    }
}

/// Value of a key attribute, used to address item storage
///
/// Within one table every key value of a role has the same kind, so the
/// ordering across kinds never matters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyValue {
    S(String),
    N(Number),
    B(Bytes),
}

impl KeyValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            KeyValue::S(_) => ScalarType::S,
            KeyValue::N(_) => ScalarType::N,
            KeyValue::B(_) => ScalarType::B,
        }
    }

    /// Convert a scalar attribute value; `None` for sets
    pub fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::S(s) => Some(KeyValue::S(s.clone())),
            AttributeValue::N(n) => Some(KeyValue::N(n.clone())),
            AttributeValue::B(b) => Some(KeyValue::B(b.clone())),
            _ => None,
        }
    }
}

impl From<KeyValue> for AttributeValue {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::S(s) => AttributeValue::S(s),
            KeyValue::N(n) => AttributeValue::N(n),
            KeyValue::B(b) => AttributeValue::B(b),
        }
    }
}
