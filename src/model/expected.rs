//! Expected-state preconditions
//!
//! Every mutating operation may carry an `Expected` map that must hold
//! against the stored item before the mutation commits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::value::AttributeValue;
use crate::error::{DbError, Result};

/// Preconditions keyed by attribute name
///
/// An empty map is itself a precondition: the item must not exist yet.
pub type Expected = HashMap<String, ExpectedValue>;

/// Precondition on one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpected", into = "RawExpected")]
pub enum ExpectedValue {
    /// Attribute must exist with exactly this value
    Exists(AttributeValue),

    /// Attribute must be absent
    NotExists,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawExpected {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<AttributeValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
}

impl TryFrom<RawExpected> for ExpectedValue {
    type Error = DbError;

    fn try_from(raw: RawExpected) -> Result<Self> {
        match (raw.value, raw.exists) {
            (Some(value), None | Some(true)) => Ok(ExpectedValue::Exists(value)),
            (None, Some(false)) => Ok(ExpectedValue::NotExists),
            (Some(_), Some(false)) => Err(DbError::Validation(
                "One or more parameter values were invalid: Value cannot be used when Exists is false"
                    .into(),
            )),
            (None, _) => Err(DbError::Validation(
                "One or more parameter values were invalid: Value must be provided when Exists is true"
                    .into(),
            )),
        }
    }
}

impl From<ExpectedValue> for RawExpected {
    fn from(expected: ExpectedValue) -> Self {
        match expected {
            ExpectedValue::Exists(value) => RawExpected {
                value: Some(value),
                exists: None,
            },
            ExpectedValue::NotExists => RawExpected {
                value: None,
                exists: Some(false),
            },
        }
    }
}

impl Item {
    /// Fail with `ConditionalCheckFailed` unless `expected` holds
    ///
    /// With no attribute conditions at all, the item must be a phantom.
    pub fn assert_matches_expected(&self, expected: &Expected) -> Result<()> {
        if expected.is_empty() {
            if self.is_phantom() {
                return Ok(());
            }
            return Err(DbError::ConditionalCheckFailed(
                "The conditional request failed: item already exists".into(),
            ));
        }

        for (name, condition) in expected {
            match condition {
                ExpectedValue::NotExists if self.contains(name) => {
                    return Err(DbError::ConditionalCheckFailed(format!(
                        "The conditional request failed: attribute {} exists",
                        name
                    )));
                }
                ExpectedValue::Exists(value) if self.get(name) != Some(value) => {
                    return Err(DbError::ConditionalCheckFailed(format!(
                        "The conditional request failed: attribute {} does not match",
                        name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
