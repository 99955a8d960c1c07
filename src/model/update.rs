//! Attribute update directives
//!
//! UpdateItem carries one directive per attribute: replace the value, add to
//! a number or set, or delete the attribute (or some of its set elements).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::value::AttributeValue;
use crate::error::{DbError, Result};

/// Directives keyed by attribute name
pub type AttributeUpdates = HashMap<String, UpdateAction>;

/// A single attribute update directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUpdate", into = "RawUpdate")]
pub enum UpdateAction {
    /// Replace the attribute value
    Put(AttributeValue),

    /// Numeric addition, or set union; creates the attribute if absent
    Add(AttributeValue),

    /// Remove the attribute, or only the given set elements
    Delete(Option<AttributeValue>),
}

impl UpdateAction {
    fn check(&self) -> Result<()> {
        match self {
            UpdateAction::Put(value) => value.validate(),
            UpdateAction::Add(value) => {
                if !matches!(value, AttributeValue::N(_)) && !value.is_set() {
                    return Err(DbError::Validation(format!(
                        "One or more parameter values were invalid: ADD action is not supported for the type {}",
                        value.type_name()
                    )));
                }
                value.validate()
            }
            UpdateAction::Delete(Some(value)) => {
                if !value.is_set() {
                    return Err(DbError::Validation(format!(
                        "One or more parameter values were invalid: DELETE action with value is not supported for the type {}",
                        value.type_name()
                    )));
                }
                value.validate()
            }
            UpdateAction::Delete(None) => Ok(()),
        }
    }
}

// =============================================================================
// Wire shape
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum ActionKind {
    #[default]
    Put,
    Add,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawUpdate {
    #[serde(default)]
    action: ActionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<AttributeValue>,
}

impl TryFrom<RawUpdate> for UpdateAction {
    type Error = DbError;

    fn try_from(raw: RawUpdate) -> Result<Self> {
        let action = match (raw.action, raw.value) {
            (ActionKind::Put, Some(value)) => UpdateAction::Put(value),
            (ActionKind::Add, Some(value)) => UpdateAction::Add(value),
            (ActionKind::Delete, value) => UpdateAction::Delete(value),
            (kind, None) => {
                return Err(DbError::Validation(format!(
                    "One or more parameter values were invalid: Only DELETE action is allowed when no attribute value is specified, got {:?}",
                    kind
                )))
            }
        };
        action.check()?;
        Ok(action)
    }
}

impl From<UpdateAction> for RawUpdate {
    fn from(action: UpdateAction) -> Self {
        match action {
            UpdateAction::Put(value) => RawUpdate {
                action: ActionKind::Put,
                value: Some(value),
            },
            UpdateAction::Add(value) => RawUpdate {
                action: ActionKind::Add,
                value: Some(value),
            },
            UpdateAction::Delete(value) => RawUpdate {
                action: ActionKind::Delete,
                value,
            },
        }
    }
}

// =============================================================================
// Application
// =============================================================================

impl Item {
    /// Apply a batch of directives in place
    ///
    /// Key attributes are not known here; the table rejects directives that
    /// target them before calling this.
    pub fn apply_actions(&mut self, actions: &AttributeUpdates) -> Result<()> {
        for (name, action) in actions {
            action.check()?;

            match action {
                UpdateAction::Put(value) => {
                    self.insert(name.clone(), value.clone());
                }
                UpdateAction::Add(value) => {
                    let merged = match self.get(name) {
                        None => value.clone(),
                        Some(existing) => add_values(name, existing, value)?,
                    };
                    self.insert(name.clone(), merged);
                }
                UpdateAction::Delete(None) => {
                    self.remove(name);
                }
                UpdateAction::Delete(Some(value)) => {
                    let Some(existing) = self.get(name) else {
                        continue;
                    };
                    match remove_elements(name, existing, value)? {
                        Some(remaining) => {
                            self.insert(name.clone(), remaining);
                        }
                        None => {
                            self.remove(name);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn type_mismatch(name: &str, existing: &AttributeValue, operand: &AttributeValue) -> DbError {
    DbError::Validation(format!(
        "Type mismatch for attribute {}: stored {}, operand {}",
        name,
        existing.type_name(),
        operand.type_name()
    ))
}

fn union<T: Clone + PartialEq>(existing: &[T], added: &[T]) -> Vec<T> {
    let mut merged = existing.to_vec();
    for value in added {
        if !merged.contains(value) {
            merged.push(value.clone());
        }
    }
    merged
}

fn difference<T: Clone + PartialEq>(existing: &[T], removed: &[T]) -> Vec<T> {
    existing
        .iter()
        .filter(|value| !removed.contains(value))
        .cloned()
        .collect()
}

fn add_values(name: &str, existing: &AttributeValue, added: &AttributeValue) -> Result<AttributeValue> {
    match (existing, added) {
        (AttributeValue::N(a), AttributeValue::N(b)) => Ok(AttributeValue::N(a.checked_add(b)?)),
        (AttributeValue::SS(a), AttributeValue::SS(b)) => Ok(AttributeValue::SS(union(a, b))),
        (AttributeValue::NS(a), AttributeValue::NS(b)) => Ok(AttributeValue::NS(union(a, b))),
        (AttributeValue::BS(a), AttributeValue::BS(b)) => Ok(AttributeValue::BS(union(a, b))),
        _ => Err(type_mismatch(name, existing, added)),
    }
}

/// Remaining set after removal, `None` once the set is empty
fn remove_elements(
    name: &str,
    existing: &AttributeValue,
    removed: &AttributeValue,
) -> Result<Option<AttributeValue>> {
    let remaining = match (existing, removed) {
        (AttributeValue::SS(a), AttributeValue::SS(b)) => AttributeValue::SS(difference(a, b)),
        (AttributeValue::NS(a), AttributeValue::NS(b)) => AttributeValue::NS(difference(a, b)),
        (AttributeValue::BS(a), AttributeValue::BS(b)) => AttributeValue::BS(difference(a, b)),
        _ => return Err(type_mismatch(name, existing, removed)),
    };

    let empty = match &remaining {
        AttributeValue::SS(v) => v.is_empty(),
        AttributeValue::NS(v) => v.is_empty(),
        AttributeValue::BS(v) => v.is_empty(),
        _ => false,
    };

    Ok(if empty { None } else { Some(remaining) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updates(pairs: Vec<(&str, UpdateAction)>) -> AttributeUpdates {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_put_replaces_value() {
        let mut item = Item::new().with("name", AttributeValue::s("old"));
        item.apply_actions(&updates(vec![("name", UpdateAction::Put(AttributeValue::s("new")))]))
            .unwrap();
        assert_eq!(item.get("name"), Some(&AttributeValue::s("new")));
    }

    #[test]
    fn test_add_increments_numbers_and_creates_missing() {
        let mut item = Item::new().with("hits", AttributeValue::n(40));
        item.apply_actions(&updates(vec![
            ("hits", UpdateAction::Add(AttributeValue::n(2))),
            ("fresh", UpdateAction::Add(AttributeValue::n(7))),
        ]))
        .unwrap();
        assert_eq!(item.get("hits"), Some(&AttributeValue::n(42)));
        assert_eq!(item.get("fresh"), Some(&AttributeValue::n(7)));
    }

    #[test]
    fn test_add_unions_sets() {
        let mut item = Item::new().with("tags", AttributeValue::ss(["a", "b"]));
        item.apply_actions(&updates(vec![("tags", UpdateAction::Add(AttributeValue::ss(["b", "c"])))]))
            .unwrap();
        assert_eq!(item.get("tags"), Some(&AttributeValue::ss(["a", "b", "c"])));
    }

    #[test]
    fn test_add_type_mismatch_fails() {
        let mut item = Item::new().with("tags", AttributeValue::ss(["a"]));
        let result = item.apply_actions(&updates(vec![("tags", UpdateAction::Add(AttributeValue::n(1)))]));
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[test]
    fn test_add_rejects_strings() {
        let mut item = Item::new();
        let result = item.apply_actions(&updates(vec![("s", UpdateAction::Add(AttributeValue::s("x")))]));
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_attribute_and_set_elements() {
        let mut item = Item::new()
            .with("gone", AttributeValue::s("x"))
            .with("tags", AttributeValue::ss(["a", "b"]))
            .with("last", AttributeValue::ss(["z"]));

        item.apply_actions(&updates(vec![
            ("gone", UpdateAction::Delete(None)),
            ("tags", UpdateAction::Delete(Some(AttributeValue::ss(["a"])))),
            ("last", UpdateAction::Delete(Some(AttributeValue::ss(["z"])))),
            ("missing", UpdateAction::Delete(Some(AttributeValue::ss(["q"])))),
        ]))
        .unwrap();

        assert!(!item.contains("gone"));
        assert_eq!(item.get("tags"), Some(&AttributeValue::ss(["b"])));
        assert!(!item.contains("last"));
        assert!(!item.contains("missing"));
    }
}
