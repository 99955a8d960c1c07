//! Comparison conditions
//!
//! Per-attribute conditions used by query (range key condition) and scan
//! (scan filter). Argument counts and argument types are checked when a
//! [`Condition`] is built, so evaluation itself cannot fail.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::item::Item;
use super::value::AttributeValue;
use crate::error::{DbError, Result};

/// Conditions keyed by attribute name; all must hold
pub type Conditions = HashMap<String, Condition>;

/// Supported comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BeginsWith,
    Between,
    Contains,
    NotContains,
    In,
    Null,
    NotNull,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "EQ",
            ComparisonOperator::Ne => "NE",
            ComparisonOperator::Lt => "LT",
            ComparisonOperator::Le => "LE",
            ComparisonOperator::Gt => "GT",
            ComparisonOperator::Ge => "GE",
            ComparisonOperator::BeginsWith => "BEGINS_WITH",
            ComparisonOperator::Between => "BETWEEN",
            ComparisonOperator::Contains => "CONTAINS",
            ComparisonOperator::NotContains => "NOT_CONTAINS",
            ComparisonOperator::In => "IN",
            ComparisonOperator::Null => "NULL",
            ComparisonOperator::NotNull => "NOT_NULL",
        }
    }

    /// Operators usable as a query range key condition
    pub fn is_range_key_operator(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Eq
                | ComparisonOperator::Lt
                | ComparisonOperator::Le
                | ComparisonOperator::Gt
                | ComparisonOperator::Ge
                | ComparisonOperator::BeginsWith
                | ComparisonOperator::Between
        )
    }

    fn check_arguments(&self, values: &[AttributeValue]) -> Result<()> {
        let expected_count = match self {
            ComparisonOperator::Null | ComparisonOperator::NotNull => Some(0),
            ComparisonOperator::Between => Some(2),
            ComparisonOperator::In => None,
            _ => Some(1),
        };

        match expected_count {
            Some(count) if values.len() != count => {
                return Err(DbError::Validation(format!(
                    "Invalid number of argument(s) for the {} ComparisonOperator: expected {}, got {}",
                    self,
                    count,
                    values.len()
                )));
            }
            None if values.is_empty() => {
                return Err(DbError::Validation(format!(
                    "Invalid number of argument(s) for the {} ComparisonOperator: expected at least 1",
                    self
                )));
            }
            _ => {}
        }

        let scalar_only = !matches!(self, ComparisonOperator::Eq | ComparisonOperator::Ne);
        if scalar_only {
            if let Some(set) = values.iter().find(|v| v.is_set()) {
                return Err(DbError::Validation(format!(
                    "One or more parameter values were invalid: ComparisonOperator {} is not valid for {} AttributeValue type",
                    self,
                    set.type_name()
                )));
            }
        }

        if *self == ComparisonOperator::BeginsWith
            && matches!(values.first(), Some(AttributeValue::N(_)))
        {
            return Err(DbError::Validation(
                "One or more parameter values were invalid: ComparisonOperator BEGINS_WITH is not valid for N AttributeValue type"
                    .into(),
            ));
        }

        if *self == ComparisonOperator::Between {
            let (lo, hi) = (&values[0], &values[1]);
            match lo.compare(hi) {
                None => {
                    return Err(DbError::Validation(
                        "BETWEEN bounds must have the same type".into(),
                    ))
                }
                Some(Ordering::Greater) => {
                    return Err(DbError::Validation(
                        "BETWEEN lower bound is greater than the upper bound".into(),
                    ))
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One comparison: operator plus its argument list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub struct Condition {
    operator: ComparisonOperator,
    values: Vec<AttributeValue>,
}

impl Condition {
    /// Build a condition, checking argument count and types
    pub fn new(operator: ComparisonOperator, values: Vec<AttributeValue>) -> Result<Self> {
        operator.check_arguments(&values)?;
        Ok(Self { operator, values })
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Evaluate against an attribute value; `None` means the attribute is absent
    pub fn evaluate(&self, value: Option<&AttributeValue>) -> bool {
        let value = match (self.operator, value) {
            (ComparisonOperator::Null, v) => return v.is_none(),
            (ComparisonOperator::NotNull, v) => return v.is_some(),
            (_, None) => return false,
            (_, Some(v)) => v,
        };

        let arg = &self.values[0];
        let ordered = |accept: fn(Ordering) -> bool| value.compare(arg).is_some_and(accept);

        match self.operator {
            ComparisonOperator::Eq => value == arg,
            ComparisonOperator::Ne => value != arg,
            ComparisonOperator::Lt => ordered(|o| o == Ordering::Less),
            ComparisonOperator::Le => ordered(|o| o != Ordering::Greater),
            ComparisonOperator::Gt => ordered(|o| o == Ordering::Greater),
            ComparisonOperator::Ge => ordered(|o| o != Ordering::Less),
            ComparisonOperator::BeginsWith => value.begins_with(arg),
            ComparisonOperator::Contains => value.contains(arg),
            ComparisonOperator::NotContains => !value.contains(arg),
            ComparisonOperator::In => self.values.iter().any(|candidate| value == candidate),
            ComparisonOperator::Between => {
                let hi = &self.values[1];
                value.compare(arg).is_some_and(|o| o != Ordering::Less)
                    && value.compare(hi).is_some_and(|o| o != Ordering::Greater)
            }
            ComparisonOperator::Null | ComparisonOperator::NotNull => unreachable!(),
        }
    }
}

/// Wire shape of a condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCondition {
    comparison_operator: ComparisonOperator,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attribute_value_list: Vec<AttributeValue>,
}

impl TryFrom<RawCondition> for Condition {
    type Error = DbError;

    fn try_from(raw: RawCondition) -> Result<Self> {
        Condition::new(raw.comparison_operator, raw.attribute_value_list)
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        RawCondition {
            comparison_operator: condition.operator,
            attribute_value_list: condition.values,
        }
    }
}

// =============================================================================
// Item matching
// =============================================================================

impl Item {
    /// Evaluate one condition against attribute `name`; `None` matches
    pub fn field_matches(&self, name: &str, condition: Option<&Condition>) -> bool {
        match condition {
            Some(condition) => condition.evaluate(self.get(name)),
            None => true,
        }
    }

    /// True if every condition holds; `None` matches everything
    pub fn matches(&self, conditions: Option<&Conditions>) -> bool {
        match conditions {
            Some(conditions) => conditions
                .iter()
                .all(|(name, condition)| condition.evaluate(self.get(name))),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(op: ComparisonOperator, values: Vec<AttributeValue>) -> Condition {
        Condition::new(op, values).unwrap()
    }

    #[test]
    fn test_argument_counts_are_checked() {
        assert!(Condition::new(ComparisonOperator::Eq, vec![]).is_err());
        assert!(Condition::new(ComparisonOperator::Null, vec![AttributeValue::n(1)]).is_err());
        assert!(Condition::new(ComparisonOperator::Between, vec![AttributeValue::n(1)]).is_err());
        assert!(Condition::new(ComparisonOperator::In, vec![]).is_err());
    }

    #[test]
    fn test_ordering_operators_reject_sets() {
        let result = Condition::new(ComparisonOperator::Lt, vec![AttributeValue::ns([1])]);
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[test]
    fn test_numeric_ordering() {
        let gt = cond(ComparisonOperator::Gt, vec![AttributeValue::n(9)]);
        assert!(gt.evaluate(Some(&AttributeValue::n(10))));
        assert!(!gt.evaluate(Some(&AttributeValue::n(9))));
        assert!(!gt.evaluate(Some(&AttributeValue::s("99"))));
        assert!(!gt.evaluate(None));
    }

    #[test]
    fn test_between_is_inclusive() {
        let between = cond(
            ComparisonOperator::Between,
            vec![AttributeValue::n(1), AttributeValue::n(3)],
        );
        assert!(between.evaluate(Some(&AttributeValue::n(1))));
        assert!(between.evaluate(Some(&AttributeValue::n(3))));
        assert!(!between.evaluate(Some(&AttributeValue::n(4))));
    }

    #[test]
    fn test_null_and_not_null() {
        let item = Item::new().with("a", AttributeValue::s("x"));
        let null = cond(ComparisonOperator::Null, vec![]);
        let not_null = cond(ComparisonOperator::NotNull, vec![]);

        assert!(item.field_matches("b", Some(&null)));
        assert!(!item.field_matches("a", Some(&null)));
        assert!(item.field_matches("a", Some(&not_null)));
        assert!(item.field_matches("a", None));
    }

    #[test]
    fn test_contains_on_sets_and_strings() {
        let contains = cond(ComparisonOperator::Contains, vec![AttributeValue::s("b")]);
        assert!(contains.evaluate(Some(&AttributeValue::ss(["a", "b"]))));
        assert!(contains.evaluate(Some(&AttributeValue::s("abc"))));
        assert!(!contains.evaluate(Some(&AttributeValue::s("xyz"))));
    }

    #[test]
    fn test_in_and_begins_with() {
        let in_op = cond(
            ComparisonOperator::In,
            vec![AttributeValue::s("a"), AttributeValue::s("c")],
        );
        assert!(in_op.evaluate(Some(&AttributeValue::s("c"))));
        assert!(!in_op.evaluate(Some(&AttributeValue::s("b"))));

        let prefix = cond(ComparisonOperator::BeginsWith, vec![AttributeValue::s("ord-")]);
        assert!(prefix.evaluate(Some(&AttributeValue::s("ord-17"))));
        assert!(!prefix.evaluate(Some(&AttributeValue::s("inv-17"))));
    }
}
