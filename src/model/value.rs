//! Attribute values
//!
//! The six value kinds an item attribute can hold, encoded the way DynamoDB
//! JSON encodes them: `{"S": "text"}`, `{"N": "42"}`, `{"B": "<base64>"}`,
//! `{"SS": [...]}`, `{"NS": [...]}`, `{"BS": [...]}`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DbError, Result};

// =============================================================================
// Number
// =============================================================================

/// A DynamoDB number: decimal text compared by exact decimal value
///
/// The original text is kept for output; ordering and equality use the
/// parsed decimal so that `"1"`, `"1.0"` and `"+1"` are the same number.
#[derive(Debug, Clone)]
pub struct Number {
    text: String,
    value: BigDecimal,
}

/// Most significant digits a number may carry
const MAX_NUMBER_DIGITS: usize = 38;

/// Largest and smallest decimal exponent of a non-zero number
const MAX_MAGNITUDE: i64 = 125;
const MIN_MAGNITUDE: i64 = -130;

impl Number {
    /// Parse decimal text (optional sign, fraction and exponent)
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let valid_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));

        if trimmed.is_empty() || !valid_chars {
            return Err(not_numeric(text));
        }

        let value = BigDecimal::from_str(trimmed).map_err(|_| not_numeric(text))?;
        Self::checked(trimmed.to_string(), value)
    }

    /// The decimal text as supplied
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Exact sum of two numbers
    pub fn checked_add(&self, other: &Number) -> Result<Number> {
        let sum = &self.value + &other.value;
        Self::checked(render(&sum), sum)
    }

    /// Encoded size: one byte per two significant digits, plus one
    pub fn encoded_size(&self) -> usize {
        let digits = significant_digits(&self.text);
        (digits + 1) / 2 + 1
    }

    fn checked(text: String, value: BigDecimal) -> Result<Self> {
        if significant_digits(&text) > MAX_NUMBER_DIGITS {
            return Err(DbError::Validation(format!(
                "Attempting to store more than {} significant digits in a Number: {}",
                MAX_NUMBER_DIGITS, text
            )));
        }

        if value != BigDecimal::from(0) {
            let (mantissa, scale) = value.normalized().as_bigint_and_exponent();
            let digits = mantissa.to_string().trim_start_matches('-').len() as i64;
            let magnitude = digits - 1 - scale;
            if magnitude > MAX_MAGNITUDE {
                return Err(DbError::Validation(format!(
                    "Number overflow. Attempting to store a number with magnitude larger than supported range: {}",
                    text
                )));
            }
            if magnitude < MIN_MAGNITUDE {
                return Err(DbError::Validation(format!(
                    "Number underflow. Attempting to store a number with magnitude smaller than supported range: {}",
                    text
                )));
            }
        }

        Ok(Self { text, value })
    }
}

fn not_numeric(text: &str) -> DbError {
    DbError::Validation(format!(
        "The parameter cannot be converted to a numeric value: {}",
        text
    ))
}

/// Plain decimal text without exponent or trailing fractional zeros
fn render(value: &BigDecimal) -> String {
    let (_, scale) = value.as_bigint_and_exponent();
    let value = if scale < 0 { value.with_scale(0) } else { value.clone() };
    let text = value.to_string();
    if text.contains('.') && !text.contains(['e', 'E']) {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Count significant digits of the mantissa (leading and trailing zeros dropped)
fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or("");
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let trimmed = digits.trim_start_matches('0').trim_end_matches('0');
    trimmed.len().max(1)
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self {
            text: value.to_string(),
            value: BigDecimal::from(value),
        }
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::from(value as i64)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Self {
            text: value.to_string(),
            value: BigDecimal::from(value),
        }
    }
}

impl TryFrom<&str> for Number {
    type Error = DbError;

    fn try_from(text: &str) -> Result<Self> {
        Number::parse(text)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Number::parse(&text).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// AttributeValue
// =============================================================================

/// A typed attribute value; exactly one kind is populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    #[serde(rename = "S")]
    S(String),

    /// Number
    #[serde(rename = "N")]
    N(Number),

    /// Binary
    #[serde(
        rename = "B",
        serialize_with = "base64_codec::serialize",
        deserialize_with = "base64_codec::deserialize"
    )]
    B(Bytes),

    /// String set
    #[serde(rename = "SS")]
    SS(Vec<String>),

    /// Number set
    #[serde(rename = "NS")]
    NS(Vec<Number>),

    /// Binary set
    #[serde(
        rename = "BS",
        serialize_with = "base64_codec::serialize_set",
        deserialize_with = "base64_codec::deserialize_set"
    )]
    BS(Vec<Bytes>),
}

impl AttributeValue {
    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    pub fn s(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    pub fn n(value: impl Into<Number>) -> Self {
        AttributeValue::N(value.into())
    }

    pub fn b(value: impl Into<Bytes>) -> Self {
        AttributeValue::B(value.into())
    }

    pub fn ss<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        AttributeValue::SS(values.into_iter().map(Into::into).collect())
    }

    pub fn ns<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Number>,
    {
        AttributeValue::NS(values.into_iter().map(Into::into).collect())
    }

    pub fn bs<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        AttributeValue::BS(values.into_iter().map(Into::into).collect())
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Wire type tag ("S", "N", "B", "SS", "NS", "BS")
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::SS(_) => "SS",
            AttributeValue::NS(_) => "NS",
            AttributeValue::BS(_) => "BS",
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(
            self,
            AttributeValue::SS(_) | AttributeValue::NS(_) | AttributeValue::BS(_)
        )
    }

    /// Encoded byte length of the value (attribute name not included)
    pub fn size(&self) -> usize {
        match self {
            AttributeValue::S(s) => s.len(),
            AttributeValue::N(n) => n.encoded_size(),
            AttributeValue::B(b) => b.len(),
            AttributeValue::SS(values) => values.iter().map(|v| v.len() + 1).sum(),
            AttributeValue::NS(values) => values.iter().map(|v| v.encoded_size() + 1).sum(),
            AttributeValue::BS(values) => values.iter().map(|v| v.len() + 1).sum(),
        }
    }

    /// Check the set invariants: non-empty, unique elements
    pub fn validate(&self) -> Result<()> {
        let (len, unique) = match self {
            AttributeValue::S(_) | AttributeValue::N(_) | AttributeValue::B(_) => return Ok(()),
            AttributeValue::SS(values) => (values.len(), unique_count(values)),
            AttributeValue::NS(values) => (values.len(), unique_count(values)),
            AttributeValue::BS(values) => (values.len(), unique_count(values)),
        };

        if len == 0 {
            return Err(DbError::Validation(format!(
                "An {} set may not be empty",
                self.type_name()
            )));
        }
        if unique != len {
            return Err(DbError::Validation(format!(
                "Input collection {} contains duplicates",
                self.type_name()
            )));
        }
        Ok(())
    }

    /// Order two scalars of the same kind; `None` for sets or mixed kinds
    pub fn compare(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
            (AttributeValue::N(a), AttributeValue::N(b)) => Some(a.cmp(b)),
            (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Prefix test for strings and binaries
    pub fn begins_with(&self, prefix: &AttributeValue) -> bool {
        match (self, prefix) {
            (AttributeValue::S(s), AttributeValue::S(p)) => s.starts_with(p.as_str()),
            (AttributeValue::B(b), AttributeValue::B(p)) => b.starts_with(p),
            _ => false,
        }
    }

    /// Substring test for strings/binaries, membership test for sets
    pub fn contains(&self, needle: &AttributeValue) -> bool {
        match (self, needle) {
            (AttributeValue::S(s), AttributeValue::S(n)) => s.contains(n.as_str()),
            (AttributeValue::B(b), AttributeValue::B(n)) => {
                n.is_empty() || b.windows(n.len()).any(|w| w == &n[..])
            }
            (AttributeValue::SS(set), AttributeValue::S(n)) => set.contains(n),
            (AttributeValue::NS(set), AttributeValue::N(n)) => set.contains(n),
            (AttributeValue::BS(set), AttributeValue::B(n)) => set.contains(n),
            _ => false,
        }
    }
}

fn unique_count<T: Ord>(values: &[T]) -> usize {
    let mut refs: Vec<&T> = values.iter().collect();
    refs.sort();
    refs.dedup();
    refs.len()
}

/// Order-independent equality for sets
fn same_elements<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|item| b.contains(item))
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::S(a), AttributeValue::S(b)) => a == b,
            (AttributeValue::N(a), AttributeValue::N(b)) => a == b,
            (AttributeValue::B(a), AttributeValue::B(b)) => a == b,
            (AttributeValue::SS(a), AttributeValue::SS(b)) => same_elements(a, b),
            (AttributeValue::NS(a), AttributeValue::NS(b)) => same_elements(a, b),
            (AttributeValue::BS(a), AttributeValue::BS(b)) => same_elements(a, b),
            _ => false,
        }
    }
}

// =============================================================================
// Base64 encoding for binary values
// =============================================================================

mod base64_codec {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize_set<S: Serializer>(
        values: &Vec<Bytes>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| STANDARD.encode(v)))
    }

    pub fn deserialize_set<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Bytes>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| {
                STANDARD
                    .decode(text.as_bytes())
                    .map(Bytes::from)
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
