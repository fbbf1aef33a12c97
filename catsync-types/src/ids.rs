//! Record identifiers.
//!
//! Upstream catalogs hand out integer ids, the triple store hands them out as
//! strings. A string made only of digits is normalized to the numeric form so
//! that `"42"` and `42` name the same record.

use crate::Error;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Stable external identifier of a record, unique within one namespace.
///
/// Numeric ids order numerically and sort before textual ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Integer id, as issued by the catalog API.
    Numeric(u64),
    /// Any other opaque id.
    Text(String),
}

impl RecordId {
    /// Parses an id, preferring the numeric form when it round-trips exactly.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) if n.to_string() == s => Self::Numeric(n),
            _ => Self::Text(s.to_string()),
        }
    }

    /// Extracts an id from a JSON scalar (number or string).
    pub fn from_json(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(Self::Numeric)
                .ok_or_else(|| Error::InvalidRecordId(n.to_string())),
            Value::String(s) if !s.is_empty() => Ok(Self::parse(s)),
            other => Err(Error::InvalidRecordId(other.to_string())),
        }
    }

    /// Returns the numeric value, if this id is numeric.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::InvalidRecordId("empty id".to_string()));
        }
        Ok(Self::parse(s))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Numeric(n) => serializer.serialize_u64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

struct RecordIdVisitor;

impl Visitor<'_> for RecordIdVisitor {
    type Value = RecordId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a non-empty string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
        Ok(RecordId::Numeric(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
        u64::try_from(v)
            .map(RecordId::Numeric)
            .map_err(|_| E::custom(format!("negative record id: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
        if v.is_empty() {
            return Err(E::custom("empty record id"));
        }
        Ok(RecordId::parse(v))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RecordIdVisitor)
    }
}
