//! Entity records.

use crate::{Freshness, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An entity snapshot as last observed from a source.
///
/// `fields` holds the semantic attributes: flat scalars, nested objects, or
/// variant maps (`{"zh": .., "zh-hk": ..}`). Keys are kept sorted so the
/// persisted form is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable external identifier.
    pub id: RecordId,
    /// Source-supplied version marker.
    #[serde(default)]
    pub freshness: Freshness,
    /// Semantic attributes.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Optional reference link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl Record {
    /// Creates an empty record with unknown freshness.
    #[must_use]
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            freshness: Freshness::UNKNOWN,
            fields: BTreeMap::new(),
            page: None,
        }
    }

    /// Sets the freshness marker.
    #[must_use]
    pub fn with_freshness(mut self, freshness: impl Into<Freshness>) -> Self {
        self.freshness = freshness.into();
        self
    }

    /// Sets a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Sets the reference link.
    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Returns a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Resolves an RFC 6901 JSON pointer against the record's fields.
    ///
    /// The first path segment selects the field, the rest walks into it.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let rest = pointer.strip_prefix('/')?;
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let value = self.fields.get(head)?;
        match tail {
            Some(tail) => value.pointer(&format!("/{tail}")),
            None => Some(value),
        }
    }
}
