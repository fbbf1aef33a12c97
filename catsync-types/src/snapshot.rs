//! Per-namespace snapshot of last-known records.
//!
//! Serialized as a JSON object keyed by the id's string form, iterated in
//! [`RecordId`] order so that numeric ids appear ascending (`"9"` before
//! `"10"`). Reading a snapshot back yields the same mapping.

use crate::{Freshness, Record, RecordId};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Durable `id -> Record` mapping for one entity-type namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: BTreeMap<RecordId, Record>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for an id.
    #[must_use]
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Inserts a record, returning the previous one for the same id.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.id.clone(), record)
    }

    /// Removes a record.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        self.records.remove(id)
    }

    /// Returns true if the snapshot holds a record for the id.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records in ascending id order.
    pub fn iter(&self) -> btree_map::Values<'_, RecordId, Record> {
        self.records.values()
    }

    /// Iterates ids in ascending order.
    pub fn ids(&self) -> btree_map::Keys<'_, RecordId, Record> {
        self.records.keys()
    }

    /// Highest id present, if any.
    #[must_use]
    pub fn max_id(&self) -> Option<&RecordId> {
        self.records.keys().next_back()
    }

    /// Highest freshness present, if any.
    #[must_use]
    pub fn max_freshness(&self) -> Option<Freshness> {
        self.records.values().map(|r| r.freshness).max()
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl IntoIterator for Snapshot {
    type Item = Record;
    type IntoIter = btree_map::IntoValues<RecordId, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for (id, record) in &self.records {
            map.serialize_entry(&id.to_string(), record)?;
        }
        map.end()
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = Snapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of record ids to records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Snapshot, A::Error> {
        let mut snapshot = Snapshot::new();
        while let Some((key, record)) = access.next_entry::<String, Record>()? {
            if RecordId::parse(&key) != record.id {
                return Err(de::Error::custom(format!(
                    "snapshot key {key} holds record {}",
                    record.id
                )));
            }
            snapshot.insert(record);
        }
        Ok(snapshot)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SnapshotVisitor)
    }
}
