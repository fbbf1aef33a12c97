//! In-memory snapshot store (for testing).

use crate::{SnapshotStore, StorageResult};
use catsync_types::Snapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot store that keeps everything in memory and counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshots: HashMap<String, Snapshot>,
    writes: usize,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one namespace.
    #[must_use]
    pub fn with_snapshot(namespace: &str, snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.lock().snapshots.insert(namespace.to_string(), snapshot);
        store
    }

    /// Number of successful `replace` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoning is ignored: entries are only ever whole snapshots.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, namespace: &str) -> StorageResult<Snapshot> {
        Ok(self
            .lock()
            .snapshots
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    fn replace(&self, namespace: &str, snapshot: &Snapshot) -> StorageResult<()> {
        let mut inner = self.lock();
        inner.snapshots.insert(namespace.to_string(), snapshot.clone());
        inner.writes += 1;
        Ok(())
    }
}
