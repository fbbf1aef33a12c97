//! JSON-file snapshot store.

use crate::{write_atomic, SnapshotStore, StorageError, StorageResult};
use catsync_types::Snapshot;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stores each namespace as `<dir>/<namespace>.json`, tab-indented with
/// sorted keys.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    /// Opens (or creates) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document backing a namespace.
    #[must_use]
    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    /// Serializes a snapshot exactly as it is persisted.
    pub fn encode(snapshot: &Snapshot) -> StorageResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
        snapshot.serialize(&mut serializer)?;
        Ok(out)
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self, namespace: &str) -> StorageResult<Snapshot> {
        let path = self.path_for(namespace);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot for {} at {:?}, starting empty", namespace, path);
                return Ok(Snapshot::new());
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        debug!("Loaded {} records for {}", snapshot.len(), namespace);
        Ok(snapshot)
    }

    fn replace(&self, namespace: &str, snapshot: &Snapshot) -> StorageResult<()> {
        let path = self.path_for(namespace);
        write_atomic(&path, &Self::encode(snapshot)?)?;
        info!("Wrote {} records for {} to {:?}", snapshot.len(), namespace, path);
        Ok(())
    }
}
