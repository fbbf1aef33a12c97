//! Storage layer for catsync.
//!
//! Owns the durable `id -> Record` snapshot of every entity-type namespace
//! and the tab-separated exports derived from it.
//!
//! # Architecture
//!
//! - Snapshots are one human-diffable JSON document per namespace, written
//!   with write-to-temp-then-rename so a reader never sees a partial file
//! - Only a completed sync run calls [`SnapshotStore::replace`]
//! - Exports are TSV files with a header row, one row per entity, ascending
//!   numeric id

mod error;
mod export;
mod json_store;
mod memory;

pub use error::{StorageError, StorageResult};
pub use export::ExportTable;
pub use json_store::JsonSnapshotStore;
pub use memory::MemorySnapshotStore;

use catsync_types::Snapshot;
use std::path::Path;

/// Durable mapping from entity id to last-known record, per namespace.
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot for a namespace. A namespace never written yields
    /// an empty snapshot.
    fn load(&self, namespace: &str) -> StorageResult<Snapshot>;

    /// Atomically replaces the snapshot for a namespace.
    fn replace(&self, namespace: &str, snapshot: &Snapshot) -> StorageResult<()>;
}

/// Writes bytes to `path` through a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    use std::io::Write;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let result = std::fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        })
        .map_err(|e| StorageError::io(&temp_path, e))
        .and_then(|()| std::fs::rename(&temp_path, path).map_err(|e| StorageError::io(path, e)));

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}
