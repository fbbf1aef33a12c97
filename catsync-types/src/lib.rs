//! Core type definitions for catsync.
//!
//! This crate defines the types shared by every stage of a catalog sync:
//! - Record identifiers that may be numeric or textual
//! - Freshness markers supplied by the upstream source
//! - Records and the per-namespace snapshot mapping `id -> Record`
//!
//! Presentation rows and changesets live in `catsync-sync`; nothing here
//! performs I/O.

mod freshness;
mod ids;
mod record;
mod snapshot;

pub use freshness::Freshness;
pub use ids::RecordId;
pub use record::Record;
pub use snapshot::Snapshot;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("invalid freshness: {0}")]
    InvalidFreshness(String),
}
