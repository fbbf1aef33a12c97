//! Error types for fallback-chain construction.

use thiserror::Error;

/// Result type for variant operations.
pub type VariantResult<T> = Result<T, VariantError>;

/// Errors raised while validating a fallback-chain table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariantError {
    /// A chain references a key that has no chain of its own.
    #[error("chain for {key} references unknown key {missing}")]
    UnknownKey { key: String, missing: String },

    /// A chain lists its own key.
    #[error("chain for {0} refers back to itself")]
    SelfReference(String),

    /// A chain lists the same key twice.
    #[error("chain for {key} lists {duplicate} more than once")]
    DuplicateEntry { key: String, duplicate: String },

    /// The same key was given two chains.
    #[error("key {0} defined more than once")]
    DuplicateKey(String),
}
