//! Variant-map resolution for catsync.
//!
//! A variant map is a sparse mapping from a variant key (a language or region
//! tag) to a value. Two sparse maps can carry the same information through
//! different subsets of keys, so comparisons are always made on the
//! *resolved* map: for every known key, the first present value found by
//! walking the key's fallback chain.
//!
//! - [`FallbackChains`]: validated, immutable chain table
//! - [`resolve`] / [`equivalent`]: pure resolution and comparison
//! - [`chinese`]: the built-in table for Chinese script/region variants
//!
//! # Example
//!
//! ```
//! use catsync_variants::{equivalent, FallbackChains, VariantMap};
//!
//! let chains = FallbackChains::chinese();
//! let a = VariantMap::from([("zh".to_string(), "进击的巨人".to_string())]);
//! let b = VariantMap::from([
//!     ("zh".to_string(), "进击的巨人".to_string()),
//!     ("zh-hans".to_string(), "进击的巨人".to_string()),
//! ]);
//! assert!(equivalent(&a, &b, &chains));
//! ```

mod chains;
pub mod chinese;
mod error;
mod normalize;
mod resolve;

pub use chains::FallbackChains;
pub use error::{VariantError, VariantResult};
pub use normalize::normalize_title;
pub use resolve::{equivalent, resolve, resolve_key, variant_map_from_json, variant_map_to_json};

/// Sparse mapping from variant key to value.
pub type VariantMap = std::collections::BTreeMap<String, String>;
