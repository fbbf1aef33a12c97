//! Source-supplied freshness markers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Version marker supplied by the source, used as the sole authority for
/// "is this record newer".
///
/// For the catalog API this is the `updatedAt` unix timestamp in seconds.
/// Sources that expose no marker report [`Freshness::UNKNOWN`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Freshness(i64);

impl Freshness {
    /// Marker for sources that do not report freshness.
    pub const UNKNOWN: Self = Self(0);

    /// Creates a freshness marker from a raw value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Returns true if the source did not report a marker.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.0 == 0
    }

    /// Extracts a marker from a JSON value. `null` maps to `UNKNOWN`.
    pub fn from_json(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Null => Ok(Self::UNKNOWN),
            Value::Number(n) => n
                .as_i64()
                .map(Self)
                .ok_or_else(|| crate::Error::InvalidFreshness(n.to_string())),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Self)
                .map_err(|_| crate::Error::InvalidFreshness(s.clone())),
            other => Err(crate::Error::InvalidFreshness(other.to_string())),
        }
    }
}

impl From<i64> for Freshness {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
