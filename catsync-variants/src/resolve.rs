//! Resolution of sparse variant maps.

use crate::{FallbackChains, VariantMap};
use serde_json::{Map, Value};

/// Returns the effective value for one key: its own value if present,
/// otherwise the first present value along its declared chain.
///
/// Empty strings count as absent.
#[must_use]
pub fn resolve_key<'a>(map: &'a VariantMap, key: &str, chains: &FallbackChains) -> Option<&'a str> {
    let present = |k: &str| map.get(k).map(String::as_str).filter(|v| !v.is_empty());

    present(key).or_else(|| {
        chains
            .chain(key)
            .unwrap_or_default()
            .iter()
            .find_map(|alt| present(alt))
    })
}

/// Resolves every known key of a sparse map.
///
/// Keys the table does not know are carried over verbatim so that they
/// still take part in equivalence checks.
#[must_use]
pub fn resolve(map: &VariantMap, chains: &FallbackChains) -> VariantMap {
    let mut resolved: VariantMap = chains
        .keys()
        .filter_map(|key| resolve_key(map, key, chains).map(|v| (key.to_string(), v.to_string())))
        .collect();

    for (key, value) in map {
        if !chains.contains(key) && !value.is_empty() {
            resolved.insert(key.clone(), value.clone());
        }
    }

    resolved
}

/// True iff both maps resolve to the same values.
#[must_use]
pub fn equivalent(a: &VariantMap, b: &VariantMap, chains: &FallbackChains) -> bool {
    a == b || resolve(a, chains) == resolve(b, chains)
}

/// Reads a variant map from a JSON object, keeping string values only.
///
/// Returns `None` if the value is not an object.
#[must_use]
pub fn variant_map_from_json(value: &Value) -> Option<VariantMap> {
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}

/// Writes a variant map as a JSON object.
#[must_use]
pub fn variant_map_to_json(map: &VariantMap) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
    )
}
