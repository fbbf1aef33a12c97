//! Fallback-chain tables.

use crate::error::{VariantError, VariantResult};
use std::collections::{BTreeMap, BTreeSet};

/// A static, total table mapping every variant key to an ordered list of
/// alternate keys consulted when its own value is absent.
///
/// Construction validates the table: every referenced key must have a chain
/// of its own, and no chain may list its own key or repeat an entry.
///
/// Lookup walks the declared chain only, one level deep: the chains of the
/// chain's members are never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChains {
    /// Keys in declaration order.
    keys: Vec<String>,
    /// Declared chains.
    chains: BTreeMap<String, Vec<String>>,
}

impl FallbackChains {
    /// Builds and validates a table.
    pub fn new<I, K, C, S>(table: I) -> VariantResult<Self>
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys = Vec::new();
        let mut chains = BTreeMap::new();

        for (key, chain) in table {
            let key = key.into();
            let chain: Vec<String> = chain.into_iter().map(Into::into).collect();

            let mut seen = BTreeSet::new();
            for entry in &chain {
                if *entry == key {
                    return Err(VariantError::SelfReference(key));
                }
                if !seen.insert(entry.as_str()) {
                    return Err(VariantError::DuplicateEntry {
                        key,
                        duplicate: entry.clone(),
                    });
                }
            }

            if chains.insert(key.clone(), chain).is_some() {
                return Err(VariantError::DuplicateKey(key));
            }
            keys.push(key);
        }

        for (key, chain) in &chains {
            if let Some(missing) = chain.iter().find(|entry| !chains.contains_key(*entry)) {
                return Err(VariantError::UnknownKey {
                    key: key.clone(),
                    missing: missing.clone(),
                });
            }
        }

        Ok(Self::assemble(keys, chains))
    }

    /// Builds a table known to be valid.
    pub(crate) fn assemble(keys: Vec<String>, chains: BTreeMap<String, Vec<String>>) -> Self {
        Self { keys, chains }
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Returns true if the key has a chain.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.chains.contains_key(key)
    }

    /// Declared chain for a key: the keys consulted, in order, when its own
    /// value is absent.
    #[must_use]
    pub fn chain(&self, key: &str) -> Option<&[String]> {
        self.chains.get(key).map(Vec::as_slice)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
