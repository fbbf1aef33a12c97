//! Reconciliation of an incoming record against its prior snapshot entry.
//!
//! The merger decides which version of a record is kept:
//!
//! - no prior: the incoming record is added
//! - incoming not older than prior: replaced if it differs semantically,
//!   otherwise the prior is kept verbatim
//! - incoming older than prior: the prior is always kept, with a soft
//!   warning when only the designated soft field differs and a hard desync
//!   warning otherwise
//!
//! Variant fields are compared after fallback resolution, so a map that only
//! gained or lost a derivable variant is not a change.

use crate::report::SyncWarning;
use catsync_types::{Record, RecordId};
use catsync_variants::{
    equivalent, resolve_key, variant_map_from_json, variant_map_to_json, FallbackChains,
    VariantMap,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// A secondary variant that must agree with a canonical variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceRule {
    /// Variant field the rule applies to.
    pub field: String,
    /// Variant dropped when it diverges.
    pub secondary: String,
    /// Variant the secondary should track.
    pub canonical: String,
    /// Records whose divergence is known to be intentional.
    pub exceptions: BTreeSet<RecordId>,
}

impl DivergenceRule {
    #[must_use]
    pub fn new(field: &str, secondary: &str, canonical: &str) -> Self {
        Self {
            field: field.to_string(),
            secondary: secondary.to_string(),
            canonical: canonical.to_string(),
            exceptions: BTreeSet::new(),
        }
    }

    /// Allows these records to keep a divergent secondary value.
    #[must_use]
    pub fn with_exceptions(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.exceptions.extend(ids);
        self
    }
}

/// Field-level merge configuration of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePolicy {
    /// Fields holding variant maps, compared under fallback resolution.
    pub variant_fields: Vec<String>,
    /// Diff path whose sole change on a stale record is benign
    /// (`"field"` or `"field.variant"`).
    pub soft_field: Option<String>,
    pub divergence: Vec<DivergenceRule>,
}

impl MergePolicy {
    /// Policy for records whose `title` is a Chinese variant map.
    ///
    /// `zh-mo` tracks `zh-hk` and `zh-my` tracks `zh-sg`; a stale record
    /// that only differs in `title.zh-hk` is benign.
    #[must_use]
    pub fn chinese_titles() -> Self {
        Self {
            variant_fields: vec!["title".to_string()],
            soft_field: Some("title.zh-hk".to_string()),
            divergence: vec![
                DivergenceRule::new("title", "zh-mo", "zh-hk"),
                DivergenceRule::new("title", "zh-my", "zh-sg"),
            ],
        }
    }

    fn is_variant_field(&self, name: &str) -> bool {
        self.variant_fields.iter().any(|f| f == name)
    }
}

/// Why a prior record was kept over the incoming one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepReason {
    /// Stale incoming record differing at most in the soft field.
    SpuriousSoftChange,
    /// Stale incoming record with substantive changes.
    Desync { changed: Vec<String> },
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
    /// Incoming is semantically equal; the prior was kept verbatim.
    Unchanged,
    KeptPrior(KeepReason),
}

/// The record to store plus how it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeDecision {
    pub record: Record,
    pub outcome: MergeOutcome,
    pub warnings: Vec<SyncWarning>,
}

/// Stateless record reconciler.
#[derive(Debug, Clone)]
pub struct ReconciliationMerger {
    policy: MergePolicy,
    chains: Arc<FallbackChains>,
}

impl ReconciliationMerger {
    pub fn new(policy: MergePolicy, chains: Arc<FallbackChains>) -> Self {
        Self { policy, chains }
    }

    #[must_use]
    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Decides which version of a record survives.
    pub fn merge(&self, prior: Option<&Record>, mut incoming: Record) -> MergeDecision {
        let Some(prior) = prior else {
            let warnings = self.apply_divergence_rules(&mut incoming);
            return MergeDecision {
                record: incoming,
                outcome: MergeOutcome::Added,
                warnings,
            };
        };

        if incoming.freshness < prior.freshness {
            return self.keep_stale(prior, &incoming);
        }

        let warnings = self.apply_divergence_rules(&mut incoming);
        if self.semantically_equal(prior, &incoming) {
            return MergeDecision {
                record: prior.clone(),
                outcome: MergeOutcome::Unchanged,
                warnings,
            };
        }

        MergeDecision {
            record: incoming,
            outcome: MergeOutcome::Updated,
            warnings,
        }
    }

    fn keep_stale(&self, prior: &Record, incoming: &Record) -> MergeDecision {
        let changed = self.diff_fields(prior, incoming);
        let soft_only = match (changed.as_slice(), &self.policy.soft_field) {
            ([], _) => true,
            ([path], Some(soft)) => path == soft,
            _ => false,
        };

        let (reason, warning) = if soft_only {
            debug!(
                "{}: stale record ({} < {}) differs only in soft field",
                prior.id, incoming.freshness, prior.freshness
            );
            (
                KeepReason::SpuriousSoftChange,
                SyncWarning::StaleSoftChange {
                    id: prior.id.clone(),
                    prior: prior.freshness,
                    incoming: incoming.freshness,
                },
            )
        } else {
            warn!(
                "Desync on {}: stale record ({} < {}) changes {}",
                prior.id,
                incoming.freshness,
                prior.freshness,
                changed.join(", ")
            );
            (
                KeepReason::Desync {
                    changed: changed.clone(),
                },
                SyncWarning::Desync {
                    id: prior.id.clone(),
                    prior: prior.freshness,
                    incoming: incoming.freshness,
                    changed,
                },
            )
        };

        MergeDecision {
            record: prior.clone(),
            outcome: MergeOutcome::KeptPrior(reason),
            warnings: vec![warning],
        }
    }

    /// Structural diff between two records, as sorted field paths.
    ///
    /// Variant fields contribute one `field.variant` path per differing
    /// variant; other fields contribute their name. A differing reference
    /// link contributes `page`.
    #[must_use]
    pub fn diff_fields(&self, a: &Record, b: &Record) -> Vec<String> {
        let mut changed = Vec::new();
        let names: BTreeSet<&String> = a.fields.keys().chain(b.fields.keys()).collect();

        for name in names {
            let (left, right) = (a.fields.get(name), b.fields.get(name));
            if left == right {
                continue;
            }
            if self.policy.is_variant_field(name) {
                if let (Some(left), Some(right)) = (as_variant_map(left), as_variant_map(right)) {
                    let variants: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
                    for variant in variants {
                        if left.get(variant) != right.get(variant) {
                            changed.push(format!("{name}.{variant}"));
                        }
                    }
                    continue;
                }
            }
            changed.push(name.clone());
        }

        if a.page != b.page {
            changed.push("page".to_string());
        }
        changed.sort();
        changed
    }

    /// Equality under fallback resolution of variant fields.
    ///
    /// Freshness is not part of the comparison.
    #[must_use]
    pub fn semantically_equal(&self, a: &Record, b: &Record) -> bool {
        if a.id != b.id || a.page != b.page {
            return false;
        }
        let names: BTreeSet<&String> = a.fields.keys().chain(b.fields.keys()).collect();
        names.into_iter().all(|name| {
            let (left, right) = (a.fields.get(name), b.fields.get(name));
            if left == right {
                return true;
            }
            if !self.policy.is_variant_field(name) {
                return false;
            }
            match (as_variant_map(left), as_variant_map(right)) {
                (Some(left), Some(right)) => equivalent(&left, &right, &self.chains),
                _ => false,
            }
        })
    }

    /// Drops secondary variants that disagree with their canonical variant.
    fn apply_divergence_rules(&self, record: &mut Record) -> Vec<SyncWarning> {
        let mut warnings = Vec::new();
        for rule in &self.policy.divergence {
            if rule.exceptions.contains(&record.id) {
                continue;
            }
            let Some(map) = record.fields.get(&rule.field).and_then(variant_map_from_json) else {
                continue;
            };
            let Some(value) = map.get(&rule.secondary).filter(|v| !v.is_empty()) else {
                continue;
            };

            let mut others = map.clone();
            others.remove(&rule.secondary);
            let Some(canonical_value) = resolve_key(&others, &rule.canonical, &self.chains) else {
                continue;
            };
            if canonical_value == value.as_str() {
                continue;
            }

            warn!(
                "{}: {}.{} {:?} diverges from {} {:?}, dropping it",
                record.id, rule.field, rule.secondary, value, rule.canonical, canonical_value
            );
            warnings.push(SyncWarning::DivergentVariant {
                id: record.id.clone(),
                field: rule.field.clone(),
                secondary: rule.secondary.clone(),
                value: value.clone(),
                canonical: rule.canonical.clone(),
                canonical_value: canonical_value.to_string(),
            });
            record
                .fields
                .insert(rule.field.clone(), variant_map_to_json(&others));
        }
        warnings
    }
}

/// Missing fields read as empty maps so that adding a variant field is a
/// per-variant change.
fn as_variant_map(value: Option<&Value>) -> Option<VariantMap> {
    match value {
        None | Some(Value::Null) => Some(BTreeMap::new()),
        Some(value) => variant_map_from_json(value),
    }
}
