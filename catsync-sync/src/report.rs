//! Run results and data-quality warnings.

use crate::cursor::SyncMode;
use crate::merger::{MergeDecision, MergeOutcome};
use catsync_types::{Freshness, RecordId};
use serde::Serialize;
use std::fmt;

/// A condition worth a human look that does not fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncWarning {
    /// Stale record differing only in the soft field; prior kept.
    StaleSoftChange {
        id: RecordId,
        prior: Freshness,
        incoming: Freshness,
    },
    /// Stale record with substantive changes; prior kept.
    Desync {
        id: RecordId,
        prior: Freshness,
        incoming: Freshness,
        changed: Vec<String>,
    },
    /// A secondary variant disagreed with its canonical variant and was dropped.
    DivergentVariant {
        id: RecordId,
        field: String,
        secondary: String,
        value: String,
        canonical: String,
        canonical_value: String,
    },
}

impl SyncWarning {
    /// Hard warnings indicate upstream inconsistency rather than noise.
    #[must_use]
    pub fn is_hard(&self) -> bool {
        matches!(self, SyncWarning::Desync { .. })
    }

    /// Record the warning is about.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        match self {
            SyncWarning::StaleSoftChange { id, .. }
            | SyncWarning::Desync { id, .. }
            | SyncWarning::DivergentVariant { id, .. } => id,
        }
    }
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::StaleSoftChange {
                id,
                prior,
                incoming,
            } => write!(
                f,
                "{id}: stale record ({incoming} < {prior}) with soft change only"
            ),
            SyncWarning::Desync {
                id,
                prior,
                incoming,
                changed,
            } => write!(
                f,
                "{id}: desync, stale record ({incoming} < {prior}) changes {}",
                changed.join(", ")
            ),
            SyncWarning::DivergentVariant {
                id,
                field,
                secondary,
                value,
                canonical,
                canonical_value,
            } => write!(
                f,
                "{id}: {field}.{secondary} {value:?} diverges from {canonical} {canonical_value:?}"
            ),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All pages up to the boundary merged and the snapshot replaced.
    Done,
    /// Upstream failed; nothing was persisted.
    Degraded { reason: String },
}

/// Per-outcome merge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub kept_prior: usize,
}

impl MergeStats {
    /// Total records merged.
    #[must_use]
    pub fn total(&self) -> usize {
        self.added + self.updated + self.unchanged + self.kept_prior
    }
}

/// Result of one [`SyncEngine::run`](crate::SyncEngine::run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub namespace: String,
    /// Mode actually used, after the empty-snapshot fallback.
    pub mode: SyncMode,
    pub outcome: RunOutcome,
    /// Pages fetched successfully.
    pub pages: u32,
    pub stats: MergeStats,
    pub warnings: Vec<SyncWarning>,
    /// Records in the snapshot after the run, or before it when degraded.
    pub records: usize,
}

impl SyncReport {
    pub(crate) fn new(namespace: &str, mode: SyncMode) -> Self {
        Self {
            namespace: namespace.to_string(),
            mode,
            outcome: RunOutcome::Done,
            pages: 0,
            stats: MergeStats::default(),
            warnings: Vec::new(),
            records: 0,
        }
    }

    /// Returns true if the run completed and persisted its result.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outcome == RunOutcome::Done
    }

    /// Warnings that indicate upstream inconsistency.
    pub fn hard_warnings(&self) -> impl Iterator<Item = &SyncWarning> {
        self.warnings.iter().filter(|w| w.is_hard())
    }

    pub(crate) fn record(&mut self, decision: &MergeDecision) {
        match decision.outcome {
            MergeOutcome::Added => self.stats.added += 1,
            MergeOutcome::Updated => self.stats.updated += 1,
            MergeOutcome::Unchanged => self.stats.unchanged += 1,
            MergeOutcome::KeptPrior(_) => self.stats.kept_prior += 1,
        }
        self.warnings.extend(decision.warnings.iter().cloned());
    }
}
