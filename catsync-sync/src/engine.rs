//! Sync engine: pages through a source, merges into a working copy, and
//! replaces the durable snapshot only when the whole run succeeded.
//!
//! A run moves through `Start -> Paging -> Done | Degraded`. The durable
//! snapshot is read once at `Start` and written once on entering `Done`;
//! a `Degraded` run leaves it untouched.

use crate::config::EntityConfig;
use crate::cursor::{Boundary, Cursor, SyncMode};
use crate::error::{SyncError, SyncResult};
use crate::merger::ReconciliationMerger;
use crate::report::{RunOutcome, SyncReport};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper, fetch_with_retry};
use crate::source::SourceClient;
use catsync_storage::SnapshotStore;
use catsync_types::{Freshness, RecordId, Snapshot};
use catsync_variants::FallbackChains;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Paging,
    Done,
    Degraded,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "start",
            RunState::Paging => "paging",
            RunState::Done => "done",
            RunState::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Result of the paging phase: either a working copy to commit or the
/// reason the run degraded.
struct Collected {
    working: Option<Snapshot>,
    report: SyncReport,
}

/// Drives one entity type through a source into a snapshot store.
pub struct SyncEngine {
    config: EntityConfig,
    source: Arc<dyn SourceClient>,
    store: Arc<dyn SnapshotStore>,
    merger: ReconciliationMerger,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SyncEngine {
    /// Creates an engine with the default retry policy and the tokio timer.
    pub fn new(
        config: EntityConfig,
        source: Arc<dyn SourceClient>,
        store: Arc<dyn SnapshotStore>,
        chains: Arc<FallbackChains>,
    ) -> Self {
        let merger = ReconciliationMerger::new(config.merge.clone(), chains);
        Self {
            config,
            source,
            store,
            merger,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// Runs one sync.
    ///
    /// Upstream failures end the run as [`RunOutcome::Degraded`] and are
    /// reported, not returned; only local storage failures are errors.
    pub async fn run(&self, mode: SyncMode, page_offset: u32) -> SyncResult<SyncReport> {
        let durable = self.load().await?;
        let collected = self.collect(mode, page_offset, &durable).await;
        self.finish(collected).await
    }

    /// Like [`run`](Self::run), but degrades if paging outlasts `budget`.
    ///
    /// The budget covers fetching only, so an expired run never writes.
    pub async fn run_with_budget(
        &self,
        mode: SyncMode,
        page_offset: u32,
        budget: Duration,
    ) -> SyncResult<SyncReport> {
        let durable = self.load().await?;
        let collected =
            match tokio::time::timeout(budget, self.collect(mode, page_offset, &durable)).await {
                Ok(collected) => collected,
                Err(_) => {
                    warn!(
                        "{}: run exceeded its {}s budget",
                        self.config.namespace,
                        budget.as_secs()
                    );
                    let mut report = SyncReport::new(&self.config.namespace, mode);
                    report.outcome = RunOutcome::Degraded {
                        reason: format!("wall-clock budget of {}s exceeded", budget.as_secs()),
                    };
                    report.records = durable.len();
                    Collected {
                        working: None,
                        report,
                    }
                }
            };
        self.finish(collected).await
    }

    async fn collect(&self, mode: SyncMode, page_offset: u32, durable: &Snapshot) -> Collected {
        let namespace = &self.config.namespace;
        let mut cursor = Cursor::for_run(mode, self.config.ordering, durable, page_offset);
        let mut report = SyncReport::new(namespace, cursor.mode());
        log_boundary(namespace, mode, &cursor);

        let mut working = match cursor.mode() {
            SyncMode::Full => Snapshot::new(),
            SyncMode::Incremental => durable.clone(),
        };
        let mut state = RunState::Paging;
        let mut last: Option<(RecordId, Freshness)> = None;

        while state == RunState::Paging {
            let page = match fetch_with_retry(
                self.source.as_ref(),
                &cursor,
                &self.policy,
                self.sleeper.as_ref(),
            )
            .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("{}: run degraded on page {}: {}", namespace, cursor.page(), e);
                    report.outcome = RunOutcome::Degraded {
                        reason: e.to_string(),
                    };
                    report.records = durable.len();
                    return Collected {
                        working: None,
                        report,
                    };
                }
            };
            report.pages += 1;
            debug!(
                "{}: page {} has {} records",
                namespace,
                page.info.current_page,
                page.records.len()
            );

            let mut reached = false;
            for record in page.records {
                if cursor.reached_boundary(&record) {
                    info!("{}: reached last updated entry {}", namespace, record.id);
                    reached = true;
                    break;
                }
                let id = record.id.clone();
                let decision = self
                    .merger
                    .merge(working.get(&id).or_else(|| durable.get(&id)), record);
                report.record(&decision);
                last = Some((id, decision.record.freshness));
                working.insert(decision.record);
            }

            if reached || !page.info.has_next_page {
                state = RunState::Done;
            } else {
                if let Some((id, freshness)) = &last {
                    info!(
                        "{}: last entry {}{}, next page offset = {}",
                        namespace,
                        id,
                        describe_freshness(*freshness),
                        page.info.current_page
                    );
                }
                cursor.advance_past(page.info.current_page);
            }
        }

        report.records = working.len();
        Collected {
            working: Some(working),
            report,
        }
    }

    async fn finish(&self, collected: Collected) -> SyncResult<SyncReport> {
        let Collected { working, mut report } = collected;
        let Some(working) = working else {
            info!("{}: {}, snapshot left untouched", self.config.namespace, RunState::Degraded);
            return Ok(report);
        };

        self.replace(working).await?;
        report.outcome = RunOutcome::Done;
        info!(
            "{}: {} after {} pages (added {}, updated {}, unchanged {}, kept {}, {} warnings)",
            self.config.namespace,
            RunState::Done,
            report.pages,
            report.stats.added,
            report.stats.updated,
            report.stats.unchanged,
            report.stats.kept_prior,
            report.warnings.len()
        );
        Ok(report)
    }

    async fn load(&self) -> SyncResult<Snapshot> {
        let store = self.store.clone();
        let namespace = self.config.namespace.clone();
        debug!("{}: {}", namespace, RunState::Start);
        tokio::task::spawn_blocking(move || store.load(&namespace))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
            .map_err(SyncError::from)
    }

    async fn replace(&self, snapshot: Snapshot) -> SyncResult<()> {
        let store = self.store.clone();
        let namespace = self.config.namespace.clone();
        tokio::task::spawn_blocking(move || store.replace(&namespace, &snapshot))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
            .map_err(SyncError::from)
    }
}

fn log_boundary(namespace: &str, requested: SyncMode, cursor: &Cursor) {
    match cursor.boundary() {
        Boundary::Id(id) => info!("{}: last entry ID = {}", namespace, id),
        Boundary::Freshness(freshness) => {
            info!("{}: last updated entry{}", namespace, describe_freshness(*freshness));
        }
        Boundary::None if requested == SyncMode::Incremental => {
            info!("{}: snapshot is empty, running a full sync", namespace);
        }
        Boundary::None => info!("{}: full sync from page {}", namespace, cursor.page()),
    }
}

fn describe_freshness(freshness: Freshness) -> String {
    if freshness.is_unknown() {
        return String::new();
    }
    match chrono::DateTime::from_timestamp(freshness.value(), 0) {
        Some(at) => format!(", updated at {}", at.to_rfc3339()),
        None => format!(", freshness {freshness}"),
    }
}
