//! Catalog synchronization for catsync.
//!
//! Mirrors a paged, rate-limited upstream catalog into a local snapshot:
//!
//! - [`SyncEngine`] pages through a [`SourceClient`] in full or incremental
//!   mode and replaces the snapshot only when every page succeeded
//! - [`ReconciliationMerger`] decides per record whether the incoming or
//!   the prior version survives
//! - [`export_snapshot`] renders a snapshot as a TSV-ready table and
//!   [`ChangeSetBuilder`] diffs it against a downstream mirror
//!
//! Two sources are provided: [`CatalogClient`] for the GraphQL catalog and
//! [`TripleStoreSource`] for SPARQL label queries.

mod catalog;
mod changeset;
mod config;
mod cursor;
mod engine;
mod error;
mod merger;
mod present;
mod report;
mod retry;
mod source;
mod triple_store;

pub use catalog::{CatalogClient, CatalogConfig, parse_page};
pub use changeset::{ChangeEntry, ChangeKind, ChangeSet, ChangeSetBuilder, WithdrawalPolicy};
pub use config::{
    BoundaryOrdering, EntityConfig, PROXY_HEADERS_VAR, PROXY_PREFIX_VAR, RecordMapping,
    SourceSettings,
};
pub use cursor::{Boundary, Cursor, SortKey, SyncMode};
pub use engine::{RunState, SyncEngine};
pub use error::{FetchError, SyncError, SyncResult};
pub use merger::{
    DivergenceRule, KeepReason, MergeDecision, MergeOutcome, MergePolicy, ReconciliationMerger,
};
pub use present::{
    CellFn, Classifier, ColumnPresenter, MediaFormatClassifier, Presenter, StaffClassifier,
    export_snapshot,
};
pub use report::{MergeStats, RunOutcome, SyncReport, SyncWarning};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper, fetch_with_retry};
pub use source::{Page, PageInfo, SourceClient};
pub use triple_store::{
    Binding, BindingGrouping, BindingRow, CHINESE_TITLES_QUERY, TripleStoreClient,
    TripleStoreConfig, TripleStoreSource, parse_freshness,
};
