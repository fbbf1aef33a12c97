//! Paging position and stop boundary of one sync run.

use crate::config::BoundaryOrdering;
use catsync_types::{Freshness, Record, RecordId, Snapshot};
use std::fmt;
use std::str::FromStr;

/// Whether a run walks the whole catalog or stops at already-known entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Walk every page, ascending id, and rebuild the snapshot.
    Full,
    /// Walk newest-first and stop at the boundary from the snapshot.
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Incremental => write!(f, "incremental"),
        }
    }
}

impl serde::Serialize for SyncMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(SyncMode::Full),
            "incremental" => Ok(SyncMode::Incremental),
            other => Err(format!("unknown sync mode: {other}")),
        }
    }
}

/// Upstream sort order requested for each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Ascending id.
    IdAsc,
    /// Descending id, newest entries first.
    IdDesc,
    /// Descending last-modified time.
    FreshnessDesc,
}

impl SortKey {
    /// The sort enum literal understood by the catalog's query language.
    #[must_use]
    pub fn as_graphql(&self) -> &'static str {
        match self {
            SortKey::IdAsc => "ID",
            SortKey::IdDesc => "ID_DESC",
            SortKey::FreshnessDesc => "UPDATED_AT_DESC",
        }
    }
}

/// Where an incremental run stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// Walk until upstream runs out of pages.
    None,
    /// Stop at the first record whose id is not above this one.
    Id(RecordId),
    /// Stop at the first record strictly older than this.
    Freshness(Freshness),
}

/// Paging state of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    mode: SyncMode,
    sort: SortKey,
    boundary: Boundary,
    page: u32,
}

impl Cursor {
    /// Cursor of a full run starting after `page_offset` pages.
    #[must_use]
    pub fn full(page_offset: u32) -> Self {
        Self {
            mode: SyncMode::Full,
            sort: SortKey::IdAsc,
            boundary: Boundary::None,
            page: page_offset.saturating_add(1),
        }
    }

    /// Cursor of an incremental run whose boundary comes from `snapshot`.
    ///
    /// An empty snapshot has no boundary, so the run falls back to a full
    /// cursor.
    #[must_use]
    pub fn incremental(ordering: BoundaryOrdering, snapshot: &Snapshot, page_offset: u32) -> Self {
        let boundary = match ordering {
            BoundaryOrdering::ById => snapshot.max_id().cloned().map(Boundary::Id),
            BoundaryOrdering::ByFreshness => snapshot.max_freshness().map(Boundary::Freshness),
        };
        let Some(boundary) = boundary else {
            return Self::full(page_offset);
        };
        let sort = match ordering {
            BoundaryOrdering::ById => SortKey::IdDesc,
            BoundaryOrdering::ByFreshness => SortKey::FreshnessDesc,
        };
        Self {
            mode: SyncMode::Incremental,
            sort,
            boundary,
            page: page_offset.saturating_add(1),
        }
    }

    /// Cursor for a run in the given mode.
    #[must_use]
    pub fn for_run(
        mode: SyncMode,
        ordering: BoundaryOrdering,
        snapshot: &Snapshot,
        page_offset: u32,
    ) -> Self {
        match mode {
            SyncMode::Full => Self::full(page_offset),
            SyncMode::Incremental => Self::incremental(ordering, snapshot, page_offset),
        }
    }

    /// Effective mode after the empty-snapshot fallback.
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    #[must_use]
    pub fn sort(&self) -> SortKey {
        self.sort
    }

    #[must_use]
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// One-based page to request next.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Moves to the page after `current_page`.
    pub fn advance_past(&mut self, current_page: u32) {
        self.page = current_page.saturating_add(1);
    }

    /// Returns true if `record` is already covered by the snapshot.
    #[must_use]
    pub fn reached_boundary(&self, record: &Record) -> bool {
        match &self.boundary {
            Boundary::None => false,
            Boundary::Id(last) => record.id <= *last,
            Boundary::Freshness(last) => record.freshness < *last,
        }
    }
}
