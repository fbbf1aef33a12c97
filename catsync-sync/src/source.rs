//! Upstream page sources.

use crate::cursor::Cursor;
use crate::error::FetchError;
use async_trait::async_trait;
use catsync_types::Record;

/// Paging metadata returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// One-based index of the page that was served.
    pub current_page: u32,
    /// Whether upstream has more pages after this one.
    pub has_next_page: bool,
}

/// One page of records in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub info: PageInfo,
}

/// A paged, rate-limited upstream catalog.
///
/// Implementations perform exactly one round-trip per call and classify
/// failures; retrying is the caller's concern.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetches the page the cursor points at.
    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, FetchError>;
}
