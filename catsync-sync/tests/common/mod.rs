#![allow(dead_code)]

use async_trait::async_trait;
use catsync_sync::{
    BoundaryOrdering, Cursor, EntityConfig, FetchError, MergePolicy, Page, PageInfo,
    RecordMapping, Sleeper, SourceClient,
};
use catsync_types::Record;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn wait_secs(&self) -> Vec<u64> {
        self.waits().iter().map(Duration::as_secs).collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Replays a fixed list of responses and remembers every cursor it saw.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Page, FetchError>>>,
    cursors: Mutex<Vec<Cursor>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<Page, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            cursors: Mutex::new(Vec::new()),
        })
    }

    pub fn cursors(&self) -> Vec<Cursor> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.cursors().iter().map(Cursor::page).collect()
    }
}

#[async_trait]
impl SourceClient for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, FetchError> {
        self.cursors.lock().unwrap().push(cursor.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Fatal("script exhausted".to_string())))
    }
}

/// Never answers.
pub struct HangingSource;

#[async_trait]
impl SourceClient for HangingSource {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn fetch_page(&self, _cursor: &Cursor) -> Result<Page, FetchError> {
        std::future::pending().await
    }
}

pub fn page(current_page: u32, has_next_page: bool, records: Vec<Record>) -> Result<Page, FetchError> {
    Ok(Page {
        records,
        info: PageInfo {
            current_page,
            has_next_page,
        },
    })
}

pub fn transient() -> Result<Page, FetchError> {
    Err(FetchError::Transient("HTTP 502 Bad Gateway".to_string()))
}

pub fn media(id: u64, updated_at: i64, title: &str) -> Record {
    Record::new(id)
        .with_freshness(updated_at)
        .with_field("title", json!({ "romaji": title }))
}

pub fn entity(ordering: BoundaryOrdering) -> EntityConfig {
    EntityConfig {
        namespace: "media".to_string(),
        list_field: "media".to_string(),
        ordering,
        mapping: RecordMapping::catalog(ordering == BoundaryOrdering::ByFreshness),
        merge: MergePolicy::default(),
        query: "query { }".to_string(),
    }
}
