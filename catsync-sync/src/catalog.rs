//! GraphQL catalog client.
//!
//! One POST per page with `{query, variables: {page, sort}}`. Entries are
//! read from `data.Page.<list>` and paging from `data.Page.pageInfo`.

use crate::config::{EntityConfig, RecordMapping, SourceSettings};
use crate::cursor::Cursor;
use crate::error::{FetchError, SyncError, SyncResult};
use crate::source::{Page, PageInfo, SourceClient};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// GraphQL endpoint (e.g. `https://graphql.anilist.co`).
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://graphql.anilist.co".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Client for one entity type of the catalog.
pub struct CatalogClient {
    config: CatalogConfig,
    settings: SourceSettings,
    namespace: String,
    list_field: String,
    query: String,
    mapping: RecordMapping,
    client: Client,
}

impl CatalogClient {
    /// Creates a client for `entity`.
    pub fn new(
        config: CatalogConfig,
        settings: SourceSettings,
        entity: &EntityConfig,
    ) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            settings,
            namespace: entity.namespace.clone(),
            list_field: entity.list_field.clone(),
            query: entity.query.clone(),
            mapping: entity.mapping.clone(),
            client,
        })
    }

    fn request_body(&self, cursor: &Cursor) -> Value {
        json!({
            "query": self.query,
            "variables": {
                "page": cursor.page(),
                "sort": cursor.sort().as_graphql(),
            },
        })
    }
}

#[async_trait]
impl SourceClient for CatalogClient {
    fn name(&self) -> &str {
        &self.namespace
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, FetchError> {
        let url = self.settings.url(&self.config.endpoint);
        debug!("Fetching {} page {} from {}", self.namespace, cursor.page(), url);

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&self.request_body(cursor));
        for (name, value) in &self.settings.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(
                status,
                response.headers().get(RETRY_AFTER),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Fatal(format!("response is not JSON: {e}")))?;

        parse_page(body, &self.list_field, &self.mapping)
    }
}

/// Extracts records and paging info from a response body.
pub fn parse_page(mut body: Value, list_field: &str, mapping: &RecordMapping) -> Result<Page, FetchError> {
    let Some(page) = body.pointer_mut("/data/Page").and_then(Value::as_object_mut) else {
        return Err(FetchError::Fatal("missing data.Page".to_string()));
    };

    let info = page
        .get("pageInfo")
        .and_then(|info| {
            Some(PageInfo {
                current_page: u32::try_from(info.get("currentPage")?.as_u64()?).ok()?,
                has_next_page: info.get("hasNextPage")?.as_bool()?,
            })
        })
        .ok_or_else(|| FetchError::Fatal("missing or malformed data.Page.pageInfo".to_string()))?;

    let Some(Value::Array(entries)) = page.remove(list_field) else {
        return Err(FetchError::Fatal(format!("missing data.Page.{list_field}")));
    };

    let records = entries
        .into_iter()
        .map(|entry| mapping.to_record(entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page { records, info })
}
