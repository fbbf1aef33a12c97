//! Triple-store (SPARQL) client and binding grouping.
//!
//! The store returns one row per `(entity, language)`. [`BindingGrouping`]
//! folds those rows into one [`Record`] per entity whose label field is a
//! variant map keyed by language code. [`TripleStoreSource`] exposes a query
//! as a single-page [`SourceClient`] so it runs through the same engine as
//! the catalog.

use crate::cursor::Cursor;
use crate::error::{FetchError, SyncError, SyncResult};
use crate::source::{Page, PageInfo, SourceClient};
use async_trait::async_trait;
use catsync_types::{Freshness, Record, RecordId};
use catsync_variants::chinese::to_wiki_code;
use catsync_variants::normalize_title;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleStoreConfig {
    pub endpoint: String,
    /// The public endpoint rejects requests without a descriptive agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for TripleStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://query.wikidata.org/sparql".to_string(),
            user_agent: "AcgServiceBot/0.1 (https://github.com/Func86/anilist-wikidata)".to_string(),
            timeout_secs: 300,
        }
    }
}

/// One bound value of a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// `uri`, `literal` or `bnode`.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// One result row, keyed by variable name. Unbound variables are absent.
pub type BindingRow = BTreeMap<String, Binding>;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: QueryResults,
}

#[derive(Debug, Deserialize)]
struct QueryResults {
    bindings: Vec<BindingRow>,
}

/// Client for a SPARQL 1.1 endpoint.
pub struct TripleStoreClient {
    config: TripleStoreConfig,
    client: Client,
}

impl TripleStoreClient {
    pub fn new(config: TripleStoreConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Runs a SELECT query and returns its result rows.
    pub async fn query(&self, query: &str) -> Result<Vec<BindingRow>, FetchError> {
        debug!("Querying {}", self.config.endpoint);
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/sparql-query")
            .header(ACCEPT, "application/sparql-results+json")
            .header(USER_AGENT, &self.config.user_agent)
            .body(query.to_string())
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
        let body: QueryResponse = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Fatal(format!("malformed query results: {e}")))?;
        info!("Query returned {} rows", body.results.bindings.len());
        Ok(body.results.bindings)
    }
}

/// How result rows fold into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingGrouping {
    /// Variable holding the entity id.
    pub id_var: String,
    /// Variable holding the label's language; falls back to the label's
    /// own `xml:lang`.
    pub lang_var: Option<String>,
    /// Variable holding the label.
    pub label_var: String,
    /// Record field the variant map is stored under.
    pub label_field: String,
    pub page_var: Option<String>,
    pub freshness_var: Option<String>,
}

impl Default for BindingGrouping {
    fn default() -> Self {
        Self {
            id_var: "animeId".to_string(),
            lang_var: Some("lang".to_string()),
            label_var: "title".to_string(),
            label_field: "title".to_string(),
            page_var: Some("page".to_string()),
            freshness_var: Some("modified".to_string()),
        }
    }
}

impl BindingGrouping {
    /// Groups rows by id, in ascending id order.
    ///
    /// Languages are mapped to wiki codes where known, labels are
    /// normalized, the last bound page wins and freshness is the maximum
    /// seen. Rows without an id are an error.
    pub fn group(&self, rows: &[BindingRow]) -> Result<Vec<Record>, FetchError> {
        let mut grouped: BTreeMap<RecordId, (Record, Map<String, Value>)> = BTreeMap::new();

        for row in rows {
            let id = row
                .get(&self.id_var)
                .map(|b| RecordId::parse(&b.value))
                .ok_or_else(|| FetchError::Fatal(format!("row without ?{}", self.id_var)))?;
            let (record, labels) = grouped
                .entry(id.clone())
                .or_insert_with(|| (Record::new(id.clone()), Map::new()));

            if let Some(label) = row.get(&self.label_var) {
                let lang = self
                    .lang_var
                    .as_ref()
                    .and_then(|var| row.get(var))
                    .map(|b| b.value.as_str())
                    .or(label.lang.as_deref());
                if let Some(lang) = lang {
                    let code = to_wiki_code(lang)
                        .map(str::to_string)
                        .unwrap_or_else(|| lang.to_ascii_lowercase());
                    labels.insert(code, Value::String(normalize_title(&label.value)));
                }
            }

            if let Some(page) = self
                .page_var
                .as_ref()
                .and_then(|var| row.get(var))
                .filter(|b| !b.value.is_empty())
            {
                record.page = Some(page.value.clone());
            }

            if let Some(binding) = self.freshness_var.as_ref().and_then(|var| row.get(var)) {
                let freshness = parse_freshness(&binding.value)
                    .map_err(|e| FetchError::Fatal(format!("{id}: {e}")))?;
                record.freshness = record.freshness.max(freshness);
            }
        }

        Ok(grouped
            .into_values()
            .map(|(mut record, labels)| {
                record
                    .fields
                    .insert(self.label_field.clone(), Value::Object(labels));
                record
            })
            .collect())
    }
}

/// Reads a freshness marker from an integer or an RFC 3339 timestamp.
pub fn parse_freshness(raw: &str) -> Result<Freshness, String> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Freshness::new(value));
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| Freshness::new(t.timestamp()))
        .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

/// A fixed query exposed as a one-page source.
pub struct TripleStoreSource {
    name: String,
    client: TripleStoreClient,
    query: String,
    grouping: BindingGrouping,
}

impl TripleStoreSource {
    pub fn new(
        name: impl Into<String>,
        client: TripleStoreClient,
        query: impl Into<String>,
        grouping: BindingGrouping,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            query: query.into(),
            grouping,
        }
    }
}

#[async_trait]
impl SourceClient for TripleStoreSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<Page, FetchError> {
        let rows = self.client.query(&self.query).await?;
        let records = self.grouping.group(&rows)?;
        Ok(Page {
            records,
            info: PageInfo {
                current_page: cursor.page(),
                has_next_page: false,
            },
        })
    }
}

/// Chinese labels of every entity with a catalog id, plus its best
/// reference page and last modification time.
pub const CHINESE_TITLES_QUERY: &str = r#"SELECT (MIN(xsd:integer(?value)) AS ?animeId)
       ?lang
       (SAMPLE(?label) AS ?title)
       (SAMPLE(?finalPage) AS ?page)
       (MAX(?dateModified) AS ?modified)
WHERE {
  ?item wdt:P8729 ?value;
        schema:dateModified ?dateModified.

  OPTIONAL { ?item wdt:P364 ?originalLanguage. }
  FILTER(?originalLanguage = wd:Q5287 || !BOUND(?originalLanguage))

  ?item rdfs:label ?label.
  BIND(LANG(?label) AS ?lang)
  FILTER(STRSTARTS(?lang, "zh"))

  OPTIONAL { ?item wdt:P5737 ?page }
  OPTIONAL {
    ?item wdt:P179 ?series
    OPTIONAL { ?series wdt:P5737 ?seriesPage }
    OPTIONAL { ?series wdt:P144/wdt:P5737 ?seriesOriginPage }
  }
  OPTIONAL {
    ?item wdt:P144 ?origin
    OPTIONAL {
      ?origin p:P5737 ?originPageStatement.
      ?originPageStatement ps:P5737 ?originPage;
                           wikibase:rank ?originPageRank.
      OPTIONAL { ?originPageStatement pq:P407 ?originPageLang }
    }
    FILTER(?originPageRank != wikibase:DeprecatedRank && (!BOUND(?originPageLang) || ?originPageLang = wd:Q7850))
  }

  BIND(COALESCE(?page, ?seriesPage, ?seriesOriginPage, ?originPage) AS ?finalPage)
}
GROUP BY ?item ?lang
ORDER BY ?animeId ?lang"#;
