//! Per-entity-type configuration and the process-level source settings.

use crate::error::FetchError;
use crate::merger::MergePolicy;
use catsync_types::{Freshness, Record, RecordId};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Environment variable holding a URL prefix prepended to every endpoint.
pub const PROXY_PREFIX_VAR: &str = "PROXY_PREFIX";
/// Environment variable holding a JSON object of extra request headers.
pub const PROXY_HEADERS_VAR: &str = "PROXY_HEADERS";

/// Request proxying shared by every catalog client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSettings {
    /// Prepended verbatim to the endpoint URL.
    pub proxy_prefix: String,
    /// Added to every request.
    pub extra_headers: BTreeMap<String, String>,
}

impl SourceSettings {
    /// Reads `PROXY_PREFIX` and `PROXY_HEADERS`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(PROXY_PREFIX_VAR).ok().as_deref(),
            std::env::var(PROXY_HEADERS_VAR).ok().as_deref(),
        )
    }

    /// Builds settings from raw variable values.
    ///
    /// A headers value that is not a JSON object is logged and ignored, as
    /// are non-string header values.
    pub fn from_vars(proxy_prefix: Option<&str>, proxy_headers: Option<&str>) -> Self {
        let mut extra_headers = BTreeMap::new();
        if let Some(raw) = proxy_headers.filter(|raw| !raw.trim().is_empty()) {
            match serde_json::from_str::<BTreeMap<String, Value>>(raw) {
                Ok(headers) => {
                    for (name, value) in headers {
                        match value {
                            Value::String(value) => {
                                extra_headers.insert(name, value);
                            }
                            other => warn!("Ignoring non-string proxy header {}: {}", name, other),
                        }
                    }
                }
                Err(e) => warn!("Failed to parse {}: {}", PROXY_HEADERS_VAR, e),
            }
        }

        Self {
            proxy_prefix: proxy_prefix.unwrap_or_default().to_string(),
            extra_headers,
        }
    }

    /// Endpoint URL with the proxy prefix applied.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.proxy_prefix, endpoint)
    }
}

/// Which ordering field bounds an incremental run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryOrdering {
    /// Entity type has no modification time; new entries have higher ids.
    ById,
    /// Entity type carries a last-modified timestamp.
    ByFreshness,
}

/// How a raw upstream entry maps onto a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMapping {
    pub id_field: String,
    pub freshness_field: Option<String>,
    pub page_field: Option<String>,
}

impl RecordMapping {
    /// Mapping for catalog entries (`id`, optional `updatedAt`, `siteUrl`).
    #[must_use]
    pub fn catalog(freshness: bool) -> Self {
        Self {
            id_field: "id".to_string(),
            freshness_field: freshness.then(|| "updatedAt".to_string()),
            page_field: Some("siteUrl".to_string()),
        }
    }

    /// Converts a raw entry. Every other key of the entry becomes a field.
    pub fn to_record(&self, entry: Value) -> Result<Record, FetchError> {
        let mut object = match entry {
            Value::Object(object) => object,
            other => return Err(FetchError::Fatal(format!("entry is not an object: {other}"))),
        };

        let id = object
            .remove(&self.id_field)
            .ok_or_else(|| FetchError::Fatal(format!("entry without {}", self.id_field)))?;
        let id = RecordId::from_json(&id).map_err(|e| FetchError::Fatal(e.to_string()))?;

        let freshness = match &self.freshness_field {
            Some(field) => {
                let raw = object.remove(field).unwrap_or(Value::Null);
                Freshness::from_json(&raw).map_err(|e| FetchError::Fatal(format!("{id}: {e}")))?
            }
            None => Freshness::UNKNOWN,
        };

        let page = match &self.page_field {
            Some(field) => match object.remove(field) {
                Some(Value::String(page)) if !page.is_empty() => Some(page),
                _ => None,
            },
            None => None,
        };

        let mut record = Record::new(id).with_freshness(freshness);
        record.fields = object.into_iter().collect();
        record.page = page;
        Ok(record)
    }
}

/// Everything that differs between entity types.
#[derive(Debug, Clone)]
pub struct EntityConfig {
    /// Snapshot namespace and export file stem.
    pub namespace: String,
    /// Key of the record list inside the upstream page object.
    pub list_field: String,
    pub ordering: BoundaryOrdering,
    pub mapping: RecordMapping,
    pub merge: MergePolicy,
    /// Upstream query text; takes `$page` and `$sort` variables.
    pub query: String,
}

impl EntityConfig {
    /// Anime entries, bounded by last-modified time.
    #[must_use]
    pub fn anime() -> Self {
        Self::media("anime", "ANIME", ANIME_FIELDS)
    }

    /// Manga entries, bounded by last-modified time.
    #[must_use]
    pub fn manga() -> Self {
        Self::media("manga", "MANGA", MANGA_FIELDS)
    }

    /// Staff entries, bounded by id.
    #[must_use]
    pub fn staff() -> Self {
        Self {
            namespace: "staff".to_string(),
            list_field: "staff".to_string(),
            ordering: BoundaryOrdering::ById,
            mapping: RecordMapping::catalog(false),
            merge: MergePolicy::default(),
            query: page_query("StaffSort", "staff", "", STAFF_FIELDS),
        }
    }

    /// Character entries, bounded by id.
    #[must_use]
    pub fn characters() -> Self {
        Self {
            namespace: "characters".to_string(),
            list_field: "characters".to_string(),
            ordering: BoundaryOrdering::ById,
            mapping: RecordMapping::catalog(false),
            merge: MergePolicy::default(),
            query: page_query("CharacterSort", "characters", "", CHARACTER_FIELDS),
        }
    }

    /// Chinese titles from the triple store, keyed by catalog id.
    #[must_use]
    pub fn wikidata() -> Self {
        Self {
            namespace: "wikidata".to_string(),
            list_field: String::new(),
            ordering: BoundaryOrdering::ById,
            mapping: RecordMapping::catalog(false),
            merge: MergePolicy::chinese_titles(),
            query: crate::triple_store::CHINESE_TITLES_QUERY.to_string(),
        }
    }

    /// Looks up a preset by namespace.
    #[must_use]
    pub fn preset(namespace: &str) -> Option<Self> {
        match namespace {
            "anime" => Some(Self::anime()),
            "manga" => Some(Self::manga()),
            "staff" => Some(Self::staff()),
            "characters" => Some(Self::characters()),
            _ => None,
        }
    }

    /// Namespaces with a preset.
    pub const PRESETS: [&'static str; 4] = ["anime", "manga", "staff", "characters"];

    fn media(namespace: &str, media_type: &str, fields: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            list_field: "media".to_string(),
            ordering: BoundaryOrdering::ByFreshness,
            mapping: RecordMapping::catalog(true),
            merge: MergePolicy::default(),
            query: page_query("MediaSort", "media", &format!("type: {media_type}, "), fields),
        }
    }
}

fn page_query(sort_type: &str, list: &str, filter: &str, fields: &str) -> String {
    format!(
        "query ($page: Int, $sort: [{sort_type}]) {{\n  \
           Page(page: $page, perPage: 50) {{\n    \
             pageInfo {{ currentPage hasNextPage }}\n    \
             {list}({filter}sort: $sort) {{{fields}}}\n  \
           }}\n\
         }}"
    )
}

const ANIME_FIELDS: &str = "
      id updatedAt siteUrl format countryOfOrigin episodes
      title { romaji english native }
      startDate { year month day }
      studios(isMain: true) { nodes { name } }
      relations { edges { relationType } }
    ";

const MANGA_FIELDS: &str = "
      id updatedAt siteUrl format countryOfOrigin
      title { romaji english native }
      startDate { year month day }
      staff(sort: RELEVANCE, perPage: 4) { edges { role node { name { full } } } }
    ";

const STAFF_FIELDS: &str = "
      id siteUrl gender bloodType yearsActive
      name { first last full native }
      dateOfBirth { year month day }
      dateOfDeath { year month day }
      primaryOccupations homeTown
    ";

const CHARACTER_FIELDS: &str = "
      id siteUrl bloodType
      name { full native }
      media(sort: START_DATE, perPage: 3) { nodes { type format countryOfOrigin title { romaji english } } }
    ";
