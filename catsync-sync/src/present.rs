//! Presentation of snapshots as export tables.

use crate::error::{SyncError, SyncResult};
use catsync_storage::ExportTable;
use catsync_types::{Record, Snapshot};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Turns a record into one export row.
pub trait Presenter: Send + Sync {
    /// Header row; must include the id column.
    fn columns(&self) -> Vec<String>;

    /// Name of the id column.
    fn id_column(&self) -> &str;

    /// One value per column, in column order.
    fn present(&self, record: &Record) -> SyncResult<Vec<String>>;
}

/// Best-effort category guess for a record.
///
/// Failures never fail the export: the category column is left empty.
pub trait Classifier: Send + Sync {
    fn classify(&self, record: &Record) -> Result<Option<String>, String>;
}

/// Derives a cell from the whole record.
pub type CellFn = fn(&Record) -> Option<String>;

/// Where a column's value comes from.
#[derive(Debug, Clone)]
enum ColumnSource {
    Id,
    Page,
    /// First non-empty value among these pointers.
    Pointers(Vec<String>),
    Computed(CellFn),
    Classifier,
}

/// Column-by-column presenter.
#[derive(Clone)]
pub struct ColumnPresenter {
    columns: Vec<(String, ColumnSource)>,
    id_column: String,
    classifier: Option<Arc<dyn Classifier>>,
}

impl ColumnPresenter {
    /// Starts a presenter whose first column is the record id.
    #[must_use]
    pub fn new(id_column: &str) -> Self {
        Self {
            columns: vec![(id_column.to_string(), ColumnSource::Id)],
            id_column: id_column.to_string(),
            classifier: None,
        }
    }

    /// Adds a column filled from the first pointer that yields a value.
    #[must_use]
    pub fn pointer(mut self, name: &str, pointers: &[&str]) -> Self {
        let pointers = pointers.iter().map(|p| (*p).to_string()).collect();
        self.columns
            .push((name.to_string(), ColumnSource::Pointers(pointers)));
        self
    }

    /// Adds a column holding the record's reference link.
    #[must_use]
    pub fn page(mut self, name: &str) -> Self {
        self.columns.push((name.to_string(), ColumnSource::Page));
        self
    }

    /// Adds a column derived from the record by `cell`.
    #[must_use]
    pub fn computed(mut self, name: &str, cell: CellFn) -> Self {
        self.columns.push((name.to_string(), ColumnSource::Computed(cell)));
        self
    }

    /// Adds a column filled by `classifier`.
    #[must_use]
    pub fn classified(mut self, name: &str, classifier: Arc<dyn Classifier>) -> Self {
        self.columns.push((name.to_string(), ColumnSource::Classifier));
        self.classifier = Some(classifier);
        self
    }

    /// Export layout of a catalog namespace, if it has one.
    #[must_use]
    pub fn for_namespace(namespace: &str) -> Option<Self> {
        let presenter = match namespace {
            "anime" | "manga" => Self::new("ID")
                .pointer("name", &["/title/english", "/title/romaji", "/title/native"])
                .classified("type", Arc::new(MediaFormatClassifier))
                .page("URL")
                .pointer("description", &["/title/native"]),
            "staff" => Self::new("ID")
                .pointer("name", &["/name/full", "/name/native"])
                .classified("type", Arc::new(StaffClassifier))
                .computed("P1853", blood_type_entity)
                .computed("P21", gender_entity)
                .computed("born", |record| partial_date(record.pointer("/dateOfBirth")))
                .computed("died", |record| partial_date(record.pointer("/dateOfDeath")))
                .pointer("P2031", &["/yearsActive/0"])
                .page("URL")
                .pointer("description", &["/name/native"]),
            "characters" => Self::new("ID")
                .pointer("name", &["/name/full", "/name/native"])
                .classified("type", Arc::new(MediaFormatClassifier))
                .page("URL")
                .pointer("description", &["/name/native"]),
            _ => return None,
        };
        Some(presenter)
    }

    fn classify(&self, record: &Record) -> String {
        let Some(classifier) = &self.classifier else {
            return String::new();
        };
        match classifier.classify(record) {
            Ok(category) => category.unwrap_or_default(),
            Err(e) => {
                debug!("Could not classify {}: {}", record.id, e);
                String::new()
            }
        }
    }
}

impl Presenter for ColumnPresenter {
    fn columns(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    fn id_column(&self) -> &str {
        &self.id_column
    }

    fn present(&self, record: &Record) -> SyncResult<Vec<String>> {
        Ok(self
            .columns
            .iter()
            .map(|(_, source)| match source {
                ColumnSource::Id => record.id.to_string(),
                ColumnSource::Page => record.page.clone().unwrap_or_default(),
                ColumnSource::Pointers(pointers) => pointers
                    .iter()
                    .find_map(|p| record.pointer(p).and_then(cell))
                    .unwrap_or_default(),
                ColumnSource::Computed(derive) => derive(record).unwrap_or_default(),
                ColumnSource::Classifier => self.classify(record),
            })
            .collect())
    }
}

/// Flattens a JSON value into a cell. Null, empty strings and containers
/// yield nothing.
fn cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Renders every record of a snapshot, ascending id.
pub fn export_snapshot(snapshot: &Snapshot, presenter: &dyn Presenter) -> SyncResult<ExportTable> {
    let mut table = ExportTable::new(presenter.columns(), presenter.id_column())?;
    for record in snapshot.iter() {
        let row = presenter.present(record)?;
        if row.iter().any(|v| v.contains(['\n', '\r'])) {
            return Err(SyncError::Presentation(format!(
                "{}: value spans lines",
                record.id
            )));
        }
        table.insert(row)?;
    }
    Ok(table)
}

/// Guesses a knowledge-base class from format, origin and relations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaFormatClassifier;

impl Classifier for MediaFormatClassifier {
    fn classify(&self, record: &Record) -> Result<Option<String>, String> {
        let text = |pointer: &str| record.pointer(pointer).and_then(Value::as_str);
        let japanese = text("/countryOfOrigin") == Some("JP");

        // Characters: a blood type means a human.
        if let Some(blood) = text("/bloodType") {
            if matches!(blood, "A" | "B" | "AB" | "O") {
                return Ok(Some("Q15632617".to_string()));
            }
        }
        if let Some(Value::Array(nodes)) = record.pointer("/media/nodes") {
            for media in nodes {
                let field = |name: &str| media.get(name).and_then(Value::as_str);
                let origin_jp = field("countryOfOrigin") == Some("JP");
                if field("type") == Some("ANIME") {
                    return Ok(Some(pick(origin_jp, "Q80447738", "Q15711870")));
                }
                match field("format") {
                    Some("MANGA" | "ONE_SHOT") => {
                        return Ok(Some(pick(origin_jp, "Q87576284", "Q1114461")));
                    }
                    Some("NOVEL") => return Ok(Some("Q3658341".to_string())),
                    _ => {}
                }
            }
            return Ok(None);
        }

        let Some(format) = text("/format") else {
            return Ok(None);
        };
        let episodes = record
            .pointer("/episodes")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let is_season = record
            .pointer("/relations/edges")
            .and_then(Value::as_array)
            .is_some_and(|edges| {
                edges.iter().any(|edge| {
                    matches!(
                        edge.get("relationType").and_then(Value::as_str),
                        Some("PREQUEL" | "SEQUEL")
                    )
                })
            });

        let category = match format {
            "TV" | "TV_SHORT" => match (japanese, is_season) {
                (true, true) => "Q100269041",
                (true, false) => "Q63952888",
                (false, true) => "Q125354488",
                (false, false) => "Q117467246",
            },
            "MOVIE" => pick_str(japanese, "Q20650540", "Q202866"),
            "SPECIAL" => "Q1107",
            "OVA" => pick_str(episodes > 1, "Q113687694", "Q220898"),
            "ONA" => pick_str(japanese && episodes > 1, "Q113671041", "Q1047299"),
            "MUSIC" => "Q64100970",
            "MANGA" => match text("/countryOfOrigin") {
                Some("JP") => "Q21198342",
                Some("KR") => "Q74262765",
                Some("CN") => "Q754669",
                _ => "Q1004",
            },
            "ONE_SHOT" => "Q21202185",
            "NOVEL" => "Q104213567",
            other => return Err(format!("unknown format {other}")),
        };
        Ok(Some(category.to_string()))
    }
}

/// Organisation kinds recognized from an occupation, checked in order.
static GROUP_KINDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bBand\s*$", "Q215380"),
        (r"(?i)\bPseudonym\b", "Q16017119"),
        (r"(?i)\bChoir\b", "Q131186"),
        (r"(?i)\bOrchestra\b", "Q42998"),
        (r"(?i)\bIdol\s*Group\b", "Q108424578"),
        (r"(?i)\bGame\s*Studio\b", "Q210167"),
        (r"(?i)\bStudio\s*$", "Q4830453"),
    ]
    .into_iter()
    .map(|(pattern, category)| (Regex::new(pattern).expect("static pattern"), category))
    .collect()
});

/// Occupation suffixes naming a person (animator, illustrator, ...).
static PERSON_OCCUPATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bMangaka|[eo]r|ist|ian|ant)\s*$").expect("static pattern")
});

const PERSON_OCCUPATIONS: [&str; 4] = ["Manga", "story", "Coloring", "DJ"];

/// Guesses whether a staff entry is a person or an organisation.
///
/// Group occupations (band, choir, studio, ...) win over personal data.
/// Anything with a blood type, gender, home town, a date or a personal
/// occupation is a human. Organisations rarely have both a first and a
/// last name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaffClassifier;

impl Classifier for StaffClassifier {
    fn classify(&self, record: &Record) -> Result<Option<String>, String> {
        let occupations: Vec<&str> = record
            .pointer("/primaryOccupations")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (pattern, category) in GROUP_KINDS.iter() {
            if occupations.iter().any(|o| pattern.is_match(o)) {
                return Ok(Some((*category).to_string()));
            }
        }

        let set = |pointer: &str| record.pointer(pointer).is_some_and(truthy);
        let dated = |pointer: &str| {
            record
                .pointer(pointer)
                .and_then(Value::as_object)
                .is_some_and(|date| date.values().any(truthy))
        };
        let human = set("/bloodType")
            || set("/gender")
            || set("/homeTown")
            || dated("/dateOfBirth")
            || dated("/dateOfDeath")
            || occupations
                .iter()
                .any(|o| PERSON_OCCUPATION.is_match(o) || PERSON_OCCUPATIONS.contains(o))
            || (set("/name/first") && set("/name/last"));

        Ok(human.then(|| "Q5".to_string()))
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn blood_type_entity(record: &Record) -> Option<String> {
    let entity = match record.pointer("/bloodType").and_then(Value::as_str)? {
        "A" => "Q19831453",
        "B" => "Q19831454",
        "AB" => "Q19831455",
        "O" => "Q19831451",
        _ => return None,
    };
    Some(entity.to_string())
}

fn gender_entity(record: &Record) -> Option<String> {
    let gender = record.pointer("/gender").and_then(Value::as_str)?;
    let entity = match gender.to_ascii_lowercase().as_str() {
        "male" => "Q6581097",
        "female" => "Q6581072",
        _ => return None,
    };
    Some(entity.to_string())
}

/// `{year, month, day}` as `YYYY-MM-DD`, truncated at the first unknown
/// part. No year, no date.
fn partial_date(date: Option<&Value>) -> Option<String> {
    let date = date?;
    let part = |name: &str| date.get(name).and_then(Value::as_u64).unwrap_or(0);
    let year = part("year");
    if year == 0 {
        return None;
    }
    let mut text = format!("{year}-{:02}-{:02}", part("month"), part("day"));
    while let Some(stripped) = text.strip_suffix("-00") {
        text.truncate(stripped.len());
    }
    Some(text)
}

fn pick_str(condition: bool, yes: &'static str, no: &'static str) -> &'static str {
    if condition { yes } else { no }
}

fn pick(condition: bool, yes: &str, no: &str) -> String {
    if condition { yes } else { no }.to_string()
}
