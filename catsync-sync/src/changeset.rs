//! Changesets between a fresh export and a downstream mirror of an earlier
//! one.
//!
//! Entries are ordered by ascending id. A mirror row missing from the new
//! export becomes a withdrawal that keeps the row's identity columns and
//! flags it with a sentinel category, so the downstream can retire it.

use crate::error::{SyncError, SyncResult};
use catsync_storage::ExportTable;
use catsync_types::RecordId;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// How withdrawn rows are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalPolicy {
    pub category_column: String,
    pub description_column: String,
    /// Category value marking a row as withdrawn.
    pub sentinel: String,
    /// Description written on withdrawn rows.
    pub notice: String,
    /// Columns copied from the mirror row. The id column always is.
    pub identity_columns: Vec<String>,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            category_column: "type".to_string(),
            description_column: "description".to_string(),
            sentinel: "withdrawn".to_string(),
            notice: "Removed from the upstream catalog".to_string(),
            identity_columns: vec!["name".to_string(), "URL".to_string()],
        }
    }
}

/// Kind of change to one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Withdrawn,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

/// One changed row, values aligned with [`ChangeSet::columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    pub id: RecordId,
    pub values: Vec<String>,
}

/// Ordered set of row changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Column order of the new export.
    pub columns: Vec<String>,
    pub id_column: String,
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Ids of entries of one kind, ascending.
    pub fn ids(&self, kind: ChangeKind) -> impl Iterator<Item = &RecordId> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| &e.id)
    }

    /// Entries as an export table, ready to be written as TSV.
    pub fn to_table(&self) -> SyncResult<ExportTable> {
        let mut table = ExportTable::new(self.columns.clone(), &self.id_column)?;
        for entry in &self.entries {
            table.insert(entry.values.clone())?;
        }
        Ok(table)
    }
}

/// Computes changesets under a withdrawal policy.
#[derive(Debug, Clone, Default)]
pub struct ChangeSetBuilder {
    policy: WithdrawalPolicy,
}

impl ChangeSetBuilder {
    #[must_use]
    pub fn new(policy: WithdrawalPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &WithdrawalPolicy {
        &self.policy
    }

    /// Compares `new` against `mirror`.
    ///
    /// Rows are matched by id and compared column by column under the new
    /// export's header; a column the mirror lacks reads as empty. Mirror
    /// rows already carrying the sentinel are not withdrawn again.
    pub fn build(&self, new: &ExportTable, mirror: &ExportTable) -> SyncResult<ChangeSet> {
        if new.id_column() != mirror.id_column() {
            return Err(SyncError::Config(format!(
                "id column mismatch: {} vs {}",
                new.id_column(),
                mirror.id_column()
            )));
        }

        let columns = new.columns().to_vec();
        let ids: BTreeSet<&RecordId> = new
            .rows()
            .map(|(id, _)| id)
            .chain(mirror.rows().map(|(id, _)| id))
            .collect();

        let mut entries = Vec::new();
        for id in ids {
            match (new.row(id), mirror.contains(id)) {
                (Some(row), false) => entries.push(ChangeEntry {
                    kind: ChangeKind::Added,
                    id: id.clone(),
                    values: row.to_vec(),
                }),
                (Some(row), true) => {
                    let modified = columns
                        .iter()
                        .zip(row)
                        .any(|(column, value)| {
                            mirror.value(id, column).unwrap_or_default() != value.as_str()
                        });
                    if modified {
                        entries.push(ChangeEntry {
                            kind: ChangeKind::Modified,
                            id: id.clone(),
                            values: row.to_vec(),
                        });
                    }
                }
                (None, _) => {
                    if self.is_withdrawn(mirror, id) {
                        debug!("{} already withdrawn downstream", id);
                        continue;
                    }
                    entries.push(ChangeEntry {
                        kind: ChangeKind::Withdrawn,
                        id: id.clone(),
                        values: self.withdrawal_row(&columns, new.id_column(), mirror, id),
                    });
                }
            }
        }

        debug!(
            "Changeset: {} entries over {} new and {} mirrored rows",
            entries.len(),
            new.len(),
            mirror.len()
        );
        Ok(ChangeSet {
            columns,
            id_column: new.id_column().to_string(),
            entries,
        })
    }

    fn is_withdrawn(&self, mirror: &ExportTable, id: &RecordId) -> bool {
        mirror.value(id, &self.policy.category_column) == Some(self.policy.sentinel.as_str())
    }

    fn withdrawal_row(
        &self,
        columns: &[String],
        id_column: &str,
        mirror: &ExportTable,
        id: &RecordId,
    ) -> Vec<String> {
        columns
            .iter()
            .map(|column| {
                if *column == self.policy.category_column {
                    self.policy.sentinel.clone()
                } else if *column == self.policy.description_column {
                    self.policy.notice.clone()
                } else if column == id_column || self.policy.identity_columns.contains(column) {
                    mirror.value(id, column).unwrap_or_default().to_string()
                } else {
                    String::new()
                }
            })
            .collect()
    }
}
