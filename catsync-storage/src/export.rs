//! Tab-separated export tables.

use crate::{write_atomic, StorageError, StorageResult};
use catsync_types::RecordId;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::io::{Read, Write};
use std::path::Path;

/// A presentation table keyed by the id column, rows in ascending id order.
///
/// Every row has exactly one value per column; absent values are empty
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    columns: Vec<String>,
    id_index: usize,
    rows: BTreeMap<RecordId, Vec<String>>,
}

impl ExportTable {
    /// Creates an empty table. `id_column` must be one of `columns`.
    pub fn new(columns: Vec<String>, id_column: &str) -> StorageResult<Self> {
        let id_index = columns
            .iter()
            .position(|c| c == id_column)
            .ok_or_else(|| StorageError::InvalidData(format!("no {id_column} column")))?;
        Ok(Self {
            columns,
            id_index,
            rows: BTreeMap::new(),
        })
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Name of the id column.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.columns[self.id_index]
    }

    /// Position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Inserts a row, keyed by its id column. Returns the replaced row.
    pub fn insert(&mut self, values: Vec<String>) -> StorageResult<Option<Vec<String>>> {
        if values.len() != self.columns.len() {
            return Err(StorageError::InvalidData(format!(
                "row has {} values, table has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        let id: RecordId = values[self.id_index]
            .parse()
            .map_err(|e: catsync_types::Error| StorageError::InvalidData(e.to_string()))?;
        Ok(self.rows.insert(id, values))
    }

    /// Row for an id.
    #[must_use]
    pub fn row(&self, id: &RecordId) -> Option<&[String]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    /// Value of one cell.
    #[must_use]
    pub fn value(&self, id: &RecordId, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(id).map(|row| row[index].as_str())
    }

    /// Returns true if the table holds a row for the id.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.rows.contains_key(id)
    }

    /// Iterates rows in ascending id order.
    pub fn rows(&self) -> btree_map::Iter<'_, RecordId, Vec<String>> {
        self.rows.iter()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reads a TSV document whose first row is the header.
    pub fn read_tsv<R: Read>(reader: R, id_column: &str) -> StorageResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Self::new(columns, id_column)?;
        for row in reader.records() {
            let row = row?;
            table.insert(row.iter().map(str::to_string).collect())?;
        }
        Ok(table)
    }

    /// Writes the table as TSV: header, then rows in ascending id order.
    pub fn write_tsv<W: Write>(&self, writer: W) -> StorageResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in self.rows.values() {
            writer.write_record(row)?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Reads a TSV file.
    pub fn read_file(path: &Path, id_column: &str) -> StorageResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
        Self::read_tsv(file, id_column)
    }

    /// Writes a TSV file atomically.
    pub fn write_file(&self, path: &Path) -> StorageResult<()> {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf)?;
        write_atomic(path, &buf)
    }
}
