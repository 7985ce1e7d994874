//! Tabular record sets assembled from catalog exports.

use calamine::{Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Cursor, Write};

use crate::client::CatalogError;

/// An ordered set of rows with named columns.
///
/// The column set comes from the server response; the client never asserts
/// a schema. Column names are unique and every row has exactly one cell per
/// column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTable")]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Unchecked wire shape, normalized through [`RecordTable::new`]
#[derive(Deserialize)]
struct RawTable {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl From<RawTable> for RecordTable {
    fn from(raw: RawTable) -> Self {
        RecordTable::new(raw.columns, raw.rows)
    }
}

impl RecordTable {
    /// Create a table from a header and rows
    ///
    /// Rows shorter than the header are padded with empty cells, longer rows
    /// are cut to the header width. A repeated column name gets a numeric
    /// suffix (`name`, `name.1`, `name.2`) so no cell shares a name.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = unique_columns(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// A table with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode delimited text whose first row is the header
    pub fn from_delimited(text: &str, delimiter: u8) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| CatalogError::Decode(format!("Delimited header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| CatalogError::Decode(format!("Delimited row: {}", e)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(columns, rows))
    }

    /// Decode the first worksheet of an XLSX workbook, first row as header
    pub fn from_xlsx(bytes: &[u8]) -> Result<Self, CatalogError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| CatalogError::Decode(format!("XLSX: {}", e)))?;

        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| CatalogError::Decode(format!("XLSX: {}", e)))?,
            None => return Ok(Self::empty()),
        };

        let mut sheet_rows = range.rows();
        let columns: Vec<String> = match sheet_rows.next() {
            Some(header) => header.iter().map(cell_text).collect(),
            None => return Ok(Self::empty()),
        };
        let rows = sheet_rows
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        Ok(Self::new(columns, rows))
    }

    /// Column names in server order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in order
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    /// Append another table's rows after this table's rows.
    ///
    /// When the headers differ, rows are aligned by column name: columns
    /// unknown to `self` are added at the end and missing cells are empty.
    pub fn append(&mut self, other: RecordTable) {
        if other.columns.is_empty() && other.rows.is_empty() {
            return;
        }
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }
        if self.columns == other.columns {
            self.rows.extend(other.rows);
            return;
        }

        for column in &other.columns {
            if self.column_index(column).is_none() {
                self.columns.push(column.clone());
            }
        }
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        let positions: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|column| self.column_index(column))
            .collect();
        for row in other.rows {
            let mut aligned = vec![String::new(); width];
            for (cell, &position) in row.into_iter().zip(&positions) {
                aligned[position] = cell;
            }
            self.rows.push(aligned);
        }
    }

    /// Concatenate tables in order
    pub fn concat(tables: impl IntoIterator<Item = RecordTable>) -> Self {
        let mut combined = Self::empty();
        for table in tables {
            combined.append(table);
        }
        combined
    }

    /// Keep only the first `limit` rows
    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.clone(), serde_json::Value::from(cell.as_str())))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect()
    }

    /// Write as comma-separated values with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        let mut writer = csv::Writer::from_writer(writer);
        if !self.columns.is_empty() {
            writer
                .write_record(&self.columns)
                .map_err(std::io::Error::from)?;
        }
        for row in &self.rows {
            writer.write_record(row).map_err(std::io::Error::from)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn unique_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut unique = Vec::with_capacity(columns.len());
    for column in columns {
        let mut name = column.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", column, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        unique.push(name);
    }
    unique
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
