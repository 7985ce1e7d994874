//! Persisting fetched records to disk.
//!
//! Tables are written as CSV, JSON values pretty-printed, and everything else
//! as raw text. One artifact per file, named by operation and identifier.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::client::CatalogError;
use crate::models::{
    ArtifactId, BibliographyFormat, InscriptionFormat, LinkedData, LinkedDataFormat, RecordTable,
};

/// Default number of rows kept by [`truncate_csv`]
pub const DEFAULT_TRUNCATE_LIMIT: usize = 100;

/// A fetched result ready to be written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Table(RecordTable),
    Json(serde_json::Value),
    Text(String),
}

impl From<RecordTable> for Output {
    fn from(table: RecordTable) -> Self {
        Output::Table(table)
    }
}

impl From<serde_json::Value> for Output {
    fn from(value: serde_json::Value) -> Self {
        Output::Json(value)
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Output::Text(text)
    }
}

impl From<LinkedData> for Output {
    fn from(data: LinkedData) -> Self {
        match data {
            LinkedData::Json(value) => Output::Json(value),
            LinkedData::Text(text) => Output::Text(text),
        }
    }
}

/// Which operation produced an output, used to derive its file name
#[derive(Debug, Clone, Copy)]
pub enum OutputName<'a> {
    Metadata(&'a ArtifactId),
    LinkedData(&'a ArtifactId, LinkedDataFormat),
    Bibliography(&'a ArtifactId, BibliographyFormat),
    Inscription(&'a ArtifactId, InscriptionFormat),
    TabularExport(&'a str),
    AllArtifacts,
}

impl OutputName<'_> {
    /// File name used when no explicit path is given
    pub fn file_name(&self) -> String {
        match self {
            OutputName::Metadata(id) => format!("metadata_{}.json", id),
            OutputName::LinkedData(id, format) => {
                let ext = match format {
                    LinkedDataFormat::JsonLd => "json",
                    LinkedDataFormat::Rdf => "rdf",
                    LinkedDataFormat::Turtle => "ttl",
                };
                format!("linked_data_{}.{}", id, ext)
            }
            OutputName::Bibliography(id, format) => {
                let ext = match format {
                    BibliographyFormat::Bibtex => "bib",
                    BibliographyFormat::Csl => "json",
                    BibliographyFormat::Ris => "ris",
                };
                format!("bibliography_{}.{}", id, ext)
            }
            OutputName::Inscription(id, format) => {
                let ext = match format {
                    InscriptionFormat::Atf => "atf",
                    InscriptionFormat::CdliConll | InscriptionFormat::ConllU => "conll",
                };
                format!("inscription_{}.{}", id, ext)
            }
            OutputName::TabularExport(export_type) => format!("{}_export.csv", export_type),
            OutputName::AllArtifacts => "all_artifacts.csv".to_string(),
        }
    }

    /// `file_name` inside `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Write an output to `path`, creating parent directories as needed
pub fn save_output(output: &Output, path: &Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    match output {
        Output::Table(table) => table.write_csv(&mut writer)?,
        Output::Json(value) => {
            serde_json::to_writer_pretty(&mut writer, value).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
        }
        Output::Text(text) => writer.write_all(text.as_bytes())?,
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), "Saved output");
    Ok(())
}

/// Copy the header and the first `limit` rows of a CSV file to `output`.
///
/// Rows past `limit` are never read. Returns the truncated table.
pub fn truncate_csv(input: &Path, output: &Path, limit: usize) -> Result<RecordTable, CatalogError> {
    let mut reader = csv::Reader::from_reader(File::open(input)?);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CatalogError::Decode(format!("CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::with_capacity(limit.min(DEFAULT_TRUNCATE_LIMIT));
    for record in reader.records().take(limit) {
        let record = record.map_err(|e| CatalogError::Decode(format!("CSV row: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let table = RecordTable::new(columns, rows);
    save_output(&Output::Table(table.clone()), output)?;
    Ok(table)
}
