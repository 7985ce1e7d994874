//! Data models for catalog records.
//!
//! - [`ArtifactId`]: validated key of a single catalog record
//! - [`FormatSelector`] and the per-operation format enums
//! - [`LinkedData`]: decoded linked-data payload (JSON-LD or raw RDF text)
//! - [`RecordTable`]: rows of a tabular export

mod artifact;
mod format;
mod table;

pub use artifact::{ArtifactId, LinkedData};
pub use format::{
    BibliographyFormat, FormatSelector, InscriptionFormat, LinkedDataFormat, TabularFormat,
    METADATA_CONTENT_TYPE,
};
pub use table::RecordTable;
