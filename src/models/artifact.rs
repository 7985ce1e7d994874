//! Artifact identifiers and linked-data payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::client::CatalogError;

/// Opaque key of a catalog record (e.g. `P000001` or `1`).
///
/// The identifier is used verbatim when building request paths. The only
/// check performed is that it is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Create an identifier, rejecting empty or whitespace-only input
    pub fn new(id: impl Into<String>) -> Result<Self, CatalogError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CatalogError::InvalidArtifactId(id));
        }
        Ok(Self(id))
    }

    /// The identifier as passed in
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ArtifactId {
    type Error = CatalogError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Linked data for an artifact
///
/// JSON-LD responses are parsed; RDF/XML and Turtle are kept as the raw body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkedData {
    Json(serde_json::Value),
    Text(String),
}

impl LinkedData {
    /// The parsed JSON-LD document, if this is one
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            LinkedData::Json(value) => Some(value),
            LinkedData::Text(_) => None,
        }
    }

    /// The raw RDF text, if this is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            LinkedData::Json(_) => None,
            LinkedData::Text(text) => Some(text),
        }
    }
}
