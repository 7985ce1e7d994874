//! # CDLI Scraper
//!
//! A client for pulling artifact records from the Cuneiform Digital Library
//! Initiative catalog: metadata, linked data, bibliographies, inscriptions and
//! bulk tabular exports, with retry on transient failures and cursor-based
//! pagination.
//!
//! ## Architecture
//!
//! - [`client`]: the catalog client, its error type and observers
//! - [`models`]: artifact identifiers, format selectors and record tables
//! - [`utils`]: HTTP session, retry with backoff, persistence and display helpers
//! - [`config`]: configuration management

pub mod client;
pub mod config;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use client::{CatalogClient, CatalogError};
pub use models::{ArtifactId, RecordTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
