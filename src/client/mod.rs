//! Catalog client for the CDLI artifact API.
//!
//! [`CatalogClient`] turns a logical catalog operation into one or more HTTP
//! GET requests, negotiates the response format through the `Accept` header,
//! retries transient failures with exponential backoff, and decodes the body
//! into the shape the operation promises:
//!
//! | Operation | Path | Result |
//! |---|---|---|
//! | [`get_metadata`](CatalogClient::get_metadata) | `/artifacts/{id}` | JSON value |
//! | [`get_linked_data`](CatalogClient::get_linked_data) | `/artifacts/{id}` | [`LinkedData`] |
//! | [`get_bibliography`](CatalogClient::get_bibliography) | `/artifacts/{id}/bibliography` | text |
//! | [`get_inscription`](CatalogClient::get_inscription) | `/artifacts/{id}/inscription` | text |
//! | [`get_tabular_export`](CatalogClient::get_tabular_export) | `/{export_type}` | [`RecordTable`] |
//! | [`get_all_artifacts`](CatalogClient::get_all_artifacts) | `/artifacts?page=N&page_size=1000` | [`RecordTable`] |
//!
//! Requests are issued one at a time. Pagination cannot run ahead because a
//! page is only addressable once the previous one proved the results have
//! not ended.
//!
//! ```rust,no_run
//! use cdli_scraper::client::CatalogClient;
//! use cdli_scraper::models::{ArtifactId, BibliographyFormat};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CatalogClient::new()?;
//! let id = ArtifactId::new("P000001")?;
//! let bibtex = client.get_bibliography(&id, BibliographyFormat::Bibtex).await?;
//! println!("{}", bibtex);
//! # Ok(())
//! # }
//! ```

mod observer;

pub use observer::{CatalogObserver, ObservedEvent, RecordingObserver, TracingObserver};

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::models::{
    ArtifactId, BibliographyFormat, FormatSelector, InscriptionFormat, LinkedData,
    LinkedDataFormat, RecordTable, TabularFormat, METADATA_CONTENT_TYPE,
};
use crate::utils::{with_retry_observed, HttpClient, RetryConfig};

/// Public CDLI catalog origin
pub const CDLI_BASE_URL: &str = "https://cdli.mpiwg-berlin.mpg.de";

/// Export path used when none is given
pub const DEFAULT_EXPORT_TYPE: &str = "artifacts";

/// Rows requested per page of the paginated export
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Errors that can occur when talking to the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Network error or non-2xx status, after the retry budget is spent
    #[error("Request to {url} failed: {message}")]
    Request {
        url: String,
        status: Option<StatusCode>,
        message: String,
    },

    /// The body could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Empty artifact identifier
    #[error("Invalid artifact id: {0:?}")]
    InvalidArtifactId(String),

    /// A request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP session could not be created
    #[error("HTTP client error: {0}")]
    Http(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// HTTP status of a failed request, if the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CatalogError::Request { status, .. } => *status,
            _ => None,
        }
    }

    /// True for a request the server answered with 404 Not Found
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// True for failures worth retrying: network errors and non-2xx statuses
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Request { .. })
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(format!("JSON: {}", err))
    }
}

/// A successful (2xx) response with its body read in full
#[derive(Debug, Clone)]
pub struct CatalogResponse {
    url: String,
    status: StatusCode,
    body: Vec<u8>,
}

impl CatalogResponse {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Raw body bytes
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json(&self) -> Result<serde_json::Value, CatalogError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            CatalogError::Decode(format!("Failed to parse JSON from {}: {}", self.url, e))
        })
    }

    /// Body decoded as a table in the given format
    pub fn table(&self, format: TabularFormat) -> Result<RecordTable, CatalogError> {
        match format.delimiter() {
            Some(delimiter) => RecordTable::from_delimited(&self.text(), delimiter),
            None => RecordTable::from_xlsx(&self.body),
        }
    }
}

/// Check that `base_url` can carry request paths and strip trailing slashes
fn normalize_base_url(base_url: &str) -> Result<String, CatalogError> {
    let parsed = Url::parse(base_url)
        .map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if parsed.cannot_be_a_base() {
        return Err(CatalogError::InvalidUrl(base_url.to_string()));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Result of fetching one page of a paginated export
enum PageOutcome {
    Page(RecordTable),
    EndOfResults,
}

/// Client for the catalog API
///
/// Owns one HTTP session; clones share its connection pool.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: HttpClient,
    base_url: String,
    page_size: u32,
    retry: RetryConfig,
    observer: Arc<dyn CatalogObserver>,
}

impl CatalogClient {
    /// Create a client for the public catalog with default settings
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_config(&Config::default())
    }

    /// Create a client from loaded configuration
    pub fn with_config(config: &Config) -> Result<Self, CatalogError> {
        let http = HttpClient::with_settings(
            &config.catalog.user_agent,
            config.catalog.timeout(),
        )?;
        Self::from_parts(
            http,
            &config.catalog.base_url,
            config.retry_config(),
            Arc::new(TracingObserver),
        )
        .map(|client| client.with_page_size(config.catalog.page_size))
    }

    /// Assemble a client from an existing session, base URL, retry policy and observer
    pub fn from_parts(
        http: HttpClient,
        base_url: &str,
        retry: RetryConfig,
        observer: Arc<dyn CatalogObserver>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            page_size: DEFAULT_PAGE_SIZE,
            retry,
            observer,
        })
    }

    /// Point the client at another origin
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, CatalogError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the observer
    pub fn with_observer(mut self, observer: Arc<dyn CatalogObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Rows requested per page by [`get_all_artifacts`](Self::get_all_artifacts)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    // ========== ARTIFACT METHODS ==========

    /// Artifact metadata as a JSON value
    pub async fn get_metadata(&self, id: &ArtifactId) -> Result<serde_json::Value, CatalogError> {
        tracing::info!("Attempting to scrape metadata for artifact ID: {}", id);
        let response = self
            .execute(&format!("/artifacts/{}", id), METADATA_CONTENT_TYPE, &[])
            .await?;
        response.json()
    }

    /// Linked data, parsed for JSON-LD and raw text for RDF/XML and Turtle
    pub async fn get_linked_data(
        &self,
        id: &ArtifactId,
        format: LinkedDataFormat,
    ) -> Result<LinkedData, CatalogError> {
        tracing::info!("Attempting to scrape linked data for artifact ID: {}", id);
        let response = self
            .execute(&format!("/artifacts/{}", id), format.accept(), &[])
            .await?;

        if format.is_json() {
            response.json().map(LinkedData::Json)
        } else {
            Ok(LinkedData::Text(response.text()))
        }
    }

    /// Bibliography as raw text (BibTeX, CSL-JSON or RIS)
    pub async fn get_bibliography(
        &self,
        id: &ArtifactId,
        format: BibliographyFormat,
    ) -> Result<String, CatalogError> {
        tracing::info!("Attempting to scrape bibliography for artifact ID: {}", id);
        let response = self
            .execute(
                &format!("/artifacts/{}/bibliography", id),
                format.accept(),
                &[],
            )
            .await?;
        Ok(response.text())
    }

    /// Inscription as raw text (ATF or one of the CoNLL variants)
    pub async fn get_inscription(
        &self,
        id: &ArtifactId,
        format: InscriptionFormat,
    ) -> Result<String, CatalogError> {
        tracing::info!("Attempting to scrape inscription for artifact ID: {}", id);
        let response = self
            .execute(
                &format!("/artifacts/{}/inscription", id),
                format.accept(),
                &[],
            )
            .await?;
        Ok(response.text())
    }

    // ========== EXPORT METHODS ==========

    /// Bulk export of `export_type` (e.g. `artifacts`) as one table
    ///
    /// An empty `export_type` means [`DEFAULT_EXPORT_TYPE`].
    pub async fn get_tabular_export(
        &self,
        export_type: &str,
        format: TabularFormat,
    ) -> Result<RecordTable, CatalogError> {
        let export_type = match export_type.trim_matches('/') {
            "" => DEFAULT_EXPORT_TYPE,
            other => other,
        };
        tracing::info!("Attempting to scrape tabular export for {}", export_type);
        let response = self
            .execute(&format!("/{}", export_type), format.accept(), &[])
            .await?;
        response.table(format)
    }

    /// One page (1-based) of the paginated artifact export
    pub async fn get_page(
        &self,
        format: TabularFormat,
        page: u32,
    ) -> Result<RecordTable, CatalogError> {
        let query = [
            ("page", page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        let response = self
            .execute(&format!("/{}", DEFAULT_EXPORT_TYPE), format.accept(), &query)
            .await?;
        response.table(format)
    }

    /// Every artifact, fetched page by page and concatenated in page order.
    ///
    /// Pagination ends at the first page answered with 404 Not Found or
    /// holding no rows. Any other failure aborts the export and the pages
    /// fetched so far are discarded.
    pub async fn get_all_artifacts(
        &self,
        format: TabularFormat,
    ) -> Result<RecordTable, CatalogError> {
        tracing::info!("Attempting to scrape all artifacts with pagination");

        let mut pages = Vec::new();
        let mut page = 1;
        loop {
            match self.fetch_page(format, page).await? {
                PageOutcome::Page(table) => {
                    self.observer.on_page(page, table.len());
                    pages.push(table);
                    page += 1;
                }
                PageOutcome::EndOfResults => {
                    self.observer.on_end_of_results(page);
                    break;
                }
            }
        }

        let combined = RecordTable::concat(pages);
        tracing::info!("Total records retrieved: {}", combined.len());
        Ok(combined)
    }

    async fn fetch_page(
        &self,
        format: TabularFormat,
        page: u32,
    ) -> Result<PageOutcome, CatalogError> {
        match self.get_page(format, page).await {
            Ok(table) if table.is_empty() => Ok(PageOutcome::EndOfResults),
            Ok(table) => Ok(PageOutcome::Page(table)),
            Err(error) if error.is_not_found() => Ok(PageOutcome::EndOfResults),
            Err(error) => Err(error),
        }
    }

    // ========== REQUEST EXECUTION ==========

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// GET `path` with the given `Accept` value, retrying transient failures
    async fn execute(
        &self,
        path: &str,
        accept: &str,
        query: &[(&str, String)],
    ) -> Result<CatalogResponse, CatalogError> {
        let url = self.endpoint(path)?;
        let url = &url;
        let client = self.http.client();
        let observer = self.observer.as_ref();

        with_retry_observed(&self.retry, observer, || async move {
            observer.on_request(url.as_str(), accept);

            let mut request = client.get(url.clone()).header(ACCEPT, accept);
            if !query.is_empty() {
                request = request.query(query);
            }

            let response = request
                .send()
                .await
                .map_err(|e| request_error(url, e))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(CatalogError::Request {
                    url: url.to_string(),
                    status: Some(status),
                    message: format!("Catalog returned status {}: {}", status, snippet(&text)),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| request_error(url, e))?;

            Ok(CatalogResponse {
                url: url.to_string(),
                status,
                body: body.to_vec(),
            })
        })
        .await
    }
}

fn request_error(url: &Url, err: reqwest::Error) -> CatalogError {
    CatalogError::Request {
        url: url.to_string(),
        status: err.status(),
        message: err.to_string(),
    }
}

/// First line of an error body, capped for log output
fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    line.chars().take(200).collect()
}
