//! Utility modules supporting catalog operations.
//!
//! - [`HttpClient`]: shared HTTP session
//! - [`RetryConfig`], [`with_retry`]: exponential backoff for transient failures
//! - [`save_output`], [`OutputName`], [`truncate_csv`]: writing results to disk
//! - [`table_preview`]: terminal rendering of record tables
//! - [`ProgressObserver`]: spinner for paginated exports
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use cdli_scraper::client::CatalogError;
//! use cdli_scraper::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_page() -> Result<String, CatalogError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), CatalogError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let page = with_retry(&config, || fetch_page()).await?;
//! # Ok(())
//! # }
//! ```

mod display;
mod http;
mod output;
mod progress;
mod retry;

pub use display::{table_preview, table_summary, truncate_with_ellipsis};
pub use http::{HttpClient, DEFAULT_USER_AGENT};
pub use output::{save_output, truncate_csv, Output, OutputName, DEFAULT_TRUNCATE_LIMIT};
pub use progress::ProgressObserver;
pub use retry::{with_retry, with_retry_observed, RetryConfig};
