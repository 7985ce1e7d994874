//! Progress reporting for paginated exports.
//!
//! [`ProgressObserver`] is a [`CatalogObserver`] that drives an `indicatif`
//! spinner while forwarding every event to the tracing observer.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::client::{CatalogError, CatalogObserver, TracingObserver};

/// Spinner showing pages and records fetched so far
pub struct ProgressObserver {
    bar: ProgressBar,
    records: AtomicUsize,
    inner: TracingObserver,
}

impl ProgressObserver {
    /// Create a visible spinner with the given message prefix
    pub fn new(name: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {prefix}: {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(name.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self::with_bar(bar)
    }

    /// Create an observer that draws nothing
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            records: AtomicUsize::new(0),
            inner: TracingObserver,
        }
    }

    /// Records counted across all pages
    pub fn records(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }

    /// Stop the spinner, leaving a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl std::fmt::Debug for ProgressObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressObserver")
            .field("records", &self.records())
            .finish_non_exhaustive()
    }
}

impl CatalogObserver for ProgressObserver {
    fn on_request(&self, url: &str, accept: &str) {
        self.inner.on_request(url, accept);
    }

    fn on_retry(&self, attempt: u32, delay: Duration, error: &CatalogError) {
        self.bar
            .set_message(format!("retry {} in {:?}", attempt, delay));
        self.inner.on_retry(attempt, delay, error);
    }

    fn on_give_up(&self, attempts: u32, error: &CatalogError) {
        self.bar.abandon_with_message(format!("failed after {} attempts", attempts));
        self.inner.on_give_up(attempts, error);
    }

    fn on_page(&self, page: u32, rows: usize) {
        let total = self.records.fetch_add(rows, Ordering::SeqCst) + rows;
        self.bar
            .set_message(format!("page {} ({} records)", page, total));
        self.bar.tick();
        self.inner.on_page(page, rows);
    }

    fn on_end_of_results(&self, page: u32) {
        self.inner.on_end_of_results(page);
    }
}
