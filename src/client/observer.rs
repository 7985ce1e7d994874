//! Per-client hooks for request, retry and pagination events.
//!
//! Observers are injected into a [`CatalogClient`](super::CatalogClient)
//! instead of configuring logging globally, so several clients can report
//! to different sinks within one process.

use std::sync::Mutex;
use std::time::Duration;

use super::CatalogError;

/// Receives events from a catalog client.
///
/// All hooks default to doing nothing.
pub trait CatalogObserver: Send + Sync + std::fmt::Debug {
    /// A request is about to be sent
    fn on_request(&self, _url: &str, _accept: &str) {}

    /// Attempt `attempt` (1-based) failed and will be retried after `delay`
    fn on_retry(&self, _attempt: u32, _delay: Duration, _error: &CatalogError) {}

    /// The retry budget is exhausted after `attempts` attempts
    fn on_give_up(&self, _attempts: u32, _error: &CatalogError) {}

    /// Page `page` of a paginated export was decoded with `rows` rows
    fn on_page(&self, _page: u32, _rows: usize) {}

    /// Page `page` signalled the end of a paginated export
    fn on_end_of_results(&self, _page: u32) {}
}

/// Observer that reports every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CatalogObserver for TracingObserver {
    fn on_request(&self, url: &str, accept: &str) {
        tracing::debug!(url, accept, "Sending catalog request");
    }

    fn on_retry(&self, attempt: u32, delay: Duration, error: &CatalogError) {
        tracing::error!("Error occurred: {}", error);
        tracing::info!(attempt, "Retrying in {:?}...", delay);
    }

    fn on_give_up(&self, attempts: u32, error: &CatalogError) {
        tracing::error!(attempts, "Max retries reached. Giving up: {}", error);
    }

    fn on_page(&self, page: u32, rows: usize) {
        tracing::info!("Retrieved page {} with {} records", page, rows);
    }

    fn on_end_of_results(&self, page: u32) {
        tracing::info!(page, "Reached the last page of results");
    }
}

/// Event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    Request { url: String, accept: String },
    Retry { attempt: u32, delay: Duration },
    GiveUp { attempts: u32 },
    Page { page: u32, rows: usize },
    EndOfResults { page: u32 },
}

/// Observer that keeps every event in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.lock().clone()
    }

    /// Delays of every scheduled retry, in order
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ObservedEvent::Retry { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    /// Number of requests sent
    pub fn request_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, ObservedEvent::Request { .. }))
            .count()
    }

    fn push(&self, event: ObservedEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ObservedEvent>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CatalogObserver for RecordingObserver {
    fn on_request(&self, url: &str, accept: &str) {
        self.push(ObservedEvent::Request {
            url: url.to_string(),
            accept: accept.to_string(),
        });
    }

    fn on_retry(&self, attempt: u32, delay: Duration, _error: &CatalogError) {
        self.push(ObservedEvent::Retry { attempt, delay });
    }

    fn on_give_up(&self, attempts: u32, _error: &CatalogError) {
        self.push(ObservedEvent::GiveUp { attempts });
    }

    fn on_page(&self, page: u32, rows: usize) {
        self.push(ObservedEvent::Page { page, rows });
    }

    fn on_end_of_results(&self, page: u32) {
        self.push(ObservedEvent::EndOfResults { page });
    }
}
