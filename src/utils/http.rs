//! HTTP client utilities.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::client::CatalogError;

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP session
///
/// No request timeout is set unless one is asked for; requests then rely on
/// the underlying client's defaults.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_settings(DEFAULT_USER_AGENT, None)
    }

    /// Create a new HTTP client with a custom user agent and optional timeout
    pub fn with_settings(user_agent: &str, timeout: Option<Duration>) -> Result<Self, CatalogError> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| CatalogError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(HttpClient::new().is_ok());
        assert!(HttpClient::with_settings("test-agent/1.0", Some(Duration::from_secs(5))).is_ok());
    }

    #[test]
    fn test_default_user_agent() {
        assert!(DEFAULT_USER_AGENT.starts_with("cdli-scraper/"));
    }
}
