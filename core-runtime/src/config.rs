//! # Drive Client Configuration
//!
//! Provides the explicit configuration a `OneDriveClient` is constructed with.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`DriveConfig`] holding the transport and the tunables shared by every
//! operation. It enforces fail-fast validation so that a misconfigured client
//! is rejected at construction rather than on its first request.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - transport for every request (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, `ReqwestHttpClient` is
//! injected automatically if no client is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::DriveConfig;
//! use bridge_traits::RetryOptions;
//!
//! let config = DriveConfig::builder()
//!     .retry_options(RetryOptions::default().with_retries(3))
//!     .chunk_group_size(10)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```
//! use core_runtime::config::DriveConfig;
//!
//! let result = DriveConfig::builder()
//!     .api_base_url("ftp://graph.example")
//!     .build();
//! assert!(result.is_err());
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, RetryOptions};
use std::sync::Arc;
use std::time::Duration;

/// Microsoft Graph v1.0 endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

/// Stream chunks buffered per upload PUT.
pub const DEFAULT_CHUNK_GROUP_SIZE: usize = 20;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_CHUNK_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the OneDrive items client.
///
/// Use [`DriveConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct DriveConfig {
    /// Base URL every REST path is appended to, always ending in `/`
    pub api_base_url: String,

    /// Transport used for every request
    pub http_client: Arc<dyn HttpClient>,

    /// Default retry budget for retried operations and chunk PUTs
    pub retry_options: RetryOptions,

    /// Retry the initial download response on transient status codes
    pub retry_downloads: bool,

    /// Default number of stream chunks buffered before a chunk PUT
    pub chunk_group_size: usize,

    /// Timeout applied to metadata and other buffered requests
    pub request_timeout: Duration,

    /// Timeout applied to each chunk PUT and to simple uploads
    pub chunk_upload_timeout: Duration,

    /// Capacity of the client's event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("api_base_url", &self.api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("retry_options", &self.retry_options)
            .field("retry_downloads", &self.retry_downloads)
            .field("chunk_group_size", &self.chunk_group_size)
            .field("request_timeout", &self.request_timeout)
            .field("chunk_upload_timeout", &self.chunk_upload_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl DriveConfig {
    /// Creates a new builder for constructing a `DriveConfig`.
    pub fn builder() -> DriveConfigBuilder {
        DriveConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is http(s) with a host and ends in `/`
    /// - Chunk group size and event buffer size are at least 1
    /// - Timeouts are non-zero
    /// - The retry factor is at least 1
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url)?;

        if !self.api_base_url.ends_with('/') {
            return Err(Error::Config(
                "API base URL must end with '/'".to_string(),
            ));
        }

        if self.chunk_group_size == 0 {
            return Err(Error::Config(
                "Chunk group size must be at least 1".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be at least 1".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.chunk_upload_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeouts must be greater than zero".to_string(),
            ));
        }

        if self.retry_options.factor == 0 {
            return Err(Error::Config(
                "Retry backoff factor must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_base_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                url
            ))
        })?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(Error::Config(format!("API base URL '{}' has no host", url)));
    }

    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for every drive request. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject an HttpClient with .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`DriveConfig`] instances.
#[derive(Default)]
pub struct DriveConfigBuilder {
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    retry_options: Option<RetryOptions>,
    retry_downloads: bool,
    chunk_group_size: Option<usize>,
    request_timeout: Option<Duration>,
    chunk_upload_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl DriveConfigBuilder {
    /// Sets the REST base URL.
    ///
    /// A missing trailing `/` is added.
    ///
    /// ```
    /// use core_runtime::config::DriveConfig;
    ///
    /// let builder = DriveConfig::builder()
    ///     .api_base_url("https://graph.microsoft.com/beta");
    /// ```
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the default retry budget.
    pub fn retry_options(mut self, options: RetryOptions) -> Self {
        self.retry_options = Some(options);
        self
    }

    /// Enables retry of the initial download response.
    pub fn retry_downloads(mut self, enabled: bool) -> Self {
        self.retry_downloads = enabled;
        self
    }

    /// Sets the default chunk group size for upload sessions.
    ///
    /// Default: 20
    pub fn chunk_group_size(mut self, size: usize) -> Self {
        self.chunk_group_size = Some(size);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn chunk_upload_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_upload_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `DriveConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(DriveConfig)` on success, or an error if:
    /// - No `HttpClient` is provided and `desktop-shims` is disabled
    /// - Configuration values are invalid
    pub fn build(self) -> Result<DriveConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let mut api_base_url = self
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !api_base_url.ends_with('/') {
            api_base_url.push('/');
        }

        let config = DriveConfig {
            api_base_url,
            http_client,
            retry_options: self.retry_options.unwrap_or_default(),
            retry_downloads: self.retry_downloads,
            chunk_group_size: self.chunk_group_size.unwrap_or(DEFAULT_CHUNK_GROUP_SIZE),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            chunk_upload_timeout: self
                .chunk_upload_timeout
                .unwrap_or(DEFAULT_CHUNK_UPLOAD_TIMEOUT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
