//! HTTP Client Abstraction
//!
//! Provides single-attempt async HTTP operations, streaming request bodies,
//! streaming downloads, and the retry budget consumed by callers.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{BridgeError, Result};

/// A request or source body delivered incrementally.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Append a percent-encoded query pair to the URL.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        self.url.push(separator);
        self.url.push_str(&urlencoding::encode(key));
        self.url.push('=');
        self.url.push_str(&urlencoding::encode(value));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Parse response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Response whose body is consumed incrementally
pub struct StreamingResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

impl StreamingResponse {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Drain the body into memory, typically to report an error payload.
    pub async fn into_response(mut self) -> Result<HttpResponse> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf).await?;
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers,
            body: Bytes::from(buf),
        })
    }
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"AsyncRead { ... }")
            .finish()
    }
}

/// Retry budget for a single logical operation.
///
/// `retries` counts retries, not attempts: the default of 1 allows two
/// attempts in total. `forever` lifts the retry ceiling but `max_retry_time`
/// still applies. The delay before retry `n` (0-based) is
/// `min(min_timeout * factor^n, max_timeout)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOptions {
    /// Maximum number of retries after the first attempt
    pub retries: u32,
    /// Retry without an attempt ceiling
    pub forever: bool,
    /// Do not hold the host alive for pending retry timers.
    ///
    /// Carried for callers that share budgets with other hosts. It has no
    /// effect under tokio: a pending `sleep` never keeps the runtime alive
    /// on its own, so retry scheduling is the same either way.
    pub unref: bool,
    /// Wall-clock ceiling across all attempts
    pub max_retry_time: Option<Duration>,
    /// Delay before the first retry
    pub min_timeout: Duration,
    /// Upper bound for a single delay
    pub max_timeout: Option<Duration>,
    /// Multiplier applied per retry
    pub factor: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retries: 1,
            forever: false,
            unref: false,
            max_retry_time: None,
            min_timeout: Duration::from_millis(1000),
            max_timeout: None,
            factor: 2,
        }
    }
}

impl RetryOptions {
    /// A budget that never retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_forever(mut self, forever: bool) -> Self {
        self.forever = forever;
        self
    }

    /// See [`RetryOptions::unref`]; accepted but does not change scheduling.
    pub fn with_unref(mut self, unref: bool) -> Self {
        self.unref = unref;
        self
    }

    pub fn with_max_retry_time(mut self, max_retry_time: Duration) -> Self {
        self.max_retry_time = Some(max_retry_time);
        self
    }

    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = Some(max_timeout);
        self
    }

    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor.max(1);
        self
    }

    /// Whether another retry is allowed after `retries_done` retries.
    pub fn allows_retry(&self, retries_done: u32) -> bool {
        self.forever || retries_done < self.retries
    }

    /// Delay before retry number `retry_index` (0-based).
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let multiplier = self.factor.max(1).saturating_pow(retry_index);
        let delay = self.min_timeout.saturating_mul(multiplier);
        match self.max_timeout {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// Async HTTP client trait
///
/// Implementations perform exactly one attempt per call and must return every
/// received status code as `Ok`. Implementations should handle:
/// - TLS certificate validation
/// - Connection pooling and keep-alive
/// - Per-request timeouts from [`HttpRequest::timeout`]
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch_drive(client: &dyn HttpClient, token: &str) -> Result<String> {
///     let request = HttpRequest::new(HttpMethod::Get, "https://graph.microsoft.com/v1.0/me/drive")
///         .bearer_token(token);
///
///     let response = client.execute(request).await?;
///     response.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request with a buffered body
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request whose body is streamed from `body`
    ///
    /// `request.body` is ignored. The response body is buffered.
    async fn execute_streaming(&self, request: HttpRequest, body: ByteStream)
        -> Result<HttpResponse>;

    /// Execute a request and hand back the response body as a reader
    ///
    /// This is useful for large files that should not be loaded entirely into memory.
    async fn download_stream(&self, request: HttpRequest) -> Result<StreamingResponse>;
}
