//! OneDrive client entry point

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::RetryOptions;
use core_runtime::config::DriveConfig;
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{OneDriveError, Result};
use crate::path;
use crate::retry::with_retry;
use crate::types::{AccessToken, DriveScope};

/// Client for drive item operations.
///
/// Cheap to clone; clones share the transport, the configuration and the
/// event bus.
///
/// # Example
///
/// ```ignore
/// use provider_onedrive::{CreateFolderParams, DeleteParams, OneDriveClient};
///
/// let client = OneDriveClient::new(config);
/// let folder = client.create_folder(CreateFolderParams::new(&token, "reports")).await?;
/// client.delete(DeleteParams::new(&token, folder.id().unwrap_or_default())).await?;
/// ```
#[derive(Clone)]
pub struct OneDriveClient {
    http_client: Arc<dyn HttpClient>,
    config: Arc<DriveConfig>,
    events: EventBus,
}

impl OneDriveClient {
    /// Create a client with its own event bus sized from the configuration.
    pub fn new(config: DriveConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        Self::with_event_bus(config, events)
    }

    /// Create a client publishing to an existing event bus.
    pub fn with_event_bus(config: DriveConfig, events: EventBus) -> Self {
        Self {
            http_client: Arc::clone(&config.http_client),
            config: Arc::new(config),
            events,
        }
    }

    /// Event bus carrying upload lifecycle events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &Arc<dyn HttpClient> {
        &self.http_client
    }

    /// Retry budget for a call, preferring the per-call override.
    pub(crate) fn retry_options(&self, overridden: Option<&RetryOptions>) -> RetryOptions {
        overridden
            .cloned()
            .unwrap_or_else(|| self.config.retry_options.clone())
    }

    /// Absolute URL of `path` in the drive addressed by `scope`.
    pub(crate) fn url(&self, scope: &DriveScope, path: &str) -> Result<String> {
        Ok(format!(
            "{}{}{}",
            self.config.api_base_url,
            path::scope_prefix(scope)?,
            path
        ))
    }

    /// Whether `url` shares scheme, host and port with the configured base URL.
    pub(crate) fn is_api_origin(&self, url: &str) -> bool {
        match (origin(url), origin(&self.config.api_base_url)) {
            (Some(candidate), Some(api)) => candidate.eq_ignore_ascii_case(api),
            _ => false,
        }
    }

    /// Authorized request against a drive path with the default timeout.
    pub(crate) fn request(
        &self,
        method: HttpMethod,
        token: &AccessToken,
        scope: &DriveScope,
        path: &str,
    ) -> Result<HttpRequest> {
        Ok(HttpRequest::new(method, self.url(scope, path)?)
            .bearer_token(token.as_str())
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout))
    }

    /// Single attempt; any non-2xx status becomes [`OneDriveError::Service`].
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let response = self.http_client.execute(request).await?;
        trace!(%method, status = response.status, "Response received");
        check_status(response)
    }

    /// Send under the retry policy, cloning the request per attempt.
    pub(crate) async fn send_with_retry(
        &self,
        request: HttpRequest,
        options: &RetryOptions,
        operation: &str,
    ) -> Result<HttpResponse> {
        with_retry(options, operation, |_| self.send(request.clone())).await
    }

    pub(crate) fn emit(&self, event: UploadEvent) {
        // No subscribers is not an error for the uploader.
        if self.events.emit(CoreEvent::Upload(event)).is_err() {
            trace!("No event subscribers");
        }
    }
}

impl fmt::Debug for OneDriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneDriveClient")
            .field("api_base_url", &self.config.api_base_url)
            .field("events", &self.events)
            .finish()
    }
}

pub(crate) fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        debug!(status = response.status, "Service returned an error status");
        Err(OneDriveError::Service {
            status: response.status,
            body: response.text_lossy(),
        })
    }
}

/// `scheme://authority` prefix of an absolute URL.
fn origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let authority_start = scheme_end + 3;
    let authority_len = url[authority_start..]
        .find(['/', '?', '#'])
        .unwrap_or(url.len() - authority_start);
    if authority_len == 0 {
        return None;
    }
    Some(&url[..authority_start + authority_len])
}

pub(crate) fn parse_json<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| OneDriveError::Parse(format!("Failed to parse {}: {}", what, e)))
}
