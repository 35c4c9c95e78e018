//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, StreamingResponse},
};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("onedrive-items/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Performs exactly one attempt per call; retry decisions belong to the
/// caller. Provides:
/// - Connection pooling via reqwest
/// - TLS via rustls
/// - Streaming request bodies and streaming downloads
///
/// No client-wide timeout is configured so long downloads are not cut off;
/// callers set per-request timeouts on [`HttpRequest`].
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        match Self::with_connect_timeout(Duration::from_secs(10)) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Falling back to default reqwest client");
                Self::with_client(Client::new())
            }
        }
    }

    /// Create a new HTTP client with a custom connect timeout
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request, without its body
    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn convert_error(error: reqwest::Error) -> BridgeError {
        if error.is_timeout() {
            BridgeError::Timeout(error.to_string())
        } else if error.is_connect() {
            BridgeError::ConnectionFailed(error.to_string())
        } else {
            BridgeError::OperationFailed(error.to_string())
        }
    }

    fn collect_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect()
    }

    async fn buffer_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = Self::collect_headers(&response);
        let body = response.bytes().await.map_err(Self::convert_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send(builder: reqwest::RequestBuilder, method: HttpMethod) -> Result<reqwest::Response> {
        builder.send().await.map_err(|e| {
            warn!(error = %e, method = %method, "HTTP request failed without a response");
            Self::convert_error(e)
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, "Executing HTTP request");

        let mut builder = self.build_request(&request);
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let response = Self::send(builder, request.method).await?;
        let response = Self::buffer_response(response).await?;
        debug!(status = response.status, "HTTP request completed");
        Ok(response)
    }

    async fn execute_streaming(
        &self,
        request: HttpRequest,
        body: ByteStream,
    ) -> Result<HttpResponse> {
        debug!(method = %request.method, "Executing streaming HTTP request");

        let builder = self
            .build_request(&request)
            .body(reqwest::Body::wrap_stream(body));

        let response = Self::send(builder, request.method).await?;
        Self::buffer_response(response).await
    }

    async fn download_stream(&self, request: HttpRequest) -> Result<StreamingResponse> {
        debug!(method = %request.method, "Opening HTTP download stream");

        let mut builder = self.build_request(&request);
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        let response = Self::send(builder, request.method).await?;
        let status = response.status().as_u16();
        let headers = Self::collect_headers(&response);

        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(StreamingResponse {
            status,
            headers,
            body: Box::new(reader),
        })
    }
}
