use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{ByteStream, HttpClient, HttpRequest, HttpResponse, StreamingResponse};
use bridge_traits::RetryOptions;
use core_runtime::config::DriveConfig;
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

use crate::client::OneDriveClient;

mock! {
    pub HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        async fn execute_streaming(&self, request: HttpRequest, body: ByteStream) -> BridgeResult<HttpResponse>;
        async fn download_stream(&self, request: HttpRequest) -> BridgeResult<StreamingResponse>;
    }
}

pub const TEST_BASE_URL: &str = "https://graph.test/v1.0/";

/// Two retries with millisecond delays.
pub fn fast_retry() -> RetryOptions {
    RetryOptions::default()
        .with_retries(2)
        .with_min_timeout(Duration::from_millis(1))
}

pub fn config_with(mock: MockHttpClient) -> DriveConfig {
    DriveConfig::builder()
        .api_base_url(TEST_BASE_URL)
        .http_client(Arc::new(mock))
        .retry_options(fast_retry())
        .build()
        .expect("test config")
}

pub fn client_with(mock: MockHttpClient) -> OneDriveClient {
    OneDriveClient::new(config_with(mock))
}

pub fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}
