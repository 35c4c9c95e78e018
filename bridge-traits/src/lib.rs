//! # Host Bridge Traits
//!
//! Transport and logging contracts shared by the OneDrive items crates.
//!
//! ## Overview
//!
//! The drive operations never talk to a network stack directly. They build an
//! [`HttpRequest`](http::HttpRequest), hand it to an injected
//! [`HttpClient`](http::HttpClient) and interpret the status code of the
//! [`HttpResponse`](http::HttpResponse). Each platform ships its own adapter:
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Tests    | `mockall` mocks / in-memory fakes | ✅ Available |
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP, streaming
//!   request bodies and streaming downloads
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Single attempt semantics
//!
//! An `HttpClient` performs exactly one attempt per call and reports every
//! received status code, including 5xx, as an `Ok(HttpResponse)`. Retrying is
//! the caller's decision, driven by [`RetryOptions`](http::RetryOptions).
//! Only failures where no response was received become a
//! [`BridgeError`](error::BridgeError).
//!
//! ## Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{ByteStream, HttpClient, HttpRequest, HttpResponse, StreamingResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient;
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//!
//!     async fn execute_streaming(&self, request: HttpRequest, body: ByteStream) -> Result<HttpResponse> {
//!         todo!()
//!     }
//!
//!     async fn download_stream(&self, request: HttpRequest) -> Result<StreamingResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod logging;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{
    ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryOptions,
    StreamingResponse,
};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
