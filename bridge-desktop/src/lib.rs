//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls, streaming request bodies for
//!   simple uploads and streaming response bodies for downloads
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use core_runtime::config::DriveConfig;
//! use std::sync::Arc;
//!
//! let config = DriveConfig::builder()
//!     .http_client(Arc::new(ReqwestHttpClient::new()))
//!     .build()?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
