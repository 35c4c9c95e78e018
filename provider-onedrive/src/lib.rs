//! # OneDrive Provider
//!
//! Client for Microsoft Graph drive items: item CRUD, thumbnails, simple
//! uploads and resumable chunked upload sessions.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`OneDriveClient`], the entry point, built from a
//!   [`DriveConfig`](core_runtime::config::DriveConfig)
//! - Simple operations taking parameter records (create folder, delete,
//!   download, metadata, listing, thumbnails, simple upload, update)
//! - [`UploadSession`], which streams an arbitrarily large source through
//!   sequential ranged PUTs with bounded retry and compensating cleanup
//! - Retry on the transient status codes 500, 502, 503 and 504
//!
//! ## Example
//!
//! ```ignore
//! use provider_onedrive::{OneDriveClient, ParentReference, UploadSessionParams};
//!
//! let client = OneDriveClient::new(config);
//! let session = client.new_upload_session(
//!     UploadSessionParams::new(token, "video.mp4", file_size)
//!         .parent(ParentReference::path("Videos/2024")),
//! )?;
//! let mut progress = session.progress();
//! let item = session.upload(source).await?;
//! ```

mod client;
pub mod error;
mod items;
pub mod params;
pub mod path;
pub mod retry;
pub mod types;
mod upload_session;

#[cfg(test)]
mod test_support;

pub use client::OneDriveClient;
pub use error::{CleanupOutcome, OneDriveError, Result, TRANSIENT_STATUS_CODES};
pub use params::{
    CreateFolderParams, DeleteParams, DownloadParams, DriveMetadataParams, GetMetadataParams,
    ListChildrenParams, ThumbnailParams, UpdateParams, UploadSessionParams, UploadSimpleParams,
};
pub use types::{AccessToken, DriveScope, Item, ParentReference, Thumbnail, TransferProgress};
pub use upload_session::UploadSession;
