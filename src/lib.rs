//! OneDrive items workspace facade.
//!
//! Re-exports the public surface of the workspace crates so host applications
//! can depend on `onedrive-items` alone. With the default `desktop-shims`
//! feature the reqwest-backed transport is injected automatically when
//! [`DriveConfig`] is built without an explicit `HttpClient`.
//!
//! ```ignore
//! use onedrive_items::{CreateFolderParams, DriveConfig, OneDriveClient};
//!
//! let client = OneDriveClient::new(DriveConfig::builder().build()?);
//! let folder = client
//!     .create_folder(CreateFolderParams::new(token, "reports"))
//!     .await?;
//! ```

pub use bridge_traits::{
    BridgeError, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryOptions,
    StreamingResponse,
};
pub use core_runtime::config::{DriveConfig, DriveConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream, UploadEvent};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use provider_onedrive::*;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::ReqwestHttpClient;
