//! Parameter records for drive operations
//!
//! Every record carries the caller's bearer token, the [`DriveScope`] to
//! address and an optional retry budget overriding
//! [`DriveConfig::retry_options`](core_runtime::config::DriveConfig). Required
//! fields are checked by [`validate`](CreateFolderParams::validate) before any
//! request is built.

use bridge_traits::RetryOptions;
use serde_json::Value;

use crate::error::{OneDriveError, Result};
use crate::types::{AccessToken, DriveScope, ParentReference};

pub(crate) fn require_token(token: &AccessToken) -> Result<()> {
    if token.is_empty() {
        return Err(OneDriveError::MissingParameter("access_token"));
    }
    Ok(())
}

pub(crate) fn require(value: &str, name: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OneDriveError::MissingParameter(name));
    }
    Ok(())
}

macro_rules! common_setters {
    () => {
        /// Address a drive shared by another user.
        pub fn scope(mut self, scope: DriveScope) -> Self {
            self.scope = scope;
            self
        }

        /// Override the client's retry budget for this call.
        pub fn retry_options(mut self, options: RetryOptions) -> Self {
            self.retry_options = Some(options);
            self
        }
    };
}

/// Create a folder under a parent item.
#[derive(Debug, Clone)]
pub struct CreateFolderParams {
    pub access_token: AccessToken,
    /// Parent folder id, `root` by default
    pub parent_id: String,
    pub name: String,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl CreateFolderParams {
    pub fn new(access_token: impl Into<AccessToken>, name: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            parent_id: "root".to_string(),
            name: name.into(),
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.name, "name")
    }
}

/// Delete an item (file or folder).
#[derive(Debug, Clone)]
pub struct DeleteParams {
    pub access_token: AccessToken,
    pub item_id: String,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl DeleteParams {
    pub fn new(access_token: impl Into<AccessToken>, item_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: item_id.into(),
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.item_id, "item_id")
    }
}

/// Download an item's content.
#[derive(Debug, Clone)]
pub struct DownloadParams {
    pub access_token: AccessToken,
    pub item_id: String,
    /// Value of the `Range` header, e.g. `bytes=0-1023`
    pub range: Option<String>,
    pub scope: DriveScope,
    /// Per-call override of `DriveConfig::retry_downloads`
    pub retry: Option<bool>,
    pub retry_options: Option<RetryOptions>,
}

impl DownloadParams {
    pub fn new(access_token: impl Into<AccessToken>, item_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: item_id.into(),
            range: None,
            scope: DriveScope::Me,
            retry: None,
            retry_options: None,
        }
    }

    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn retry(mut self, enabled: bool) -> Self {
        self.retry = Some(enabled);
        self
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.item_id, "item_id")
    }
}

/// Fetch an item's metadata.
#[derive(Debug, Clone)]
pub struct GetMetadataParams {
    pub access_token: AccessToken,
    pub item_id: String,
    /// Query string pairs such as `("$select", "id,name,size")`
    pub query: Vec<(String, String)>,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl GetMetadataParams {
    pub fn new(access_token: impl Into<AccessToken>, item_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: item_id.into(),
            query: Vec::new(),
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.item_id, "item_id")
    }
}

/// Fetch the drive resource itself (quota, owner, drive type).
#[derive(Debug, Clone)]
pub struct DriveMetadataParams {
    pub access_token: AccessToken,
    pub query: Vec<(String, String)>,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl DriveMetadataParams {
    pub fn new(access_token: impl Into<AccessToken>) -> Self {
        Self {
            access_token: access_token.into(),
            query: Vec::new(),
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)
    }
}

/// List the children of a folder.
#[derive(Debug, Clone)]
pub struct ListChildrenParams {
    pub access_token: AccessToken,
    /// Folder id, `root` by default
    pub item_id: String,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl ListChildrenParams {
    pub fn new(access_token: impl Into<AccessToken>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: "root".to_string(),
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    pub fn item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = item_id.into();
        self
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.item_id, "item_id")
    }
}

/// Default thumbnail edge length in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 128;

/// Fetch a thumbnail rendition of an item.
#[derive(Debug, Clone)]
pub struct ThumbnailParams {
    pub access_token: AccessToken,
    pub item_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: bool,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl ThumbnailParams {
    pub fn new(access_token: impl Into<AccessToken>, item_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: item_id.into(),
            width: None,
            height: None,
            crop: false,
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    common_setters!();

    /// Custom size selector, `c{height}x{width}` with an optional `_crop`.
    pub fn selector(&self) -> String {
        format!(
            "c{}x{}{}",
            self.height.unwrap_or(DEFAULT_THUMBNAIL_SIZE),
            self.width.unwrap_or(DEFAULT_THUMBNAIL_SIZE),
            if self.crop { "_crop" } else { "" }
        )
    }

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.item_id, "item_id")
    }
}

/// Upload a small file with a single PUT.
#[derive(Debug, Clone)]
pub struct UploadSimpleParams {
    pub access_token: AccessToken,
    pub file_name: String,
    pub parent: ParentReference,
    pub scope: DriveScope,
}

impl UploadSimpleParams {
    pub fn new(access_token: impl Into<AccessToken>, file_name: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            file_name: file_name.into(),
            parent: ParentReference::default(),
            scope: DriveScope::Me,
        }
    }

    pub fn parent(mut self, parent: ParentReference) -> Self {
        self.parent = parent;
        self
    }

    pub fn scope(mut self, scope: DriveScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.file_name, "file_name")
    }
}

/// Patch an item's metadata, e.g. `{"name": "renamed"}`.
#[derive(Debug, Clone)]
pub struct UpdateParams {
    pub access_token: AccessToken,
    pub item_id: String,
    pub to_update: Value,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl UpdateParams {
    pub fn new(
        access_token: impl Into<AccessToken>,
        item_id: impl Into<String>,
        to_update: Value,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: item_id.into(),
            to_update,
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.item_id, "item_id")?;
        match &self.to_update {
            Value::Null => Err(OneDriveError::MissingParameter("to_update")),
            Value::Object(fields) if fields.is_empty() => {
                Err(OneDriveError::MissingParameter("to_update"))
            }
            Value::Object(_) => Ok(()),
            other => Err(OneDriveError::InvalidParameter(format!(
                "to_update must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Upload a file of known size through a resumable upload session.
#[derive(Debug, Clone)]
pub struct UploadSessionParams {
    pub access_token: AccessToken,
    pub file_name: String,
    pub parent: ParentReference,
    /// Exact number of bytes the source will yield
    pub file_size: u64,
    /// Stream chunks buffered per PUT, `DriveConfig::chunk_group_size` by default
    pub chunk_group_size: Option<usize>,
    pub scope: DriveScope,
    pub retry_options: Option<RetryOptions>,
}

impl UploadSessionParams {
    pub fn new(
        access_token: impl Into<AccessToken>,
        file_name: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            file_name: file_name.into(),
            parent: ParentReference::default(),
            file_size,
            chunk_group_size: None,
            scope: DriveScope::Me,
            retry_options: None,
        }
    }

    pub fn parent(mut self, parent: ParentReference) -> Self {
        self.parent = parent;
        self
    }

    pub fn chunk_group_size(mut self, size: usize) -> Self {
        self.chunk_group_size = Some(size);
        self
    }

    common_setters!();

    pub fn validate(&self) -> Result<()> {
        require_token(&self.access_token)?;
        require(&self.file_name, "file_name")?;
        if self.chunk_group_size == Some(0) {
            return Err(OneDriveError::InvalidParameter(
                "chunk_group_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
