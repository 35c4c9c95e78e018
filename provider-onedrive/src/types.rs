//! Drive item types
//!
//! Items are passed through verbatim as JSON objects; the accessors below
//! only read the handful of fields callers commonly need.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Bearer token supplied by the caller for a single call.
///
/// `Debug` never prints the token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&String> for AccessToken {
    fn from(token: &String) -> Self {
        Self(token.clone())
    }
}

/// Whose drive a request addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DriveScope {
    /// The signed-in user's drive
    #[default]
    Me,
    /// A drive shared by another user
    SharedBy { user: String },
}

impl DriveScope {
    pub fn shared_by(user: impl Into<String>) -> Self {
        DriveScope::SharedBy { user: user.into() }
    }
}

/// Destination folder of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentReference {
    /// Folder item id; `root` addresses the drive root
    Id(String),
    /// Folder path relative to the drive root, e.g. `Documents/Reports`
    Path(String),
}

impl ParentReference {
    pub fn id(id: impl Into<String>) -> Self {
        ParentReference::Id(id.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        ParentReference::Path(path.into())
    }
}

impl Default for ParentReference {
    fn default() -> Self {
        ParentReference::Id("root".to_string())
    }
}

/// A drive item (file or folder) as returned by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Size in bytes; folders report the total size of their contents.
    pub fn size(&self) -> Option<u64> {
        self.0.get("size").and_then(Value::as_u64)
    }

    pub fn is_folder(&self) -> bool {
        self.0.contains_key("folder")
    }

    pub fn is_file(&self) -> bool {
        self.0.contains_key("file")
    }

    /// Raw access to any other field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A single thumbnail rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Snapshot of an upload session's progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransferProgress {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    pub fn new(uploaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            uploaded_bytes,
            total_bytes,
        }
    }

    /// Percentage complete in `0.0..=100.0`. An empty file has nothing to
    /// transfer and reports 100.
    pub fn percent_complete(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.uploaded_bytes as f64 / self.total_bytes as f64) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.uploaded_bytes >= self.total_bytes
    }
}

/// One page of `children`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChildrenPage {
    #[serde(default)]
    pub value: Vec<Item>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Response of `createUploadSession`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadSessionResponse {
    pub upload_url: String,
    #[serde(default)]
    pub expiration_date_time: Option<String>,
}
