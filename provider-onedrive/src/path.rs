//! Resource path resolution
//!
//! Maps a [`DriveScope`] to its REST prefix (`me/` or `users/<user>/`) and
//! builds the item paths used by each operation. Paths are relative to
//! [`DriveConfig::api_base_url`](core_runtime::config::DriveConfig), which
//! always ends with `/`.

use crate::error::{OneDriveError, Result};
use crate::types::{DriveScope, ParentReference};

/// REST prefix for the drive addressed by `scope`.
pub fn scope_prefix(scope: &DriveScope) -> Result<String> {
    match scope {
        DriveScope::Me => Ok("me/".to_string()),
        DriveScope::SharedBy { user } => {
            let user = user.trim();
            if user.is_empty() {
                return Err(OneDriveError::MissingParameter("user"));
            }
            Ok(format!("users/{}/", urlencoding::encode(user)))
        }
    }
}

/// Percent-encode each segment of a slash separated path.
///
/// Leading, trailing and repeated slashes are dropped.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn join_path(parent: &str, file_name: &str) -> String {
    let parent = encode_path(parent);
    let file_name = urlencoding::encode(file_name);
    if parent.is_empty() {
        file_name.into_owned()
    } else {
        format!("{}/{}", parent, file_name)
    }
}

fn encode_id(id: &str) -> String {
    let id = id.trim();
    if id.is_empty() {
        "root".to_string()
    } else {
        urlencoding::encode(id).into_owned()
    }
}

pub fn drive() -> String {
    "drive".to_string()
}

pub fn item(item_id: &str) -> String {
    format!("drive/items/{}", encode_id(item_id))
}

pub fn children(item_id: &str) -> String {
    format!("drive/items/{}/children", encode_id(item_id))
}

pub fn content(item_id: &str) -> String {
    format!("drive/items/{}/content", encode_id(item_id))
}

/// First thumbnail set of an item; the size is chosen with `select`.
pub fn thumbnail(item_id: &str) -> String {
    format!("drive/items/{}/thumbnails/0", encode_id(item_id))
}

/// Target of a single-request upload.
pub fn simple_upload(parent: &ParentReference, file_name: &str) -> String {
    match parent {
        ParentReference::Id(id) => format!(
            "drive/items/{}/children/{}/content",
            encode_id(id),
            urlencoding::encode(file_name)
        ),
        ParentReference::Path(path) => {
            format!("drive/root:/{}:/content", join_path(path, file_name))
        }
    }
}

/// Endpoint that registers a resumable upload session.
pub fn create_upload_session(parent: &ParentReference, file_name: &str) -> String {
    match parent {
        ParentReference::Id(id) => format!(
            "drive/items/{}:/{}:/createUploadSession",
            encode_id(id),
            urlencoding::encode(file_name)
        ),
        ParentReference::Path(path) => format!(
            "drive/root:/{}:/createUploadSession",
            join_path(path, file_name)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_prefix() {
        assert_eq!(scope_prefix(&DriveScope::Me).unwrap(), "me/");
        assert_eq!(
            scope_prefix(&DriveScope::shared_by("alice@contoso.com")).unwrap(),
            "users/alice%40contoso.com/"
        );
        assert!(matches!(
            scope_prefix(&DriveScope::shared_by(" ")),
            Err(OneDriveError::MissingParameter("user"))
        ));
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("/Documents//Q1 Reports/"), "Documents/Q1%20Reports");
        assert_eq!(encode_path(""), "");
        assert_eq!(encode_path("/"), "");
    }

    #[test]
    fn test_item_paths() {
        assert_eq!(item("ABC123"), "drive/items/ABC123");
        assert_eq!(children(""), "drive/items/root/children");
        assert_eq!(content("ABC123"), "drive/items/ABC123/content");
        assert_eq!(thumbnail("ABC123"), "drive/items/ABC123/thumbnails/0");
        assert_eq!(drive(), "drive");
    }

    #[test]
    fn test_upload_session_paths() {
        assert_eq!(
            create_upload_session(&ParentReference::default(), "video.mp4"),
            "drive/items/root:/video.mp4:/createUploadSession"
        );
        assert_eq!(
            create_upload_session(&ParentReference::path("Videos/2024"), "my video.mp4"),
            "drive/root:/Videos/2024/my%20video.mp4:/createUploadSession"
        );
        assert_eq!(
            create_upload_session(&ParentReference::path("/"), "a.bin"),
            "drive/root:/a.bin:/createUploadSession"
        );
    }

    #[test]
    fn test_simple_upload_paths() {
        assert_eq!(
            simple_upload(&ParentReference::id("F1"), "notes.txt"),
            "drive/items/F1/children/notes.txt/content"
        );
        assert_eq!(
            simple_upload(&ParentReference::path("Documents"), "notes.txt"),
            "drive/root:/Documents/notes.txt:/content"
        );
    }
}
