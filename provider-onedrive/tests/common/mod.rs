//! In-memory drive used by the integration tests.
//!
//! Implements just enough of the items REST surface to exercise the client
//! end to end: folders, metadata, listing, patching, streamed content and
//! resumable upload sessions with byte-range bookkeeping.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{
    ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, StreamingResponse,
};
use bridge_traits::RetryOptions;
use bytes::Bytes;
use core_runtime::config::DriveConfig;
use futures::StreamExt;
use provider_onedrive::OneDriveClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://graph.test/v1.0/";
const DRIVE_PREFIX: &str = "https://graph.test/v1.0/me/";
const UPLOAD_PREFIX: &str = "https://upload.test/session/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub content_range: Option<String>,
}

#[derive(Debug)]
struct Session {
    parent_id: String,
    name: String,
    received: Vec<u8>,
    total: Option<u64>,
}

#[derive(Debug, Default)]
struct DriveState {
    items: HashMap<String, Value>,
    contents: HashMap<String, Vec<u8>>,
    sessions: HashMap<String, Session>,
    next_id: u64,
    next_session: u64,
    chunk_failures: u32,
    chunk_failure_status: u16,
    calls: Vec<RecordedCall>,
    deleted_sessions: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeDrive {
    state: Mutex<DriveState>,
}

impl FakeDrive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer the next `count` chunk PUTs with `status`.
    pub fn fail_next_chunk_puts(&self, count: u32, status: u16) {
        let mut state = self.state.lock().unwrap();
        state.chunk_failures = count;
        state.chunk_failure_status = status;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn chunk_puts(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == HttpMethod::Put && call.url.starts_with(UPLOAD_PREFIX))
            .collect()
    }

    pub fn deleted_sessions(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_sessions.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn content(&self, item_id: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().contents.get(item_id).cloned()
    }

    fn handle(&self, request: &HttpRequest, body: Option<Vec<u8>>) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: request.method,
            url: request.url.clone(),
            content_range: request.header_value("Content-Range").map(str::to_string),
        });

        if let Some(session_url) = request.url.strip_prefix(UPLOAD_PREFIX) {
            let key = session_url.to_string();
            return match request.method {
                HttpMethod::Put => state.put_chunk(&key, request, body.unwrap_or_default()),
                HttpMethod::Delete => {
                    if state.sessions.remove(&key).is_some() {
                        state.deleted_sessions.push(request.url.clone());
                        HttpResponse::new(204, "")
                    } else {
                        not_found()
                    }
                }
                _ => HttpResponse::new(405, ""),
            };
        }

        if request.header_value("Authorization").is_none() {
            return HttpResponse::new(401, r#"{"error":{"code":"unauthenticated"}}"#);
        }

        let Some(path) = request.url.strip_prefix(DRIVE_PREFIX) else {
            return not_found();
        };
        let path = path.split('?').next().unwrap_or_default().to_string();

        match (request.method, path.as_str()) {
            (HttpMethod::Get, "drive") => json_response(
                200,
                json!({ "id": "drive-1", "driveType": "personal", "quota": { "used": 0 } }),
            ),
            (HttpMethod::Post, p) if p.ends_with(":/createUploadSession") => {
                state.create_session(p, body.unwrap_or_default())
            }
            (HttpMethod::Post, p) if p.ends_with("/children") => {
                let parent = item_id(p.trim_end_matches("/children"));
                let patch: Value = serde_json::from_slice(&body.unwrap_or_default())
                    .unwrap_or_default();
                let name = patch["name"].as_str().unwrap_or_default().to_string();
                let item = state.insert_item(&parent, &name, json!({ "folder": { "childCount": 0 } }));
                json_response(201, item)
            }
            (HttpMethod::Get, p) if p.ends_with("/children") => {
                let parent = item_id(p.trim_end_matches("/children"));
                let mut children: Vec<Value> = state
                    .items
                    .values()
                    .filter(|item| item["parentReference"]["id"] == parent.as_str())
                    .cloned()
                    .collect();
                children.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
                json_response(200, json!({ "value": children }))
            }
            (HttpMethod::Get, p) if p.starts_with("drive/items/") => {
                match state.items.get(&item_id(p)) {
                    Some(item) => json_response(200, item.clone()),
                    None => not_found(),
                }
            }
            (HttpMethod::Patch, p) if p.starts_with("drive/items/") => {
                let patch: Value = serde_json::from_slice(&body.unwrap_or_default())
                    .unwrap_or_default();
                match state.items.get_mut(&item_id(p)) {
                    Some(item) => {
                        if let (Some(item), Some(patch)) = (item.as_object_mut(), patch.as_object()) {
                            for (key, value) in patch {
                                item.insert(key.clone(), value.clone());
                            }
                        }
                        json_response(200, item.clone())
                    }
                    None => not_found(),
                }
            }
            (HttpMethod::Delete, p) if p.starts_with("drive/items/") => {
                let id = item_id(p);
                if state.items.remove(&id).is_some() {
                    state.contents.remove(&id);
                    HttpResponse::new(204, "")
                } else {
                    not_found()
                }
            }
            (HttpMethod::Put, p) if p.ends_with("/content") => {
                let (parent, name) =
                    upload_target(p.trim_end_matches(":/content").trim_end_matches("/content"));
                let content = body.unwrap_or_default();
                let item = state.insert_item(
                    &parent,
                    &name,
                    json!({ "file": {}, "size": content.len() }),
                );
                let id = item["id"].as_str().unwrap_or_default().to_string();
                state.contents.insert(id, content);
                json_response(201, item)
            }
            _ => not_found(),
        }
    }
}

impl DriveState {
    fn insert_item(&mut self, parent: &str, name: &str, extra: Value) -> Value {
        self.next_id += 1;
        let id = format!("ITEM{:04}", self.next_id);
        let mut item = json!({
            "id": id,
            "name": name,
            "parentReference": { "id": parent },
        });
        if let (Some(item), Some(extra)) = (item.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                item.insert(key.clone(), value.clone());
            }
        }
        self.items.insert(id, item.clone());
        item
    }

    fn create_session(&mut self, path: &str, body: Vec<u8>) -> HttpResponse {
        let body: Value = serde_json::from_slice(&body).unwrap_or_default();
        if body["@microsoft.graph.conflictBehavior"] != "rename" {
            return HttpResponse::new(400, r#"{"error":{"code":"invalidRequest"}}"#);
        }
        let (parent, name) = upload_target(path.trim_end_matches(":/createUploadSession"));

        self.next_session += 1;
        let key = self.next_session.to_string();
        self.sessions.insert(
            key.clone(),
            Session {
                parent_id: parent,
                name,
                received: Vec::new(),
                total: None,
            },
        );
        json_response(
            200,
            json!({
                "uploadUrl": format!("{}{}", UPLOAD_PREFIX, key),
                "expirationDateTime": "2030-01-01T00:00:00Z"
            }),
        )
    }

    fn put_chunk(&mut self, key: &str, request: &HttpRequest, body: Vec<u8>) -> HttpResponse {
        if self.chunk_failures > 0 {
            self.chunk_failures -= 1;
            return HttpResponse::new(self.chunk_failure_status, "injected failure");
        }

        let Some(range) = request.header_value("Content-Range").map(str::to_string) else {
            return HttpResponse::new(400, "missing Content-Range");
        };
        let declared_length = request
            .header_value("Content-Length")
            .and_then(|value| value.parse::<usize>().ok());
        if declared_length != Some(body.len()) {
            return HttpResponse::new(400, "Content-Length mismatch");
        }

        let Some(session) = self.sessions.get_mut(key) else {
            return not_found();
        };

        let Some((start, end, total)) = parse_range(&range) else {
            return HttpResponse::new(400, "malformed Content-Range");
        };
        if *session.total.get_or_insert(total) != total {
            return HttpResponse::new(400, "total changed");
        }
        match (start, end) {
            (Some(start), Some(end)) => {
                if start != session.received.len() as u64 || end - start + 1 != body.len() as u64 {
                    return HttpResponse::new(416, "range not expected");
                }
            }
            _ if total == 0 && body.is_empty() => {}
            _ => return HttpResponse::new(400, "malformed Content-Range"),
        }
        session.received.extend_from_slice(&body);

        if session.received.len() as u64 == total {
            let Some(session) = self.sessions.remove(key) else {
                return not_found();
            };
            let item = self.insert_item(
                &session.parent_id,
                &session.name,
                json!({ "file": {}, "size": session.received.len() }),
            );
            let id = item["id"].as_str().unwrap_or_default().to_string();
            self.contents.insert(id, session.received);
            return json_response(201, item);
        }

        json_response(
            202,
            json!({ "nextExpectedRanges": [format!("{}-", session.received.len())] }),
        )
    }
}

/// `bytes a-b/t` or `bytes */t`.
fn parse_range(range: &str) -> Option<(Option<u64>, Option<u64>, u64)> {
    let rest = range.strip_prefix("bytes ")?;
    let (span, total) = rest.split_once('/')?;
    let total = total.parse().ok()?;
    if span == "*" {
        return Some((None, None, total));
    }
    let (start, end) = span.split_once('-')?;
    Some((Some(start.parse().ok()?), Some(end.parse().ok()?), total))
}

fn item_id(path: &str) -> String {
    path.trim_start_matches("drive/items/")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parent id and file name of an upload addressed by id or by path.
fn upload_target(path: &str) -> (String, String) {
    if let Some(rest) = path.strip_prefix("drive/root:/") {
        let name = rest.rsplit('/').next().unwrap_or_default();
        return ("root".to_string(), decode(name));
    }
    let rest = path.trim_start_matches("drive/items/");
    if let Some((parent, name)) = rest.split_once(":/") {
        return (parent.to_string(), decode(name));
    }
    let mut parts = rest.split('/');
    let parent = parts.next().unwrap_or_default().to_string();
    let name = parts.nth(1).unwrap_or_default();
    (parent, decode(name))
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, r#"{"error":{"code":"itemNotFound"}}"#)
}

#[async_trait]
impl HttpClient for FakeDrive {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let body = request.body.as_ref().map(|body| body.to_vec());
        Ok(self.handle(&request, body))
    }

    async fn execute_streaming(
        &self,
        request: HttpRequest,
        mut body: ByteStream,
    ) -> BridgeResult<HttpResponse> {
        let mut buffer = Vec::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        let mut request = request;
        request = request.header("Content-Length", buffer.len().to_string());
        Ok(self.handle(&request, Some(buffer)))
    }

    async fn download_stream(&self, request: HttpRequest) -> BridgeResult<StreamingResponse> {
        let response = {
            let id = request
                .url
                .strip_prefix(DRIVE_PREFIX)
                .and_then(|path| path.strip_suffix("/content"))
                .map(item_id)
                .ok_or_else(|| BridgeError::OperationFailed("unroutable download".to_string()))?;
            let state = self.state.lock().unwrap();
            match state.contents.get(&id) {
                Some(content) => HttpResponse::new(200, Bytes::from(content.clone())),
                None => not_found(),
            }
        };
        Ok(StreamingResponse {
            status: response.status,
            headers: HashMap::new(),
            body: Box::new(Cursor::new(response.body.to_vec())),
        })
    }
}

pub fn fast_retry(retries: u32) -> RetryOptions {
    RetryOptions::default()
        .with_retries(retries)
        .with_min_timeout(Duration::from_millis(1))
}

pub fn client_for(drive: &Arc<FakeDrive>, retries: u32) -> OneDriveClient {
    let http_client: Arc<dyn HttpClient> = drive.clone();
    let config = DriveConfig::builder()
        .api_base_url(BASE_URL)
        .http_client(http_client)
        .retry_options(fast_retry(retries))
        .event_buffer_size(4096)
        .build()
        .expect("valid test config");
    OneDriveClient::new(config)
}

/// Deterministic content of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Split `data` into stream chunks of `chunk_len` bytes.
pub fn chunked(data: &[u8], chunk_len: usize) -> Vec<std::io::Result<Bytes>> {
    data.chunks(chunk_len.max(1))
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect()
}
