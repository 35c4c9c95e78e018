//! Resumable chunked upload sessions
//!
//! ## Protocol
//!
//! 1. A POST to `createUploadSession` registers the upload and returns a
//!    pre-authenticated upload URL.
//! 2. The source stream is pulled chunk by chunk into a buffer. The buffer is
//!    flushed when it holds `chunk_group_size` chunks or when it completes the
//!    file.
//! 3. Each flush is one `PUT` of `Content-Range: bytes start-end/total` to the
//!    upload URL, under the retry policy. The source is not polled while a PUT
//!    or a retry delay is outstanding.
//! 4. A 200, 201 or 203 response carries the finalised item and ends the
//!    session. Other non-error statuses acknowledge the range.
//!
//! Any failure after step 1 sends a single best-effort `DELETE` to the upload
//! URL so that no server-side session is left behind.
//!
//! The upload URL embeds a temporary credential. It is never logged nor put on
//! the event bus; sessions are identified by a client-generated id instead.

use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::RetryOptions;
use bytes::{Bytes, BytesMut};
use core_runtime::events::UploadEvent;
use futures::{Stream, StreamExt};
use serde_json::json;
use std::io;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::{parse_json, OneDriveClient};
use crate::error::{CleanupOutcome, OneDriveError, Result};
use crate::params::UploadSessionParams;
use crate::path;
use crate::retry::with_retry;
use crate::types::{AccessToken, Item, TransferProgress, UploadSessionResponse};

/// Statuses that carry the finalised item.
const FINAL_STATUSES: [u16; 3] = [200, 201, 203];

impl OneDriveClient {
    /// Prepare an upload session. No request is sent until
    /// [`UploadSession::upload`] is awaited.
    pub fn new_upload_session(&self, params: UploadSessionParams) -> Result<UploadSession> {
        params.validate()?;

        let create_url = self.url(
            &params.scope,
            &path::create_upload_session(&params.parent, &params.file_name),
        )?;
        let (progress_tx, _) = watch::channel(TransferProgress::new(0, params.file_size));

        Ok(UploadSession {
            client: self.clone(),
            session_id: Uuid::new_v4().to_string(),
            retry_options: self.retry_options(params.retry_options.as_ref()),
            chunk_group_size: params
                .chunk_group_size
                .unwrap_or(self.config().chunk_group_size),
            access_token: params.access_token,
            file_name: params.file_name,
            create_url,
            total_size: params.file_size,
            progress_tx,
        })
    }

    /// Upload `source` through a new session and return the finalised item.
    pub async fn upload_session<S>(&self, params: UploadSessionParams, source: S) -> Result<Item>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.new_upload_session(params)?.upload(source).await
    }
}

/// A single chunked upload of a file of known size.
///
/// Progress can be observed through [`progress`](Self::progress) and through
/// [`UploadEvent`]s on the client's event bus.
pub struct UploadSession {
    client: OneDriveClient,
    session_id: String,
    access_token: AccessToken,
    file_name: String,
    create_url: String,
    total_size: u64,
    chunk_group_size: usize,
    retry_options: RetryOptions,
    progress_tx: watch::Sender<TransferProgress>,
}

impl UploadSession {
    /// Client-side identifier used in logs and events.
    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_group_size(&self) -> usize {
        self.chunk_group_size
    }

    /// Receiver updated after every acknowledged chunk.
    ///
    /// The last value stays readable after the session ends.
    pub fn progress(&self) -> watch::Receiver<TransferProgress> {
        self.progress_tx.subscribe()
    }

    /// Create the session and stream `source` through it.
    ///
    /// `source` must yield exactly `file_size` bytes. Dropping the returned
    /// future cancels the upload without cleanup.
    #[instrument(
        skip(self, source),
        fields(
            session_id = %self.session_id,
            file_name = %self.file_name,
            total_bytes = self.total_size
        )
    )]
    pub async fn upload<S>(self, source: S) -> Result<Item>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let upload_url = self.create().await?;
        self.client.emit(UploadEvent::SessionCreated {
            session_id: self.session_id.clone(),
            file_name: self.file_name.clone(),
            total_bytes: self.total_size,
        });

        let mut state = TransferState::new(self.total_size);
        match self.transfer(&upload_url, source, &mut state).await {
            Ok(Outcome::Finalized(item)) => {
                info!(
                    item_id = item.id().unwrap_or_default(),
                    "Upload session completed"
                );
                self.client.emit(UploadEvent::Completed {
                    session_id: self.session_id.clone(),
                    file_name: self.file_name.clone(),
                    item_id: item.id().map(str::to_string),
                    total_bytes: self.total_size,
                });
                Ok(item)
            }
            Ok(Outcome::SourceEnded) => {
                warn!(
                    uploaded_bytes = state.uploaded,
                    "Source ended before the declared size, abandoning session"
                );
                let cleanup = self.cleanup(&upload_url).await;
                self.client.emit(UploadEvent::Abandoned {
                    session_id: self.session_id.clone(),
                    file_name: self.file_name.clone(),
                    uploaded_bytes: state.uploaded,
                    total_bytes: self.total_size,
                    cleaned_up: cleanup.is_deleted(),
                });
                Err(OneDriveError::SessionAbandoned {
                    uploaded_bytes: state.uploaded,
                    total_bytes: self.total_size,
                    cleanup,
                })
            }
            Err(error) => {
                warn!(uploaded_bytes = state.uploaded, error = %error, "Upload session failed");
                let cleanup = self.cleanup(&upload_url).await;
                debug!(cleanup = %cleanup, "Abandoned session cleanup");
                self.client.emit(UploadEvent::Failed {
                    session_id: self.session_id.clone(),
                    file_name: self.file_name.clone(),
                    uploaded_bytes: state.uploaded,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Register the session and return its upload URL. Single attempt.
    async fn create(&self) -> Result<String> {
        let request = HttpRequest::new(HttpMethod::Post, self.create_url.as_str())
            .bearer_token(self.access_token.as_str())
            .header("Accept", "application/json")
            .timeout(self.client.config().request_timeout)
            .json(&json!({
                "@microsoft.graph.conflictBehavior": "rename",
                "fileSystemInfo": { "@odata.type": "microsoft.graph.fileSystemInfo" },
                "name": self.file_name,
            }))?;

        let response = self.client.send(request).await?;
        let session: UploadSessionResponse = parse_json(&response, "upload session")?;
        debug!(
            expires = session.expiration_date_time.as_deref().unwrap_or("unknown"),
            "Upload session created"
        );
        Ok(session.upload_url)
    }

    async fn transfer<S>(
        &self,
        upload_url: &str,
        source: S,
        state: &mut TransferState,
    ) -> Result<Outcome>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        futures::pin_mut!(source);

        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(OneDriveError::SourceStream)?;
            if chunk.is_empty() {
                continue;
            }
            state.push(chunk)?;

            if state.should_flush(self.chunk_group_size) {
                if let Some(item) = self.flush(upload_url, state).await? {
                    return Ok(Outcome::Finalized(item));
                }
            }
        }

        if self.total_size == 0 {
            if let Some(item) = self.flush(upload_url, state).await? {
                return Ok(Outcome::Finalized(item));
            }
        }

        Ok(Outcome::SourceEnded)
    }

    /// PUT the buffered bytes. Returns the item once the server finalises it.
    async fn flush(&self, upload_url: &str, state: &mut TransferState) -> Result<Option<Item>> {
        let (start, payload) = state.take_payload();
        let length = payload.len() as u64;
        let range = content_range(start, length, self.total_size);

        debug!(start, length, "Uploading chunk");
        let response = with_retry(&self.retry_options, "upload_chunk", |_| {
            self.put_chunk(upload_url, payload.clone(), &range)
        })
        .await?;

        state.commit(length);
        let progress = state.progress();
        self.progress_tx.send_replace(progress);
        self.client.emit(UploadEvent::Progress {
            session_id: self.session_id.clone(),
            file_name: self.file_name.clone(),
            uploaded_bytes: progress.uploaded_bytes,
            total_bytes: progress.total_bytes,
            percent: progress.percent_complete(),
        });

        if FINAL_STATUSES.contains(&response.status) {
            return parse_json(&response, "finalised item").map(Some);
        }
        if progress.is_complete() {
            return Err(OneDriveError::Parse(format!(
                "final chunk acknowledged with status {} but no item",
                response.status
            )));
        }
        Ok(None)
    }

    async fn put_chunk(&self, upload_url: &str, payload: Bytes, range: &str) -> Result<HttpResponse> {
        let request = HttpRequest::new(HttpMethod::Put, upload_url)
            .header("Content-Length", payload.len().to_string())
            .header("Content-Range", range)
            .timeout(self.client.config().chunk_upload_timeout)
            .body(payload);

        let response = self.client.http_client().execute(request).await?;
        if response.status >= 400 {
            return Err(OneDriveError::Service {
                status: response.status,
                body: response.text_lossy(),
            });
        }
        Ok(response)
    }

    /// Best-effort DELETE of the upload URL. Never retried.
    async fn cleanup(&self, upload_url: &str) -> CleanupOutcome {
        let request = HttpRequest::new(HttpMethod::Delete, upload_url)
            .timeout(self.client.config().request_timeout);

        match self.client.http_client().execute(request).await {
            Ok(response) if response.is_success() => CleanupOutcome::Deleted {
                status: response.status,
            },
            Ok(response) => CleanupOutcome::Failed(format!("status {}", response.status)),
            Err(error) => CleanupOutcome::Failed(error.to_string()),
        }
    }
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("session_id", &self.session_id)
            .field("file_name", &self.file_name)
            .field("total_size", &self.total_size)
            .field("chunk_group_size", &self.chunk_group_size)
            .finish()
    }
}

enum Outcome {
    Finalized(Item),
    SourceEnded,
}

/// `bytes start-end/total` with an inclusive end, or `bytes */0` for an
/// empty file.
fn content_range(start: u64, length: u64, total: u64) -> String {
    if length == 0 {
        format!("bytes */{}", total)
    } else {
        format!("bytes {}-{}/{}", start, start + length - 1, total)
    }
}

/// Byte accounting for one session.
///
/// `uploaded + pending_bytes` never exceeds `total`.
#[derive(Debug)]
struct TransferState {
    total: u64,
    uploaded: u64,
    pending: Vec<Bytes>,
    pending_bytes: u64,
}

impl TransferState {
    fn new(total: u64) -> Self {
        Self {
            total,
            uploaded: 0,
            pending: Vec::new(),
            pending_bytes: 0,
        }
    }

    fn push(&mut self, chunk: Bytes) -> Result<()> {
        let received = self.uploaded + self.pending_bytes + chunk.len() as u64;
        if received > self.total {
            return Err(OneDriveError::SizeMismatch {
                declared: self.total,
                received,
            });
        }
        self.pending_bytes += chunk.len() as u64;
        self.pending.push(chunk);
        Ok(())
    }

    fn should_flush(&self, group_size: usize) -> bool {
        self.pending.len() >= group_size || self.uploaded + self.pending_bytes == self.total
    }

    /// Drain the buffer into one payload starting at the current offset.
    fn take_payload(&mut self) -> (u64, Bytes) {
        let payload = match self.pending.len() {
            0 => Bytes::new(),
            1 => self.pending.remove(0),
            _ => {
                let mut buf = BytesMut::with_capacity(self.pending_bytes as usize);
                for chunk in self.pending.drain(..) {
                    buf.extend_from_slice(&chunk);
                }
                buf.freeze()
            }
        };
        self.pending_bytes = 0;
        (self.uploaded, payload)
    }

    fn commit(&mut self, length: u64) {
        self.uploaded += length;
    }

    fn progress(&self) -> TransferProgress {
        TransferProgress::new(self.uploaded, self.total)
    }
}
