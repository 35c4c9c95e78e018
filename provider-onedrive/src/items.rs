//! Single-request item operations

use bridge_traits::http::{HttpMethod, HttpRequest, StreamingResponse};
use bridge_traits::{ByteStream, RetryOptions};
use bytes::Bytes;
use futures::Stream;
use serde_json::{json, Value};
use std::io;
use tracing::{debug, info, instrument, warn};

use crate::client::{check_status, parse_json, OneDriveClient};
use crate::error::{OneDriveError, Result};
use crate::params::{
    CreateFolderParams, DeleteParams, DownloadParams, DriveMetadataParams, GetMetadataParams,
    ListChildrenParams, ThumbnailParams, UpdateParams, UploadSimpleParams,
};
use crate::path;
use crate::types::{ChildrenPage, Item, Thumbnail};

impl OneDriveClient {
    /// Create a folder under `params.parent_id`.
    #[instrument(skip(self, params), fields(parent_id = %params.parent_id, name = %params.name))]
    pub async fn create_folder(&self, params: CreateFolderParams) -> Result<Item> {
        params.validate()?;

        let request = self
            .request(
                HttpMethod::Post,
                &params.access_token,
                &params.scope,
                &path::children(&params.parent_id),
            )?
            .json(&json!({ "name": params.name, "folder": {} }))?;

        let options = self.retry_options(params.retry_options.as_ref());
        let response = self.send_with_retry(request, &options, "create_folder").await?;
        let item: Item = parse_json(&response, "created folder")?;

        info!(item_id = item.id().unwrap_or_default(), "Folder created");
        Ok(item)
    }

    /// Delete an item. The service answers 204 with no content.
    #[instrument(skip(self, params), fields(item_id = %params.item_id))]
    pub async fn delete(&self, params: DeleteParams) -> Result<()> {
        params.validate()?;

        let request = self.request(
            HttpMethod::Delete,
            &params.access_token,
            &params.scope,
            &path::item(&params.item_id),
        )?;

        let options = self.retry_options(params.retry_options.as_ref());
        let response = self.send_with_retry(request, &options, "delete").await?;
        debug!(status = response.status, "Item deleted");
        Ok(())
    }

    /// Open an item's content as a stream.
    ///
    /// A single attempt unless download retry is enabled in the configuration
    /// or on the call. Only the initial response is retried; the returned
    /// body is never re-requested.
    #[instrument(skip(self, params), fields(item_id = %params.item_id, range = ?params.range))]
    pub async fn download(&self, params: DownloadParams) -> Result<StreamingResponse> {
        params.validate()?;

        let mut request = self.request(
            HttpMethod::Get,
            &params.access_token,
            &params.scope,
            &path::content(&params.item_id),
        )?;
        if let Some(range) = &params.range {
            request = request.header("Range", range.as_str());
        }

        let retry = params.retry.unwrap_or(self.config().retry_downloads);
        let options = if retry {
            self.retry_options(params.retry_options.as_ref())
        } else {
            RetryOptions::none()
        };

        let response = crate::retry::with_retry(&options, "download", |_| {
            self.open_download(request.clone())
        })
        .await?;

        debug!(status = response.status, "Download opened");
        Ok(response)
    }

    async fn open_download(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let response = self.http_client().download_stream(request).await?;
        if response.is_success() {
            return Ok(response);
        }
        let response = response.into_response().await?;
        Err(OneDriveError::Service {
            status: response.status,
            body: response.text_lossy(),
        })
    }

    #[instrument(skip(self, params), fields(item_id = %params.item_id))]
    pub async fn get_metadata(&self, params: GetMetadataParams) -> Result<Item> {
        params.validate()?;

        let mut request = self.request(
            HttpMethod::Get,
            &params.access_token,
            &params.scope,
            &path::item(&params.item_id),
        )?;
        for (key, value) in &params.query {
            request = request.query(key, value);
        }

        let options = self.retry_options(params.retry_options.as_ref());
        let response = self.send_with_retry(request, &options, "get_metadata").await?;
        parse_json(&response, "item metadata")
    }

    /// Fetch the drive resource (owner, quota, drive type).
    #[instrument(skip(self, params))]
    pub async fn get_drive_metadata(&self, params: DriveMetadataParams) -> Result<Value> {
        params.validate()?;

        let mut request = self.request(
            HttpMethod::Get,
            &params.access_token,
            &params.scope,
            &path::drive(),
        )?;
        for (key, value) in &params.query {
            request = request.query(key, value);
        }

        let options = self.retry_options(params.retry_options.as_ref());
        let response = self
            .send_with_retry(request, &options, "get_drive_metadata")
            .await?;
        parse_json(&response, "drive metadata")
    }

    /// List every child of a folder, following `@odata.nextLink` pages.
    #[instrument(skip(self, params), fields(item_id = %params.item_id))]
    pub async fn list_children(&self, params: ListChildrenParams) -> Result<Vec<Item>> {
        params.validate()?;

        let options = self.retry_options(params.retry_options.as_ref());
        let mut request = self.request(
            HttpMethod::Get,
            &params.access_token,
            &params.scope,
            &path::children(&params.item_id),
        )?;
        let mut items = Vec::new();
        let mut pages = 0u32;

        loop {
            let response = self
                .send_with_retry(request.clone(), &options, "list_children")
                .await?;
            let page: ChildrenPage = parse_json(&response, "children page")?;
            pages += 1;
            items.extend(page.value);

            match page.next_link {
                Some(next_link) => {
                    if !self.is_api_origin(&next_link) {
                        warn!(pages, "Refusing to follow a nextLink outside the API origin");
                        return Err(OneDriveError::Parse(format!(
                            "Children page {} links outside {}",
                            pages,
                            self.config().api_base_url
                        )));
                    }
                    request = HttpRequest::new(HttpMethod::Get, next_link)
                        .bearer_token(params.access_token.as_str())
                        .header("Accept", "application/json")
                        .timeout(self.config().request_timeout);
                }
                None => break,
            }
        }

        debug!(count = items.len(), pages, "Children listed");
        Ok(items)
    }

    /// Fetch one thumbnail rendition, or `None` when the service has none.
    #[instrument(skip(self, params), fields(item_id = %params.item_id))]
    pub async fn get_thumbnails(&self, params: ThumbnailParams) -> Result<Option<Thumbnail>> {
        params.validate()?;

        let selector = params.selector();
        let request = self
            .request(
                HttpMethod::Get,
                &params.access_token,
                &params.scope,
                &path::thumbnail(&params.item_id),
            )?
            .query("select", &selector);

        let options = self.retry_options(params.retry_options.as_ref());
        let response = self
            .send_with_retry(request, &options, "get_thumbnails")
            .await?;
        let set: Value = parse_json(&response, "thumbnail set")?;

        Ok(select_thumbnail(&set, &selector))
    }

    /// Upload a small file with one streamed PUT. Never retried.
    #[instrument(skip(self, params, source), fields(file_name = %params.file_name))]
    pub async fn upload_simple<S>(&self, params: UploadSimpleParams, source: S) -> Result<Item>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        params.validate()?;

        let request = self
            .request(
                HttpMethod::Put,
                &params.access_token,
                &params.scope,
                &path::simple_upload(&params.parent, &params.file_name),
            )?
            .header("Content-Type", "application/octet-stream")
            .timeout(self.config().chunk_upload_timeout);

        let body: ByteStream = Box::pin(source);
        let response = self
            .http_client()
            .execute_streaming(request, body)
            .await?;
        let response = check_status(response)?;
        let item: Item = parse_json(&response, "uploaded item")?;

        info!(item_id = item.id().unwrap_or_default(), "File uploaded");
        Ok(item)
    }

    /// Patch an item's metadata, e.g. to rename it.
    #[instrument(skip(self, params), fields(item_id = %params.item_id))]
    pub async fn update(&self, params: UpdateParams) -> Result<Item> {
        params.validate()?;

        let request = self
            .request(
                HttpMethod::Patch,
                &params.access_token,
                &params.scope,
                &path::item(&params.item_id),
            )?
            .json(&params.to_update)?;

        let options = self.retry_options(params.retry_options.as_ref());
        let response = self.send_with_retry(request, &options, "update").await?;
        parse_json(&response, "updated item")
    }
}

/// The rendition named by `selector` if present, else the first property
/// carrying a `url`.
fn select_thumbnail(set: &Value, selector: &str) -> Option<Thumbnail> {
    let object = set.as_object()?;
    let parse = |value: &Value| -> Option<Thumbnail> {
        value.get("url")?;
        serde_json::from_value(value.clone()).ok()
    };

    object
        .get(selector)
        .and_then(parse)
        .or_else(|| object.values().find_map(parse))
}
