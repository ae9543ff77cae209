// API client module: a small blocking client for the parts of the Drive v3
// API this tool needs (query by name, create folder, create/update file).
// The `Drive` trait is what the upload logic talks to.

use anyhow::{Context, Result};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Cursor, Read};

use crate::auth::TokenSource;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const BOUNDARY: &str = "drive_upload_7c1e9a40f3b2";
const FILE_FIELDS: &str = "files(id,name,mimeType,parents)";

/// A file or folder as reported by the Drive API.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Metadata sent alongside an upload or folder creation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// An opened local file ready to be streamed as the media part.
pub struct UploadMedia {
    pub file: File,
    pub len: u64,
    pub content_type: String,
}

/// Remote operations needed by the uploader.
pub trait Drive {
    /// First non-trashed item named exactly `name` directly inside `parent_id`.
    fn find_by_name(&self, name: &str, parent_id: &str) -> Result<Option<DriveFile>>;
    fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile>;
    fn create_file(&self, metadata: &FileMetadata, media: UploadMedia) -> Result<DriveFile>;
    /// Replace content and metadata of `file_id`, attaching it to `add_parent`.
    fn update_file(
        &self,
        file_id: &str,
        add_parent: &str,
        metadata: &FileMetadata,
        media: UploadMedia,
    ) -> Result<DriveFile>;
}

/// Drive v3 client. One instance (and one token source) serves the whole run.
pub struct DriveClient<T> {
    client: Client,
    tokens: T,
    api_base: String,
    upload_base: String,
}

impl<T: TokenSource> DriveClient<T> {
    pub fn new(client: Client, tokens: T) -> Self {
        DriveClient {
            client,
            tokens,
            api_base: DRIVE_API_BASE.into(),
            upload_base: UPLOAD_API_BASE.into(),
        }
    }

    /// Point the client at other endpoints, e.g. a local mock server.
    pub fn with_base_urls(mut self, api_base: &str, upload_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.upload_base = upload_base.trim_end_matches('/').to_string();
        self
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.bearer_token()?;
        Ok(req.header(AUTHORIZATION, format!("Bearer {}", token)))
    }

    fn send_multipart(
        &self,
        req: RequestBuilder,
        metadata: &FileMetadata,
        media: UploadMedia,
    ) -> Result<DriveFile> {
        let (body, len) = multipart_body(metadata, media)?;
        let res = self
            .authorized(req)?
            .header(CONTENT_TYPE, format!("multipart/related; boundary={}", BOUNDARY))
            .body(Body::sized(body, len))
            .send()
            .context("Failed to send upload request")?;
        let res = ensure_success(res, "Upload")?;
        res.json().context("Parsing upload response json")
    }
}

impl<T: TokenSource> Drive for DriveClient<T> {
    fn find_by_name(&self, name: &str, parent_id: &str) -> Result<Option<DriveFile>> {
        let url = format!("{}/files", self.api_base);
        let query = name_query(name, parent_id);
        let req = self.client.get(&url).query(&[
            ("q", query.as_str()),
            ("fields", FILE_FIELDS),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        let res = self
            .authorized(req)?
            .send()
            .context("error searching for file by name")?;
        let res = ensure_success(res, "File search")?;
        let list: DriveFileList = res.json().context("Parsing file list json")?;
        Ok(list.files.into_iter().next())
    }

    fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files", self.api_base);
        let metadata = FileMetadata {
            name: name.to_string(),
            mime_type: Some(FOLDER_MIME_TYPE.into()),
            parents: vec![parent_id.to_string()],
        };
        let req = self
            .client
            .post(&url)
            .query(&[("supportsAllDrives", "true")])
            .json(&metadata);
        let res = self
            .authorized(req)?
            .send()
            .context("Failed to send create folder request")?;
        let res = ensure_success(res, "Create folder")?;
        res.json().context("Parsing create folder response json")
    }

    fn create_file(&self, metadata: &FileMetadata, media: UploadMedia) -> Result<DriveFile> {
        let url = format!("{}/files", self.upload_base);
        let req = self
            .client
            .post(&url)
            .query(&[("uploadType", "multipart"), ("supportsAllDrives", "true")]);
        self.send_multipart(req, metadata, media)
    }

    fn update_file(
        &self,
        file_id: &str,
        add_parent: &str,
        metadata: &FileMetadata,
        media: UploadMedia,
    ) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.upload_base, file_id);
        let req = self.client.patch(&url).query(&[
            ("uploadType", "multipart"),
            ("addParents", add_parent),
            ("supportsAllDrives", "true"),
        ]);
        self.send_multipart(req, metadata, media)
    }
}

fn ensure_success(res: Response, what: &str) -> Result<Response> {
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_default();
        anyhow::bail!("{} failed: {} - {}", what, status, txt);
    }
    Ok(res)
}

/// Drive query matching an exact, non-trashed name inside one parent.
pub fn name_query(name: &str, parent_id: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_query_value(name),
        escape_query_value(parent_id)
    )
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build a streaming multipart/related body: JSON metadata, then the file.
fn multipart_body(
    metadata: &FileMetadata,
    media: UploadMedia,
) -> Result<(impl Read + Send + 'static, u64)> {
    let json = serde_json::to_string(metadata).context("Serializing file metadata")?;
    let head = format!(
        concat!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{json}\r\n",
            "--{b}\r\nContent-Type: {ct}\r\n\r\n",
        ),
        b = BOUNDARY,
        json = json,
        ct = media.content_type,
    )
    .into_bytes();
    let tail = format!("\r\n--{}--\r\n", BOUNDARY).into_bytes();
    let len = head.len() as u64 + media.len + tail.len() as u64;
    let body = Cursor::new(head)
        .chain(media.file.take(media.len))
        .chain(Cursor::new(tail));
    Ok((body, len))
}
