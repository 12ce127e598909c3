//! Storage client for the Cura4Pif backend
//!
//! Uploads pet photos into a bucket, removes them again and builds the
//! public URLs the app stores in its rows.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use url::Url;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Error body returned by the Storage API.
///
/// `statusCode` is sent as a string (`"403"`) and may disagree with the HTTP
/// status of the response, which is often a plain 400.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct StorageApiError {
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StorageApiError {
    /// `statusCode` as a number, whether it arrived as a string or a number
    pub fn status_code(&self) -> Option<u16> {
        match self.status_code.as_ref()? {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for StorageApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => write!(f, "{}: {}", error, message),
            (None, Some(message)) => write!(f, "{}", message),
            (Some(error), None) => write!(f, "{}", error),
            (None, None) => write!(f, "unknown storage error"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: StorageApiError,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Effective status: the body's `statusCode` when present, else the HTTP status
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StorageError::ApiError { details, status } => details
                .status_code()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .or(Some(*status)),
            StorageError::UnparsedApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message, without the status decoration
    pub fn message(&self) -> String {
        match self {
            StorageError::ApiError { details, .. } => details.to_string(),
            StorageError::UnparsedApiError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

async fn error_from_response(response: Response) -> StorageError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    match serde_json::from_str::<StorageApiError>(&error_text) {
        Ok(details) if details.error.is_some() || details.message.is_some() => {
            StorageError::ApiError { details, status }
        }
        _ => StorageError::UnparsedApiError {
            message: error_text,
            status,
        },
    }
}

/// Upload options
#[derive(Debug, Clone, Serialize, Default)]
pub struct FileOptions {
    pub cache_control: Option<String>,
    pub content_type: Option<String>,
    pub upsert: Option<bool>,
}

impl FileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_control(mut self, cache_control: &str) -> Self {
        self.cache_control = Some(cache_control.to_string());
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }
}

/// Response to a successful upload
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadResponse {
    /// `<bucket>/<path>`
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}

/// Client for one bucket
pub struct StorageBucketClient<'a> {
    parent: &'a StorageClient,
    bucket_id: String,
}

/// Storage client
#[derive(Debug, Clone)]
pub struct StorageClient {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    http_client: Client,
}

impl StorageClient {
    pub fn new(base_url: &str, api_key: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            http_client,
        }
    }

    /// Act on behalf of a signed-in user instead of the anon role
    pub fn with_auth(mut self, access_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self
    }

    pub fn from<'a>(&'a self, bucket_id: &str) -> StorageBucketClient<'a> {
        StorageBucketClient {
            parent: self,
            bucket_id: bucket_id.to_string(),
        }
    }

    fn bearer(&self) -> String {
        format!(
            "Bearer {}",
            self.access_token.as_deref().unwrap_or(&self.api_key)
        )
    }
}

impl<'a> StorageBucketClient<'a> {
    fn object_url(&self, path: &str) -> Result<Url> {
        if path.is_empty() || path.starts_with('/') {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(Url::parse(&format!(
            "{}/storage/v1/object/{}/{}",
            self.parent.base_url, self.bucket_id, path
        ))?)
    }

    /// Upload `contents` to `path` inside the bucket
    pub async fn upload(
        &self,
        path: &str,
        contents: Vec<u8>,
        options: Option<FileOptions>,
    ) -> Result<UploadResponse> {
        let url = self.object_url(path)?;
        let options = options.unwrap_or_default();

        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let mut part = Part::bytes(contents).file_name(file_name);
        if let Some(content_type) = &options.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = Form::new();
        if let Some(cache_control) = &options.cache_control {
            form = form.text("cacheControl", cache_control.clone());
        }
        let form = form.part("file", part);

        log::debug!("uploading {} to bucket {}", path, self.bucket_id);

        let response = self
            .parent
            .http_client
            .post(url)
            .header("apikey", &self.parent.api_key)
            .header("Authorization", self.parent.bearer())
            .header("x-upsert", options.upsert.unwrap_or(false).to_string())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json::<UploadResponse>().await?)
    }

    /// Remove objects
    pub async fn remove(&self, paths: &[&str]) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.parent.base_url, self.bucket_id
        );

        let response = self
            .parent
            .http_client
            .delete(&url)
            .header("apikey", &self.parent.api_key)
            .header("Authorization", self.parent.bearer())
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(())
    }

    pub fn get_public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.parent.base_url, self.bucket_id, path
        )
    }

    /// Inverse of [`get_public_url`](Self::get_public_url)
    pub fn path_from_public_url<'u>(&self, public_url: &'u str) -> Option<&'u str> {
        let prefix = format!(
            "{}/storage/v1/object/public/{}/",
            self.parent.base_url, self.bucket_id
        );
        public_url
            .strip_prefix(prefix.as_str())
            .filter(|path| !path.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_upload_returns_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/cat-photos/cats/abc.jpg"))
            .and(header("apikey", "fake-key"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Key": "cat-photos/cats/abc.jpg",
                "Id": "obj-1"
            })))
            .mount(&mock_server)
            .await;

        let storage = StorageClient::new(&mock_server.uri(), "fake-key", Client::new())
            .with_auth("user-token");

        let uploaded = storage
            .from("cat-photos")
            .upload(
                "cats/abc.jpg",
                vec![0xff, 0xd8, 0xff],
                Some(
                    FileOptions::new()
                        .with_content_type("image/jpeg")
                        .with_cache_control("3600"),
                ),
            )
            .await
            .unwrap();

        assert_eq!(uploaded.key, "cat-photos/cats/abc.jpg");
        assert_eq!(uploaded.id.as_deref(), Some("obj-1"));
    }

    #[tokio::test]
    async fn test_upload_policy_violation_reports_body_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/cat-photos/cats/abc.png"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "statusCode": "403",
                "error": "Unauthorized",
                "message": "new row violates row-level security policy"
            })))
            .mount(&mock_server)
            .await;

        let storage = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        let err = storage
            .from("cat-photos")
            .upload("cats/abc.png", vec![1, 2, 3], None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.message().contains("row-level security"));
    }

    #[tokio::test]
    async fn test_remove_sends_prefixes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/cat-photos"))
            .and(body_json(json!({ "prefixes": ["cats/abc.jpg"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let storage = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        storage
            .from("cat-photos")
            .remove(&["cats/abc.jpg"])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unparsed_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/cat-photos"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let storage = StorageClient::new(&mock_server.uri(), "fake-key", Client::new());
        match storage.from("cat-photos").remove(&["x"]).await.unwrap_err() {
            StorageError::UnparsedApiError { message, status } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "Bad Gateway");
            }
            e => panic!("Expected UnparsedApiError, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_upload_keeps_base_path_prefix() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/supa/storage/v1/object/cat-photos/cats/abc.png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Key": "cat-photos/cats/abc.png"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let base_url = format!("{}/supa", mock_server.uri());
        let storage = StorageClient::new(&base_url, "fake-key", Client::new());
        let uploaded = storage
            .from("cat-photos")
            .upload("cats/abc.png", vec![1, 2, 3], None)
            .await
            .unwrap();

        assert_eq!(uploaded.key, "cat-photos/cats/abc.png");
    }

    #[test]
    fn test_public_url_round_trip() {
        let storage = StorageClient::new("https://proj.supabase.co/", "fake-key", Client::new());
        let bucket = storage.from("cat-photos");

        let url = bucket.get_public_url("cats/abc.jpg");
        assert_eq!(
            url,
            "https://proj.supabase.co/storage/v1/object/public/cat-photos/cats/abc.jpg"
        );
        assert_eq!(bucket.path_from_public_url(&url), Some("cats/abc.jpg"));
        assert_eq!(
            bucket.path_from_public_url("https://placekitten.com/300/300?image=3"),
            None
        );
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let storage = StorageClient::new("https://proj.supabase.co", "fake-key", Client::new());
        assert!(matches!(
            storage.from("cat-photos").object_url(""),
            Err(StorageError::InvalidPath(_))
        ));
    }
}
