//! # Google Cloud Storage client
//!
//! Implements the [`ObjectStore`] trait from `pdf-upload-core` against the GCS
//! JSON API using `reqwest`.
//!
//! - Bucket lookup: `GET /storage/v1/b/{bucket}`
//! - Upload: `POST /upload/storage/v1/b/{bucket}/o?uploadType=multipart` with a
//!   `multipart/related` body (object resource JSON, then the file bytes)
//!
//! Credentials come from [`StorageConfig`]; see [`crate::load_config`] for how
//! they are discovered. Nothing is retried.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::OnceCell;

pub use pdf_upload_core::contract::{
    BucketInfo, ObjectStore, ObjectUpload, StoreError, UploadedObject,
};

use crate::load_config::{load_config, Credentials, StorageConfig};

// Characters escaped in a URL path segment (the bucket name).
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub struct GcsClient {
    http: reqwest::Client,
    config: StorageConfig,
    // Metadata-server token, fetched once per client.
    token: OnceCell<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource<'a> {
    name: &'a str,
    content_type: &'a str,
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct BucketResource {
    name: String,
    #[serde(default)]
    location: Option<String>,
}

// The JSON API reports int64 fields as strings.
#[derive(Deserialize)]
struct ObjectResponse {
    bucket: String,
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    generation: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl GcsClient {
    pub fn new(config: StorageConfig) -> Self {
        GcsClient {
            http: reqwest::Client::new(),
            config,
            token: OnceCell::new(),
        }
    }

    /// Builds a client from the environment, see [`load_config`].
    pub fn new_from_env() -> anyhow::Result<Self> {
        let config = load_config()?;
        tracing::info!(
            endpoint = %config.endpoint,
            credentials = credentials_kind(&config.credentials),
            "Initialized GcsClient from environment"
        );
        Ok(GcsClient::new(config))
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!(
            "{}/storage/v1/b/{}",
            self.config.endpoint,
            utf8_percent_encode(bucket, PATH_SEGMENT)
        )
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=multipart",
            self.config.endpoint,
            utf8_percent_encode(bucket, PATH_SEGMENT)
        )
    }

    async fn bearer_token(&self) -> Result<Option<String>, StoreError> {
        match &self.config.credentials {
            Credentials::Anonymous => Ok(None),
            Credentials::AccessToken(token) => Ok(Some(token.clone())),
            Credentials::MetadataServer { token_url } => self
                .token
                .get_or_try_init(|| self.metadata_token(token_url))
                .await
                .map(|token| Some(token.clone())),
        }
    }

    async fn metadata_token(&self, token_url: &str) -> Result<String, StoreError> {
        tracing::debug!(token_url = %token_url, "Requesting access token from metadata server");
        let resp = self
            .http
            .get(token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, token_url = %token_url, "Metadata server unreachable");
                format!("could not obtain credentials from metadata server: {e}")
            })?;
        if !resp.status().is_success() {
            let err = api_error(resp, "token request").await;
            tracing::error!(error = %err, "Metadata server refused token request");
            return Err(err);
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }
}

fn credentials_kind(credentials: &Credentials) -> &'static str {
    match credentials {
        Credentials::Anonymous => "anonymous",
        Credentials::AccessToken(_) => "access_token",
        Credentials::MetadataServer { .. } => "metadata_server",
    }
}

async fn api_error(resp: Response, action: &str) -> StoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("GCS {action} failed with status {status}: {body}").into()
}

/// Assembles a `multipart/related` body: the JSON object resource followed by
/// the object content.
pub fn multipart_related_body(
    boundary: &str,
    resource_json: &[u8],
    content_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(resource_json.len() + content.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(resource_json);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn get_bucket(&self, name: &str) -> Result<BucketInfo, StoreError> {
        tracing::info!(bucket = name, "Fetching bucket");
        let mut req = self.http.get(self.bucket_url(name));
        if let Some(token) = self.bearer_token().await? {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::error!(error = ?e, bucket = name, "Bucket request failed");
            e
        })?;

        match resp.status() {
            status if status.is_success() => {
                let bucket: BucketResource = resp.json().await?;
                tracing::info!(bucket = %bucket.name, location = ?bucket.location, "Fetched bucket");
                Ok(BucketInfo {
                    name: bucket.name,
                    location: bucket.location,
                })
            }
            StatusCode::NOT_FOUND => {
                tracing::error!(bucket = name, "Bucket does not exist");
                Err(format!("bucket {name} not found").into())
            }
            _ => {
                let err = api_error(resp, "bucket lookup").await;
                tracing::error!(error = %err, bucket = name, "Failed to fetch bucket");
                Err(err)
            }
        }
    }

    async fn upload_file(&self, upload: ObjectUpload) -> Result<UploadedObject, StoreError> {
        tracing::info!(
            source = %upload.source.display(),
            bucket = %upload.bucket,
            object = %upload.object_key,
            "Uploading object"
        );

        let content = tokio::fs::read(&upload.source).await.map_err(|e| {
            tracing::error!(error = ?e, source = %upload.source.display(), "Failed to read upload source");
            e
        })?;

        let resource = serde_json::to_vec(&ObjectResource {
            name: &upload.object_key,
            content_type: &upload.content_type,
            metadata: &upload.metadata,
        })?;

        let boundary = format!("pdf_upload_{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &resource, &upload.content_type, &content);

        let mut req = self
            .http
            .post(self.upload_url(&upload.bucket))
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        if let Some(token) = self.bearer_token().await? {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::error!(error = ?e, object = %upload.object_key, "Upload request failed");
            e
        })?;

        if !resp.status().is_success() {
            let err = api_error(resp, "upload").await;
            tracing::error!(error = %err, object = %upload.object_key, "API error uploading object");
            return Err(err);
        }

        let object: ObjectResponse = resp.json().await?;
        tracing::info!(
            bucket = %object.bucket,
            name = %object.name,
            generation = ?object.generation,
            "Successfully uploaded object"
        );
        Ok(UploadedObject {
            bucket: object.bucket,
            name: object.name,
            size: object.size.and_then(|s| s.parse().ok()),
            generation: object.generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> GcsClient {
        GcsClient::new(StorageConfig {
            endpoint: endpoint.to_string(),
            credentials: Credentials::Anonymous,
        })
    }

    #[test]
    fn builds_json_api_urls() {
        let c = client("https://storage.googleapis.com");
        assert_eq!(
            c.bucket_url("mx-docs"),
            "https://storage.googleapis.com/storage/v1/b/mx-docs"
        );
        assert_eq!(
            c.upload_url("mx-docs"),
            "https://storage.googleapis.com/upload/storage/v1/b/mx-docs/o?uploadType=multipart"
        );
    }

    #[test]
    fn bucket_name_is_escaped_as_one_segment() {
        let c = client("http://localhost:9023");
        assert_eq!(
            c.bucket_url("odd/name?x"),
            "http://localhost:9023/storage/v1/b/odd%2Fname%3Fx"
        );
    }

    #[test]
    fn multipart_body_layout() {
        let body = multipart_related_body("XYZ", br#"{"name":"a.pdf"}"#, "application/pdf", b"%PDF");
        let expected = "--XYZ\r\n\
                        Content-Type: application/json; charset=UTF-8\r\n\r\n\
                        {\"name\":\"a.pdf\"}\r\n\
                        --XYZ\r\n\
                        Content-Type: application/pdf\r\n\r\n\
                        %PDF\r\n\
                        --XYZ--\r\n";
        assert_eq!(String::from_utf8(body).unwrap(), expected);
    }

    #[test]
    fn object_resource_uses_camel_case() {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), "Report Q1".to_string());
        let json = serde_json::to_string(&ObjectResource {
            name: "incoming/report.pdf",
            content_type: "application/pdf",
            metadata: &metadata,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"name":"incoming/report.pdf","contentType":"application/pdf","metadata":{"title":"Report Q1"}}"#
        );
    }
}
