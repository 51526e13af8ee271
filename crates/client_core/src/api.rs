//! HTTP client for the Support Auditor REST API.

use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::StorageMode,
    error::ApiErrorBody,
    protocol::{
        Call, HealthResponse, PresignRequest, PresignResponse, RegisterCallRequest,
        StorageModeResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

/// Bytes of one file on their way to an upload destination.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Remote operations the upload and listing flows depend on.
#[async_trait]
pub trait CallsApi: Send + Sync {
    async fn health(&self) -> Result<HealthResponse>;
    async fn storage_mode(&self) -> Result<StorageMode>;
    async fn presign(&self, filename: &str, content_type: &str) -> Result<PresignResponse>;
    async fn upload_file(
        &self,
        upload_url: &str,
        mode: StorageMode,
        payload: UploadPayload,
    ) -> Result<()>;
    async fn register_call(&self, s3_key: &str, original_filename: &str) -> Result<Call>;
    async fn list_calls(&self) -> Result<Vec<Call>>;
}

pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_http_client(server_url, Client::new())
    }

    pub fn with_http_client(server_url: &str, http: Client) -> Result<Self> {
        let mut base_url = Url::parse(server_url.trim())?;
        // Url::join drops the last path segment unless it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Presigned URLs are absolute; local-mode destinations are server paths
    /// such as `/api/uploads/local/calls/<id>.wav`.
    pub fn resolve_upload_url(&self, upload_url: &str) -> Result<Url> {
        Ok(self.base_url.join(upload_url.trim())?)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint("api/health")?;
        debug!(%url, "checking api health");
        let response = ensure_success(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn storage_mode(&self) -> Result<StorageMode> {
        let url = self.endpoint("api/uploads/storage-mode")?;
        let response = ensure_success(self.http.get(url).send().await?).await?;
        let body: StorageModeResponse = response.json().await?;
        Ok(body.mode)
    }

    pub async fn presign(&self, filename: &str, content_type: &str) -> Result<PresignResponse> {
        let url = self.endpoint("api/uploads/presign")?;
        debug!(%url, filename, content_type, "requesting upload destination");
        let response = self
            .http
            .post(url)
            .json(&PresignRequest {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
            })
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// Object-storage mode: raw body PUT against the presigned URL.
    pub async fn upload_to_s3(&self, upload_url: &str, payload: UploadPayload) -> Result<()> {
        let url = self.resolve_upload_url(upload_url)?;
        debug!(size_bytes = payload.bytes.len(), "uploading to object storage");
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, payload.content_type)
            .body(payload.bytes)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Local mode: multipart POST to the backend with the bytes in field `file`.
    pub async fn upload_to_local(&self, upload_url: &str, payload: UploadPayload) -> Result<()> {
        let url = self.resolve_upload_url(upload_url)?;
        debug!(%url, size_bytes = payload.bytes.len(), "uploading through backend");
        let part = Part::bytes(payload.bytes)
            .file_name(payload.filename)
            .mime_str(&payload.content_type)?;
        let form = Form::new().part("file", part);
        let response = self.http.post(url).multipart(form).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn upload_file(
        &self,
        upload_url: &str,
        mode: StorageMode,
        payload: UploadPayload,
    ) -> Result<()> {
        match mode {
            StorageMode::S3 => self.upload_to_s3(upload_url, payload).await,
            StorageMode::Local => self.upload_to_local(upload_url, payload).await,
        }
    }

    pub async fn register_call(&self, s3_key: &str, original_filename: &str) -> Result<Call> {
        let url = self.endpoint("api/calls")?;
        debug!(s3_key, original_filename, "registering call");
        let response = self
            .http
            .post(url)
            .json(&RegisterCallRequest {
                s3_key: s3_key.to_string(),
                original_filename: original_filename.to_string(),
            })
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    pub async fn list_calls(&self) -> Result<Vec<Call>> {
        let url = self.endpoint("api/calls")?;
        let response = ensure_success(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CallsApi for ApiClient {
    async fn health(&self) -> Result<HealthResponse> {
        ApiClient::health(self).await
    }

    async fn storage_mode(&self) -> Result<StorageMode> {
        ApiClient::storage_mode(self).await
    }

    async fn presign(&self, filename: &str, content_type: &str) -> Result<PresignResponse> {
        ApiClient::presign(self, filename, content_type).await
    }

    async fn upload_file(
        &self,
        upload_url: &str,
        mode: StorageMode,
        payload: UploadPayload,
    ) -> Result<()> {
        ApiClient::upload_file(self, upload_url, mode, payload).await
    }

    async fn register_call(&self, s3_key: &str, original_filename: &str) -> Result<Call> {
        ApiClient::register_call(self, s3_key, original_filename).await
    }

    async fn list_calls(&self) -> Result<Vec<Call>> {
        ApiClient::list_calls(self).await
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => parsed.detail,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };
    Err(ClientError::Status {
        status: status.as_u16(),
        detail,
    })
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
