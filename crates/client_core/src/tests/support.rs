use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{CallId, CallStatus, StorageMode},
    protocol::{Call, HealthResponse, PresignResponse},
};
use tokio::sync::{Mutex, Semaphore};

use crate::{
    api::{CallsApi, UploadPayload},
    error::{ClientError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Health,
    StorageMode,
    Presign,
    Upload,
    Register,
    List,
}

pub(crate) struct RecordedUpload {
    pub upload_url: String,
    pub mode: StorageMode,
    pub payload: UploadPayload,
}

/// In-memory `CallsApi` that records every call and fails on request.
pub(crate) struct FakeApi {
    mode: StorageMode,
    listed: Vec<Call>,
    failing: Vec<Step>,
    gate: Option<Arc<Semaphore>>,
    steps: Mutex<Vec<Step>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub registrations: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            mode: StorageMode::S3,
            listed: Vec::new(),
            failing: Vec::new(),
            gate: None,
            steps: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_mode(mut self, mode: StorageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_calls(mut self, calls: Vec<Call>) -> Self {
        self.listed = calls;
        self
    }

    pub fn failing_at(mut self, step: Step) -> Self {
        self.failing.push(step);
        self
    }

    /// Presign and list wait for a permit on `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub async fn steps(&self) -> Vec<Step> {
        self.steps.lock().await.clone()
    }

    async fn enter(&self, step: Step) -> Result<()> {
        self.steps.lock().await.push(step);
        if let (Some(gate), Step::Presign | Step::List) = (&self.gate, step) {
            let _permit = gate.acquire().await.expect("gate closed");
        }
        if self.failing.contains(&step) {
            return Err(ClientError::Status {
                status: 500,
                detail: format!("injected {step:?} failure"),
            });
        }
        Ok(())
    }
}

pub(crate) fn sample_call(id: &str, filename: &str) -> Call {
    Call {
        id: CallId(id.to_string()),
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp"),
        s3_key: format!("calls/{id}.wav"),
        status: CallStatus::Uploaded,
        original_filename: filename.to_string(),
        duration_sec: None,
    }
}

#[async_trait]
impl CallsApi for FakeApi {
    async fn health(&self) -> Result<HealthResponse> {
        self.enter(Step::Health).await?;
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }

    async fn storage_mode(&self) -> Result<StorageMode> {
        self.enter(Step::StorageMode).await?;
        Ok(self.mode)
    }

    async fn presign(&self, filename: &str, _content_type: &str) -> Result<PresignResponse> {
        self.enter(Step::Presign).await?;
        let s3_key = format!("calls/fake-{filename}");
        let upload_url = match self.mode {
            StorageMode::S3 => format!("https://bucket.example/{s3_key}?X-Amz-Signature=abc"),
            StorageMode::Local => format!("/api/uploads/local/{s3_key}"),
        };
        Ok(PresignResponse { upload_url, s3_key })
    }

    async fn upload_file(
        &self,
        upload_url: &str,
        mode: StorageMode,
        payload: UploadPayload,
    ) -> Result<()> {
        self.enter(Step::Upload).await?;
        self.uploads.lock().await.push(RecordedUpload {
            upload_url: upload_url.to_string(),
            mode,
            payload,
        });
        Ok(())
    }

    async fn register_call(&self, s3_key: &str, original_filename: &str) -> Result<Call> {
        self.enter(Step::Register).await?;
        self.registrations
            .lock()
            .await
            .push((s3_key.to_string(), original_filename.to_string()));
        let mut call = sample_call("registered-1", original_filename);
        call.s3_key = s3_key.to_string();
        Ok(call)
    }

    async fn list_calls(&self) -> Result<Vec<Call>> {
        self.enter(Step::List).await?;
        Ok(self.listed.clone())
    }
}
