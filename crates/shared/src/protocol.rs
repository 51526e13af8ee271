use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CallId, CallStatus, StorageMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    pub created_at: DateTime<Utc>,
    pub s3_key: String,
    pub status: CallStatus,
    pub original_filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
}

/// Upload destination handed out for a single attempt. `upload_url` is either
/// an absolute presigned URL or a server-relative path in local mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignResponse {
    pub upload_url: String,
    pub s3_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCallRequest {
    pub s3_key: String,
    pub original_filename: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StorageModeResponse {
    pub mode: StorageMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
