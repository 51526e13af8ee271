use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(CallId);

/// Lifecycle status of a call. Values are owned by the server; anything we do
/// not know about is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Uploaded,
    Processing,
    Failed,
    Other(String),
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Uploaded => "uploaded",
            CallStatus::Processing => "processing",
            CallStatus::Failed => "failed",
            CallStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for CallStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "uploaded" => CallStatus::Uploaded,
            "processing" => CallStatus::Processing,
            "failed" => CallStatus::Failed,
            _ => CallStatus::Other(value),
        }
    }
}

impl From<CallStatus> for String {
    fn from(value: CallStatus) -> Self {
        match value {
            CallStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where upload bytes go: straight to object storage, or through the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Local,
    S3,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::Local => "local",
            StorageMode::S3 => "s3",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
