//! Client side of the Support Auditor: API access, the upload flow and the
//! call list.

pub mod api;
pub mod calls;
pub mod error;
pub mod upload;

pub use api::{ApiClient, CallsApi, UploadPayload};
pub use calls::{CallListView, CallListViewer};
pub use error::{ClientError, Result};
pub use upload::{
    Severity, StagedFile, StatusMessage, UploadController, UploadEvent, UploadPhase,
    UploadSnapshot,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
