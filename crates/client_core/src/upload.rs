//! Upload flow: stage an audio file, then presign, transfer and register it.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use shared::{domain::StorageMode, protocol::Call};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    api::{CallsApi, UploadPayload},
    error::{ClientError, Result},
};

pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(3);

// Fixed checkpoints; the transfer itself is not measured.
pub const PROGRESS_REQUESTING: u8 = 10;
pub const PROGRESS_TRANSFERRING: u8 = 30;
pub const PROGRESS_REGISTERING: u8 = 80;
pub const PROGRESS_DONE: u8 = 100;

pub const MSG_REQUESTING: &str = "Getting upload URL...";
pub const MSG_UPLOADING_S3: &str = "Uploading to S3...";
pub const MSG_UPLOADING_LOCAL: &str = "Uploading to server...";
pub const MSG_REGISTERING: &str = "Registering call metadata...";
pub const MSG_SUCCESS: &str = "Upload successful!";
pub const MSG_FAILED: &str = "Upload failed. Check logs for details.";
pub const MSG_NOT_AUDIO: &str = "Please select an audio file.";
pub const MSG_UNREADABLE: &str = "Selected file could not be read.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Dragging,
    Uploading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub phase: UploadPhase,
    pub staged: Option<StagedFile>,
    pub status: Option<StatusMessage>,
    pub progress: u8,
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    PhaseChanged(UploadPhase),
    Status(StatusMessage),
    Progress(u8),
    FileStaged(StagedFile),
    SelectionCleared,
    Registered(Call),
}

/// Returns the guessed content type when the extension maps to an audio type.
pub fn audio_content_type(path: &Path) -> Option<String> {
    let guess = mime_guess::from_path(path).first()?;
    (guess.type_() == mime_guess::mime::AUDIO).then(|| guess.essence_str().to_string())
}

struct UploadState {
    phase: UploadPhase,
    staged: Option<StagedFile>,
    status: Option<StatusMessage>,
    progress: u8,
}

pub struct UploadController {
    api: Arc<dyn CallsApi>,
    reset_delay: Duration,
    inner: Mutex<UploadState>,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadController {
    pub fn new(api: Arc<dyn CallsApi>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            api,
            reset_delay: DEFAULT_RESET_DELAY,
            inner: Mutex::new(UploadState {
                phase: UploadPhase::Idle,
                staged: None,
                status: None,
                progress: 0,
            }),
            events,
        }
    }

    pub fn with_reset_delay(mut self, reset_delay: Duration) -> Self {
        self.reset_delay = reset_delay;
        self
    }

    pub fn reset_delay(&self) -> Duration {
        self.reset_delay
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> UploadSnapshot {
        let guard = self.inner.lock().await;
        UploadSnapshot {
            phase: guard.phase,
            staged: guard.staged.clone(),
            status: guard.status.clone(),
            progress: guard.progress,
        }
    }

    fn emit(&self, event: UploadEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub async fn drag_enter(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.phase == UploadPhase::Uploading {
            return Err(ClientError::Busy);
        }
        if guard.phase != UploadPhase::Dragging {
            guard.phase = UploadPhase::Dragging;
            self.emit(UploadEvent::PhaseChanged(UploadPhase::Dragging));
        }
        Ok(())
    }

    pub async fn drag_leave(&self) {
        let mut guard = self.inner.lock().await;
        if guard.phase == UploadPhase::Dragging {
            guard.phase = UploadPhase::Idle;
            self.emit(UploadEvent::PhaseChanged(UploadPhase::Idle));
        }
    }

    pub async fn drop_file(&self, path: impl AsRef<Path>) -> Result<StagedFile> {
        self.drag_leave().await;
        self.select_file(path).await
    }

    /// Stages `path` for the next upload. Non-audio files are refused and
    /// leave nothing staged.
    pub async fn select_file(&self, path: impl AsRef<Path>) -> Result<StagedFile> {
        let path = path.as_ref();
        if self.inner.lock().await.phase == UploadPhase::Uploading {
            return Err(ClientError::Busy);
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let Some(content_type) = audio_content_type(path) else {
            let detected = mime_guess::from_path(path)
                .first_raw()
                .unwrap_or("unknown")
                .to_string();
            warn!(%filename, content_type = %detected, "rejected non-audio file");
            self.reject_selection(StatusMessage::error(MSG_NOT_AUDIO))
                .await?;
            return Err(ClientError::UnsupportedMediaType {
                filename,
                content_type: detected,
            });
        };

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                self.reject_selection(StatusMessage::error(MSG_UNREADABLE))
                    .await?;
                return Err(ClientError::Io {
                    path: path.display().to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "not a regular file",
                    ),
                });
            }
            Err(source) => {
                self.reject_selection(StatusMessage::error(MSG_UNREADABLE))
                    .await?;
                return Err(ClientError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let staged = StagedFile {
            path: path.to_path_buf(),
            filename,
            content_type,
            size_bytes: metadata.len(),
        };

        let mut guard = self.inner.lock().await;
        if guard.phase == UploadPhase::Uploading {
            return Err(ClientError::Busy);
        }
        guard.staged = Some(staged.clone());
        guard.phase = UploadPhase::Idle;
        guard.status = None;
        guard.progress = 0;
        info!(
            filename = %staged.filename,
            content_type = %staged.content_type,
            size_bytes = staged.size_bytes,
            "file staged"
        );
        self.emit(UploadEvent::FileStaged(staged.clone()));
        self.emit(UploadEvent::PhaseChanged(UploadPhase::Idle));
        Ok(staged)
    }

    async fn reject_selection(&self, status: StatusMessage) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.phase == UploadPhase::Uploading {
            return Err(ClientError::Busy);
        }
        let had_selection = guard.staged.take().is_some();
        guard.phase = UploadPhase::Error;
        guard.status = Some(status.clone());
        guard.progress = 0;
        if had_selection {
            self.emit(UploadEvent::SelectionCleared);
        }
        self.emit(UploadEvent::PhaseChanged(UploadPhase::Error));
        self.emit(UploadEvent::Status(status));
        Ok(())
    }

    pub async fn clear_selection(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.phase == UploadPhase::Uploading {
            return Err(ClientError::Busy);
        }
        guard.staged = None;
        guard.progress = 0;
        self.emit(UploadEvent::SelectionCleared);
        Ok(())
    }

    /// Runs presign, transfer and register for the staged file, strictly in
    /// that order. Any failure stops the sequence and leaves the controller
    /// in `Error`; nothing is retried or compensated.
    pub async fn upload(&self) -> Result<Call> {
        let staged = {
            let mut guard = self.inner.lock().await;
            if guard.phase == UploadPhase::Uploading {
                return Err(ClientError::Busy);
            }
            let Some(staged) = guard.staged.clone() else {
                return Err(ClientError::NoFileSelected);
            };
            guard.phase = UploadPhase::Uploading;
            guard.progress = 0;
            staged
        };
        self.emit(UploadEvent::PhaseChanged(UploadPhase::Uploading));

        match self.run_sequence(&staged).await {
            Ok(call) => {
                info!(call_id = %call.id, s3_key = %call.s3_key, "upload registered");
                {
                    let mut guard = self.inner.lock().await;
                    guard.phase = UploadPhase::Success;
                    guard.status = Some(StatusMessage::success(MSG_SUCCESS));
                    guard.progress = PROGRESS_DONE;
                }
                self.emit(UploadEvent::Progress(PROGRESS_DONE));
                self.emit(UploadEvent::Registered(call.clone()));
                self.emit(UploadEvent::PhaseChanged(UploadPhase::Success));
                self.emit(UploadEvent::Status(StatusMessage::success(MSG_SUCCESS)));

                tokio::time::sleep(self.reset_delay).await;
                self.reset_after_success(&staged).await;
                Ok(call)
            }
            Err(err) => {
                warn!(filename = %staged.filename, error = %err, "upload failed");
                {
                    let mut guard = self.inner.lock().await;
                    guard.phase = UploadPhase::Error;
                    guard.status = Some(StatusMessage::error(MSG_FAILED));
                }
                self.emit(UploadEvent::PhaseChanged(UploadPhase::Error));
                self.emit(UploadEvent::Status(StatusMessage::error(MSG_FAILED)));
                Err(err)
            }
        }
    }

    async fn run_sequence(&self, staged: &StagedFile) -> Result<Call> {
        let bytes = tokio::fs::read(&staged.path)
            .await
            .map_err(|source| ClientError::Io {
                path: staged.path.display().to_string(),
                source,
            })?;

        self.advance(PROGRESS_REQUESTING, StatusMessage::info(MSG_REQUESTING))
            .await;
        let mode = self.api.storage_mode().await?;
        let destination = self
            .api
            .presign(&staged.filename, &staged.content_type)
            .await?;
        info!(s3_key = %destination.s3_key, %mode, "upload destination issued");

        let uploading = match mode {
            StorageMode::S3 => MSG_UPLOADING_S3,
            StorageMode::Local => MSG_UPLOADING_LOCAL,
        };
        self.advance(PROGRESS_TRANSFERRING, StatusMessage::info(uploading))
            .await;
        let payload = UploadPayload {
            filename: staged.filename.clone(),
            content_type: staged.content_type.clone(),
            bytes,
        };
        if let Err(err) = self
            .api
            .upload_file(&destination.upload_url, mode, payload)
            .await
        {
            warn!(
                s3_key = %destination.s3_key,
                "transfer failed; issued destination is left unused"
            );
            return Err(err);
        }

        self.advance(PROGRESS_REGISTERING, StatusMessage::info(MSG_REGISTERING))
            .await;
        self.api
            .register_call(&destination.s3_key, &staged.filename)
            .await
    }

    async fn advance(&self, progress: u8, status: StatusMessage) {
        {
            let mut guard = self.inner.lock().await;
            guard.progress = progress;
            guard.status = Some(status.clone());
        }
        self.emit(UploadEvent::Progress(progress));
        self.emit(UploadEvent::Status(status));
    }

    async fn reset_after_success(&self, uploaded: &StagedFile) {
        let mut guard = self.inner.lock().await;
        // A file picked during the delay stays staged; drags do not matter.
        if guard.staged.as_ref() != Some(uploaded) || guard.phase == UploadPhase::Uploading {
            return;
        }
        guard.staged = None;
        guard.progress = 0;
        self.emit(UploadEvent::SelectionCleared);
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
