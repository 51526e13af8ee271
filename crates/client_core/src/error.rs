use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("{filename} is not an audio file (detected {content_type})")]
    UnsupportedMediaType {
        filename: String,
        content_type: String,
    },
    #[error("no file selected")]
    NoFileSelected,
    #[error("an upload is already in progress")]
    Busy,
}
