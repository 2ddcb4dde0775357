use std::fmt;
use std::path::PathBuf;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uploading,
    Receiving,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub request_id: RequestId,
    pub stage: Stage,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(UploadProgress),
    UploadCompleted {
        request_id: RequestId,
        result: Result<UploadOutcome, UploadError>,
    },
}

/// Raw success response of the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutput {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// A processed image stored on disk, ready to be displayed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub byte_len: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    pub kind: FailureKind,
    /// Human-readable description. For `HttpStatus` this is the server's `error`
    /// field or the status text.
    pub message: String,
}

impl UploadError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    InvalidResponse,
    Cancelled,
    Persist,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Persist => write!(f, "persist error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
