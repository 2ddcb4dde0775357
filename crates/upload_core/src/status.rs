use std::fmt;

use crate::UploadFailure;

/// Text shown in the status line. Overwritten on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    NeedImage,
    Uploading,
    Done,
    ServerError(String),
    NetworkError(String),
    Cancelled,
}

impl From<&UploadFailure> for Status {
    fn from(failure: &UploadFailure) -> Self {
        match failure {
            UploadFailure::Server { message } => Status::ServerError(message.clone()),
            UploadFailure::Network { description } | UploadFailure::Timeout { description } => {
                Status::NetworkError(description.clone())
            }
            UploadFailure::Cancelled => Status::Cancelled,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "Choose an image and a phase, then submit."),
            Status::NeedImage => write!(f, "Please choose an image first."),
            Status::Uploading => write!(f, "Uploading and processing..."),
            Status::Done => write!(f, "Done."),
            Status::ServerError(message) => write!(f, "Server error: {message}"),
            Status::NetworkError(description) => write!(f, "Network error: {description}"),
            Status::Cancelled => write!(f, "Cancelled."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Status;
    use crate::UploadFailure;

    #[test]
    fn server_failure_keeps_message() {
        let status = Status::from(&UploadFailure::Server {
            message: "image file missing".to_string(),
        });
        assert_eq!(status.to_string(), "Server error: image file missing");
    }

    #[test]
    fn timeout_reads_as_network_error() {
        let status = Status::from(&UploadFailure::Timeout {
            description: "operation timed out".to_string(),
        });
        assert_eq!(status.to_string(), "Network error: operation timed out");
    }
}
