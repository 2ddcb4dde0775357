use crate::{Phase, RequestId, SelectedFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the file and phase to the configured endpoint.
    Upload {
        request_id: RequestId,
        file: SelectedFile,
        phase: Phase,
    },
    /// Abort an in-flight upload. Its eventual response is ignored either way.
    CancelUpload { request_id: RequestId },
}
