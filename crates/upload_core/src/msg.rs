use crate::{Phase, ProcessedImage, RequestId, SelectedFile, Stage, UploadFailure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a file. `None` when the picker was dismissed.
    FileSelected(Option<SelectedFile>),
    /// User switched the phase radio button.
    PhaseSelected(Phase),
    /// User clicked Submit.
    SubmitClicked,
    /// User asked to abort the in-flight upload.
    CancelClicked,
    /// Engine progress for an upload.
    UploadProgress {
        request_id: RequestId,
        stage: Stage,
        bytes: Option<u64>,
    },
    /// Server answered with a success status and the image was stored.
    UploadSucceeded {
        request_id: RequestId,
        image: ProcessedImage,
    },
    /// Upload ended without a usable image.
    UploadFailed {
        request_id: RequestId,
        failure: UploadFailure,
    },
}
