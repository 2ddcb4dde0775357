use url::Url;

use crate::{Phase, ProcessedImage, Stage, Status};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    /// Source of the original (preview) image.
    pub original: Option<Url>,
    pub original_name: Option<String>,
    /// Changes with every file pick, so a re-pick of the same path still repaints.
    pub selection: u64,
    /// The image returned by the server.
    pub processed: Option<ProcessedImage>,
    pub phase: Phase,
    pub status: Status,
    pub busy: bool,
    pub progress: Option<ProgressView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressView {
    pub stage: Stage,
    pub bytes: Option<u64>,
}
