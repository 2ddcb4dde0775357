use std::fmt;

use bytes::Bytes;
use url::Url;

use crate::view_model::{AppViewModel, ProgressView};
use crate::{Phase, Status};

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uploading,
    Receiving,
    Writing,
    Done,
}

/// The file the user picked, held in memory until another one replaces it.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
    /// Local reference used to show the original image without uploading it.
    pub preview: Url,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
        preview: Url,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
            preview,
        }
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .field("preview", &self.preview.as_str())
            .finish()
    }
}

/// The stored server response, shown by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub source: Url,
    pub byte_len: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    /// Non-success HTTP status. `message` is the server's `error` field or the status text.
    Server { message: String },
    Network { description: String },
    Timeout { description: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    selected: Option<SelectedFile>,
    /// Bumped on every pick, including a re-pick of the same path.
    selection: u64,
    phase: Phase,
    status: Status,
    processed: Option<ProcessedImage>,
    in_flight: Option<RequestId>,
    progress: Option<ProgressView>,
    next_request_id: RequestId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            original: self.selected.as_ref().map(|file| file.preview.clone()),
            original_name: self.selected.as_ref().map(|file| file.name.clone()),
            selection: self.selection,
            processed: self.processed.clone(),
            phase: self.phase,
            status: self.status.clone(),
            busy: self.in_flight.is_some(),
            progress: self.progress,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Returns whether anything visible changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn select_file(&mut self, file: SelectedFile) {
        self.selected = Some(file);
        self.selection += 1;
        self.dirty = true;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.dirty = true;
        }
    }

    pub(crate) fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
        self.dirty = true;
    }

    /// Allocates the next request id and marks it as the only one whose response counts.
    /// Returns the new id and the superseded one, if any.
    pub(crate) fn begin_request(&mut self) -> (RequestId, Option<RequestId>) {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let superseded = self.in_flight.replace(request_id);
        self.progress = None;
        self.set_status(Status::Uploading);
        (request_id, superseded)
    }

    /// Clears the in-flight request if `request_id` is it. Stale ids return false.
    pub(crate) fn finish_request(&mut self, request_id: RequestId) -> bool {
        if self.in_flight != Some(request_id) {
            return false;
        }
        self.in_flight = None;
        self.progress = None;
        true
    }

    pub(crate) fn take_in_flight(&mut self) -> Option<RequestId> {
        let request_id = self.in_flight.take()?;
        self.progress = None;
        Some(request_id)
    }

    pub(crate) fn apply_progress(&mut self, request_id: RequestId, stage: Stage, bytes: Option<u64>) {
        if self.in_flight != Some(request_id) {
            return;
        }
        let next = Some(ProgressView { stage, bytes });
        if self.progress != next {
            self.progress = next;
            self.dirty = true;
        }
    }

    pub(crate) fn set_processed(&mut self, image: ProcessedImage) {
        self.processed = Some(image);
        self.dirty = true;
    }
}
