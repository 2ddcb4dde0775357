//! Upload core: pure controller state machine and view-model helpers.
mod effect;
mod msg;
mod phase;
mod state;
mod status;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use phase::{Phase, UnknownPhase};
pub use state::{AppState, ProcessedImage, RequestId, SelectedFile, Stage, UploadFailure};
pub use status::Status;
pub use update::update;
pub use view_model::{AppViewModel, ProgressView};
