//! Upload engine: image loading, multipart upload and result storage.
mod engine;
mod filename;
mod health;
mod persist;
mod source;
mod types;
mod upload;

pub use engine::{EngineConfig, EngineEvents, EngineHandle};
pub use filename::result_filename;
pub use health::{check_health, HealthReport};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use source::{load_image_file, ImageFileError, LocalImage};
pub use types::{
    EngineEvent, FailureKind, RequestId, Stage, UploadError, UploadOutcome, UploadOutput,
    UploadProgress,
};
pub use upload::{
    run_upload, ChannelProgressSink, ProgressSink, ReqwestUploader, UploadRequest, UploadSettings,
    Uploader, DEFAULT_ENDPOINT,
};
