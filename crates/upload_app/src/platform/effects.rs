use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use upload_core::{Effect, Msg, ProcessedImage, Stage, UploadFailure};
use upload_engine::{
    EngineEvent, EngineHandle, FailureKind, UploadError, UploadOutcome, UploadRequest,
};
use upload_logging::{upload_debug, upload_info};
use url::Url;

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_loop(msg_tx);
        runner
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload {
                    request_id,
                    file,
                    phase,
                } => {
                    upload_info!(
                        "Upload request_id={} file={} mime={} len={} phase={}",
                        request_id,
                        file.name,
                        file.mime,
                        file.bytes.len(),
                        phase
                    );
                    self.engine.upload(UploadRequest {
                        request_id,
                        file_name: file.name,
                        mime: file.mime,
                        bytes: file.bytes,
                        phase: phase.as_str().to_string(),
                    });
                }
                Effect::CancelUpload { request_id } => {
                    upload_info!("CancelUpload request_id={}", request_id);
                    self.engine.cancel(request_id);
                }
            }
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let events = self.engine.events();
        thread::spawn(move || loop {
            let event = match events.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    upload_debug!("Engine stopped; ending event loop");
                    break;
                }
            };
            if msg_tx.send(map_event(event)).is_err() {
                upload_debug!("Controller gone; stopping engine event loop");
                break;
            }
        });
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress(progress) => Msg::UploadProgress {
            request_id: progress.request_id,
            stage: map_stage(progress.stage),
            bytes: progress.bytes,
        },
        EngineEvent::UploadCompleted { request_id, result } => {
            match result.map_err(map_failure).and_then(map_outcome) {
                Ok(image) => Msg::UploadSucceeded { request_id, image },
                Err(failure) => Msg::UploadFailed {
                    request_id,
                    failure,
                },
            }
        }
    }
}

fn map_outcome(outcome: UploadOutcome) -> Result<ProcessedImage, UploadFailure> {
    let source = Url::from_file_path(&outcome.path).map_err(|()| UploadFailure::Network {
        description: format!("cannot reference {} as a file URL", outcome.path.display()),
    })?;
    Ok(ProcessedImage {
        source,
        byte_len: outcome.byte_len,
        content_type: outcome.content_type,
    })
}

fn map_failure(err: UploadError) -> UploadFailure {
    match err.kind {
        FailureKind::HttpStatus(_) => UploadFailure::Server {
            message: err.message,
        },
        FailureKind::Timeout => UploadFailure::Timeout {
            description: err.message,
        },
        FailureKind::Cancelled => UploadFailure::Cancelled,
        FailureKind::Network => UploadFailure::Network {
            description: err.message,
        },
        FailureKind::InvalidEndpoint
        | FailureKind::InvalidRequest
        | FailureKind::TooLarge { .. }
        | FailureKind::InvalidResponse
        | FailureKind::Persist => UploadFailure::Network {
            description: err.to_string(),
        },
    }
}

fn map_stage(stage: upload_engine::Stage) -> Stage {
    match stage {
        upload_engine::Stage::Uploading => Stage::Uploading,
        upload_engine::Stage::Receiving => Stage::Receiving,
        upload_engine::Stage::Writing => Stage::Writing,
        upload_engine::Stage::Done => Stage::Done,
    }
}
