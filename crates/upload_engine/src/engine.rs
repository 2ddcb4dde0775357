use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use upload_logging::{upload_info, upload_warn};

use crate::filename::result_filename;
use crate::persist::AtomicFileWriter;
use crate::upload::{progress, run_upload, ChannelProgressSink, ProgressSink, UploadRequest};
use crate::{
    EngineEvent, FailureKind, RequestId, ReqwestUploader, Stage, UploadError, UploadOutcome,
    UploadOutput, UploadSettings, Uploader,
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub settings: UploadSettings,
    /// Where processed images are stored before being displayed.
    pub output_dir: PathBuf,
}

enum EngineCommand {
    Upload(UploadRequest),
    Cancel { request_id: RequestId },
}

type TokenMap = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// Handle to the background upload engine. Cheap to clone.
///
/// The engine thread and its runtime stop once every handle is dropped.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    events: EngineEvents,
}

/// Receiving side of the engine's events. Holding it does not keep the engine alive.
#[derive(Clone)]
pub struct EngineEvents {
    rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineEvents {
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.rx.lock().ok()?.try_recv().ok()
    }

    /// Waits up to `timeout`. `Disconnected` means the engine has shut down.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        let rx = self.rx.lock().map_err(|_| RecvTimeoutError::Disconnected)?;
        rx.recv_timeout(timeout)
    }
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let uploader = Arc::new(ReqwestUploader::new(config.settings));
        Self::with_uploader(uploader, config.output_dir)
    }

    pub fn with_uploader(uploader: Arc<dyn Uploader>, output_dir: PathBuf) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let writer = AtomicFileWriter::new(output_dir);

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let tokens: TokenMap = Arc::default();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Upload(request) => {
                        let cancel = CancellationToken::new();
                        if let Ok(mut map) = tokens.lock() {
                            map.insert(request.request_id, cancel.clone());
                        }
                        let uploader = uploader.clone();
                        let writer = writer.clone();
                        let event_tx = event_tx.clone();
                        let tokens = tokens.clone();
                        runtime.spawn(async move {
                            let request_id = request.request_id;
                            handle_upload(uploader.as_ref(), &writer, request, cancel, event_tx)
                                .await;
                            if let Ok(mut map) = tokens.lock() {
                                map.remove(&request_id);
                            }
                        });
                    }
                    EngineCommand::Cancel { request_id } => {
                        let token = tokens.lock().ok().and_then(|mut map| map.remove(&request_id));
                        match token {
                            Some(token) => token.cancel(),
                            None => upload_info!(
                                "Cancel request_id={} ignored: not in flight",
                                request_id
                            ),
                        }
                    }
                }
            }
            upload_info!("All engine handles dropped; shutting down");
        });

        Self {
            cmd_tx,
            events: EngineEvents {
                rx: Arc::new(Mutex::new(event_rx)),
            },
        }
    }

    pub fn upload(&self, request: UploadRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Upload(request));
    }

    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }

    pub fn events(&self) -> EngineEvents {
        self.events.clone()
    }
}

async fn handle_upload(
    uploader: &dyn Uploader,
    writer: &AtomicFileWriter,
    request: UploadRequest,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let request_id = request.request_id;
    upload_info!(
        "Upload request_id={} file={} phase={}",
        request_id,
        request.file_name,
        request.phase
    );

    let result = match run_upload(uploader, &request, &sink, &cancel).await {
        Ok(output) => store_output(writer, &request, output, &sink),
        Err(err) => Err(err),
    };

    match &result {
        Ok(outcome) => upload_info!(
            "Upload request_id={} stored {} bytes at {:?}",
            request_id,
            outcome.byte_len,
            outcome.path
        ),
        Err(err) => upload_warn!("Upload request_id={} failed: {}", request_id, err),
    }
    let _ = event_tx.send(EngineEvent::UploadCompleted { request_id, result });
}

fn store_output(
    writer: &AtomicFileWriter,
    request: &UploadRequest,
    output: UploadOutput,
    sink: &dyn ProgressSink,
) -> Result<UploadOutcome, UploadError> {
    let byte_len = output.bytes.len() as u64;
    sink.emit(progress(request.request_id, Stage::Writing, Some(byte_len)));

    let filename = result_filename(
        &request.file_name,
        &request.phase,
        &output.bytes,
        output.content_type.as_deref(),
    );
    let path = writer
        .write(&filename, &output.bytes)
        .map_err(|err| UploadError::new(FailureKind::Persist, err.to_string()))?;

    sink.emit(progress(request.request_id, Stage::Done, Some(byte_len)));
    Ok(UploadOutcome {
        path,
        byte_len,
        content_type: output.content_type,
    })
}
