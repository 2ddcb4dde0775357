use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use upload_logging::{upload_debug, upload_info};
use url::Url;

use crate::{EngineEvent, FailureKind, RequestId, Stage, UploadError, UploadOutput, UploadProgress};

/// Development server address of the processing backend.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:7860/process";

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// `None` waits for the server indefinitely.
    pub request_timeout: Option<Duration>,
    pub max_bytes: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            max_bytes: 32 * 1024 * 1024,
        }
    }
}

/// One submission: the picked file plus the phase label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub request_id: RequestId,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
    pub phase: String,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

pub(crate) fn progress(request_id: RequestId, stage: Stage, bytes: Option<u64>) -> EngineEvent {
    EngineEvent::Progress(UploadProgress {
        request_id,
        stage,
        bytes,
    })
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        request: &UploadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<UploadOutput, UploadError>;
}

/// Runs one upload until it finishes or `cancel` fires.
pub async fn run_upload(
    uploader: &dyn Uploader,
    request: &UploadRequest,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<UploadOutput, UploadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            upload_info!("Upload request_id={} cancelled", request.request_id);
            Err(UploadError::new(FailureKind::Cancelled, "upload cancelled"))
        }
        result = uploader.upload(request, sink) => result,
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: UploadSettings,
}

impl ReqwestUploader {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url, UploadError> {
    let url = Url::parse(endpoint)
        .map_err(|err| UploadError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UploadError::new(
            FailureKind::InvalidEndpoint,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

pub(crate) fn build_client(settings: &UploadSettings) -> Result<reqwest::Client, UploadError> {
    let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
    if let Some(timeout) = settings.request_timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| UploadError::new(FailureKind::Network, describe_error(&err)))
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(
        &self,
        request: &UploadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<UploadOutput, UploadError> {
        let endpoint = parse_endpoint(&self.settings.endpoint)?;
        let client = build_client(&self.settings)?;

        let image = Part::stream_with_length(request.bytes.clone(), request.bytes.len() as u64)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime)
            .map_err(|err| UploadError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let form = Form::new()
            .part("image", image)
            .text("phase", request.phase.clone());

        upload_debug!(
            "POST {} request_id={} phase={} bytes={}",
            endpoint,
            request.request_id,
            request.phase,
            request.bytes.len()
        );
        sink.emit(progress(
            request.request_id,
            Stage::Uploading,
            Some(request.bytes.len() as u64),
        ));

        let response = client
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let reason = reason_phrase(&response);
            // An unreadable body still leaves the status text to report.
            let body = response.bytes().await.unwrap_or_default();
            return Err(UploadError::new(
                FailureKind::HttpStatus(status.as_u16()),
                server_error_message(status, reason.as_deref(), &body),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(UploadError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        sink.emit(progress(request.request_id, Stage::Receiving, Some(0)));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(UploadError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
            sink.emit(progress(
                request.request_id,
                Stage::Receiving,
                Some(bytes.len() as u64),
            ));
        }

        Ok(UploadOutput {
            bytes,
            content_type,
        })
    }
}

/// The reason phrase the server sent, when it differs from the canonical one.
pub(crate) fn reason_phrase(response: &reqwest::Response) -> Option<String> {
    let reason = response.extensions().get::<hyper::ext::ReasonPhrase>()?;
    std::str::from_utf8(reason.as_bytes()).ok().map(str::to_string)
}

/// The `error` member of a JSON object body, else the status text.
///
/// A string member is used as-is; other truthy values (numbers, `true`, arrays,
/// objects) are shown as JSON. `null`, `false`, `0` and `""` count as absent.
pub(crate) fn server_error_message(
    status: StatusCode,
    reason: Option<&str>,
    body: &[u8],
) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| error_member(&value))
        .unwrap_or_else(|| status_text(status, reason))
}

fn error_member(body: &Value) -> Option<String> {
    match body.as_object()?.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some(message.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// The server's reason phrase, else the canonical one, else the numeric code.
pub(crate) fn status_text(status: StatusCode, reason: Option<&str>) -> String {
    reason
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .or_else(|| status.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> UploadError {
    let message = describe_error(&err);
    if err.is_timeout() {
        return UploadError::new(FailureKind::Timeout, message);
    }
    UploadError::new(FailureKind::Network, message)
}

/// Joins an error with its sources, e.g. `error sending request: connection refused`.
fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
