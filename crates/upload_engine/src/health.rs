use serde::Deserialize;
use upload_logging::upload_debug;

use crate::upload::{
    build_client, map_reqwest_error, parse_endpoint, reason_phrase, server_error_message,
};
use crate::{FailureKind, UploadError, UploadSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub url: String,
    pub status: String,
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// Probe `GET /` on the endpoint's server, which answers `{"status": "..."}`.
pub async fn check_health(settings: &UploadSettings) -> Result<HealthReport, UploadError> {
    let endpoint = parse_endpoint(&settings.endpoint)?;
    let url = endpoint
        .join("/")
        .map_err(|err| UploadError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
    let client = build_client(settings)?;

    upload_debug!("GET {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(map_reqwest_error)?;

    let status = response.status();
    let reason = reason_phrase(&response);
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        return Err(UploadError::new(
            FailureKind::HttpStatus(status.as_u16()),
            server_error_message(status, reason.as_deref(), &body),
        ));
    }

    let parsed: HealthBody = serde_json::from_slice(&body)
        .map_err(|err| UploadError::new(FailureKind::InvalidResponse, err.to_string()))?;
    Ok(HealthReport {
        url: url.to_string(),
        status: parsed.status,
    })
}
