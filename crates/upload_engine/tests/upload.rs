use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use upload_engine::{
    run_upload, EngineEvent, FailureKind, ProgressSink, ReqwestUploader, Stage, UploadProgress,
    UploadRequest, UploadSettings, Uploader,
};
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nprocessed";

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn stages(&self) -> Vec<Stage> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(UploadProgress { stage, .. }) => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn request(phase: &str) -> UploadRequest {
    UploadRequest {
        request_id: 1,
        file_name: "scan.png".to_string(),
        mime: "image/png".to_string(),
        bytes: Bytes::from_static(b"original-image-bytes"),
        phase: phase.to_string(),
    }
}

fn uploader_for(server: &MockServer) -> ReqwestUploader {
    ReqwestUploader::new(UploadSettings {
        endpoint: format!("{}/process", server.uri()),
        ..UploadSettings::default()
    })
}

#[tokio::test]
async fn success_returns_image_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = TestSink::new();
    let output = uploader_for(&server)
        .upload(&request("arterial"), &sink)
        .await
        .expect("upload ok");

    assert_eq!(output.bytes, PNG_BYTES);
    assert_eq!(output.content_type.as_deref(), Some("image/png"));
    let stages = sink.stages();
    assert_eq!(stages.first(), Some(&Stage::Uploading));
    assert!(stages.contains(&Stage::Receiving));
}

#[tokio::test]
async fn form_carries_image_and_phase_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains(r#"name="image"; filename="scan.png""#))
        .and(body_string_contains(r#"name="phase""#))
        .and(body_string_contains("venous"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let output = uploader_for(&server)
        .upload(&request("venous"), &TestSink::new())
        .await
        .expect("multipart request matched");
    assert_eq!(output.bytes, PNG_BYTES);
}

#[tokio::test]
async fn json_error_body_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "phase must be 'arterial' or 'venous'"})),
        )
        .mount(&server)
        .await;

    let err = uploader_for(&server)
        .upload(&request("portal"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "phase must be 'arterial' or 'venous'");
}

#[tokio::test]
async fn json_error_member_must_be_in_an_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!(["boom"])))
        .mount(&server)
        .await;

    let err = uploader_for(&server)
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.message, "Bad Request");
}

#[tokio::test]
async fn non_json_error_uses_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(400).set_body_string("<h1>bad upload</h1>"))
        .mount(&server)
        .await;

    let err = uploader_for(&server)
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "Bad Request");
}

#[tokio::test]
async fn server_failure_without_body_uses_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = uploader_for(&server)
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.message, "Internal Server Error");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: format!("http://{addr}/process"),
        ..UploadSettings::default()
    });
    let err = uploader
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Network);
    assert!(
        err.message.to_lowercase().contains("refused"),
        "OS cause missing from {:?}",
        err.message
    );
}

/// Serves one canned HTTP/1.1 response after reading the whole multipart request.
fn serve_once(response: &'static str) -> std::net::SocketAddr {
    use std::io::{Read, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        while !request.ends_with(b"--\r\n") && !request.ends_with(b"\r\n0\r\n\r\n") {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&chunk[..n]),
            }
        }
        let _ = stream.write_all(response.as_bytes());
    });
    addr
}

#[tokio::test]
async fn server_reason_phrase_is_used_as_status_text() {
    let addr = serve_once(
        "HTTP/1.1 400 BAD REQUEST\r\nContent-Type: text/html\r\nContent-Length: 11\r\nConnection: close\r\n\r\n<p>nope</p>",
    );

    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: format!("http://{addr}/process"),
        ..UploadSettings::default()
    });
    let err = uploader
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(err.message, "BAD REQUEST");
}

#[tokio::test]
async fn invalid_endpoint_is_rejected_before_sending() {
    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: "localhost:7860/process".to_string(),
        ..UploadSettings::default()
    });
    let sink = TestSink::new();

    let err = uploader.upload(&request("arterial"), &sink).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::InvalidEndpoint);
    assert!(sink.stages().is_empty());
}

#[tokio::test]
async fn request_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw(PNG_BYTES, "image/png"),
        )
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: format!("{}/process", server.uri()),
        request_timeout: Some(Duration::from_millis(50)),
        ..UploadSettings::default()
    });
    let err = uploader
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn oversized_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "image/png"))
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: format!("{}/process", server.uri()),
        max_bytes: 16,
        ..UploadSettings::default()
    });
    let err = uploader
        .upload(&request("arterial"), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 16,
            actual: Some(64)
        }
    );
}

#[tokio::test]
async fn cancellation_aborts_slow_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_raw(PNG_BYTES, "image/png"),
        )
        .mount(&server)
        .await;

    let uploader = uploader_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = run_upload(&uploader, &request("arterial"), &TestSink::new(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}
