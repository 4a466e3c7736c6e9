use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use image_answer_backend::config::AppConfig;
use image_answer_backend::services::answer_service::AnswerService;
use image_answer_backend::{AppState, create_app};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OCR_KEY: &str = "test-ocr-key";
const COMPLETION_KEY: &str = "test-completion-key";
const BOUNDARY: &str = "----image-answer-test-boundary";
// ASCII-only so wiremock body matchers can inspect the OCR form
const JPEG_BYTES: &[u8] = b"fake jpeg payload";
const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";

struct TestApp {
    app: Router,
    upload_dir: TempDir,
}

impl TestApp {
    fn new(server: &MockServer) -> Self {
        Self::with_config(server, |_| {})
    }

    fn with_config(server: &MockServer, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let _ = tracing_subscriber::fmt::try_init();
        let upload_dir = tempfile::tempdir().unwrap();

        let base = Url::parse(&format!("{}/", server.uri())).unwrap();
        let mut config = AppConfig::with_provider_base(&base, OCR_KEY, COMPLETION_KEY);
        config.upload_dir = upload_dir.path().to_path_buf();
        tweak(&mut config);

        let state = AppState {
            answer_service: Arc::new(AnswerService::from_config(&config).unwrap()),
            config,
        };

        Self {
            app: create_app(state),
            upload_dir,
        }
    }

    fn staged_files(&self) -> usize {
        count_files(self.upload_dir.path())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn file_part(name: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(data);
    part.extend_from_slice(b"\r\n");
    part
}

fn text_part(name: &str, value: &str) -> Vec<u8> {
    format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
        .into_bytes()
}

fn multipart_request(parts: Vec<Vec<u8>>) -> Request<Body> {
    let mut body: Vec<u8> = parts.into_iter().flatten().collect();
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/extract-text")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn mount_ocr(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_completion(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_extract_text_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .and(body_string_contains(OCR_KEY))
        .and(body_string_contains("jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ParsedResults": [{ "ParsedText": "What is 2+2? A)3 B)4 C)5" }],
            "IsErroredOnProcessing": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header(
            "authorization",
            format!("Bearer {COMPLETION_KEY}").as_str(),
        ))
        .and(body_string_contains("What is 2+2? A)3 B)4 C)5"))
        .and(body_string_contains("llama3-8b-8192"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "**4** is the correct answer." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "question.jpg", "image/jpeg", JPEG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "text": "What is 2+2? A)3 B)4 C)5",
            "answer": "**4** is the correct answer."
        })
    );
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_missing_image_is_rejected_before_providers() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;
    mount_completion(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![text_part("comment", "no file here")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No image file provided" }));
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_empty_image_counts_as_missing() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "", "application/octet-stream", b"")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_rejected() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let request = Request::builder()
        .method("POST")
        .uri("/api/extract-text")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"image": "nope"}"#))
        .unwrap();
    let (status, body) = send(&test_app.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_second_image_is_rejected() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, _) = send(
        &test_app.app,
        multipart_request(vec![
            file_part("image", "a.jpg", "image/jpeg", JPEG_BYTES),
            file_part("image", "b.jpg", "image/jpeg", JPEG_BYTES),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_oversized_image_is_rejected() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::with_config(&server, |config| config.max_upload_size = 8);
    let (status, _) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "big.jpg", "image/jpeg", &[0xAB; 1024])]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_ocr_failure_skips_completion() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        ResponseTemplate::new(500).set_body_string("provider exploded: stack trace"),
        1,
    )
    .await;
    mount_completion(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "q.png", "image/png", JPEG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to process request" }));
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_ocr_processing_error_is_failure() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "IsErroredOnProcessing": true,
            "ErrorMessage": ["Unable to process the file"]
        })),
        1,
    )
    .await;
    mount_completion(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "q.png", "image/png", JPEG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to process request");
}

#[tokio::test]
async fn test_no_parsed_results_uses_sentinel() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "ParsedResults": [] })),
        1,
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_string_contains("No text found"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "I could not find a question." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "blank.jpg", "image/jpeg", JPEG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "No text found");
    assert_eq!(body["answer"], "I could not find a question.");
}

#[tokio::test]
async fn test_zero_choices_uses_sentinel() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "ParsedResults": [{ "ParsedText": "Name the capital of France." }]
        })),
        1,
    )
    .await;
    mount_completion(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })),
        1,
    )
    .await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "q.jpg", "image/jpeg", JPEG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Name the capital of France.");
    assert_eq!(body["answer"], "No response from AI");
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_completion_failure_returns_no_partial_result() {
    let server = MockServer::start().await;
    mount_ocr(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "ParsedResults": [{ "ParsedText": "Name the capital of France." }]
        })),
        1,
    )
    .await;
    mount_completion(
        &server,
        ResponseTemplate::new(503).set_body_string("upstream unavailable"),
        1,
    )
    .await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part("image", "q.jpg", "image/jpeg", JPEG_BYTES)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to process request" }));
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_octet_stream_upload_is_sniffed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/image"))
        .and(body_string_contains("image/gif"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ParsedResults": [{ "ParsedText": "2 + 2" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_completion(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "**4**" } }]
        })),
        1,
    )
    .await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![
            text_part("note", "pasted from clipboard"),
            file_part("image", "clipboard", "application/octet-stream", GIF_BYTES),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "**4**");
}

#[tokio::test]
async fn test_unrecognized_file_is_rejected() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, _) = send(
        &test_app.app,
        multipart_request(vec![file_part(
            "image",
            "notes.txt",
            "text/plain",
            b"just some words",
        )]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(test_app.staged_files(), 0);
}

#[tokio::test]
async fn test_sniffed_archive_is_not_an_image() {
    let server = MockServer::start().await;
    mount_ocr(&server, ResponseTemplate::new(200), 0).await;
    mount_completion(&server, ResponseTemplate::new(200), 0).await;

    let test_app = TestApp::new(&server);
    let (status, body) = send(
        &test_app.app,
        multipart_request(vec![file_part(
            "image",
            "scan.png",
            "application/octet-stream",
            b"PK\x03\x04\x14\x00\x00\x00\x08\x00archive",
        )]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Uploaded file is not a recognized image");
    assert_eq!(test_app.staged_files(), 0);
}
