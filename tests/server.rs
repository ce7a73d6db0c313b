//! HTTP surface tests: the axum router driven in-process with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use srs_guard::server::router;
use srs_guard_core::mock::{LookupEmbedder, PlainTextExtractor, RecordingIndex, ScriptedSummarizer};
use srs_guard_core::models::IndexSpec;
use srs_guard_core::{DecisionEngine, DetectionConfig};

const BOUNDARY: &str = "srs-guard-test-boundary";
const SRS: &str = "1 Introduction\n1.1 Purpose\nA campus library portal.\n2 Overall Description\n";

fn make_app_with(summarizer: ScriptedSummarizer) -> (Router, Arc<RecordingIndex>) {
    let index = RecordingIndex::new();
    let engine = DecisionEngine::new(
        DetectionConfig {
            threshold: 0.75,
            top_k: 3,
            dims: 2,
            max_upload_bytes: 256,
        },
        IndexSpec::cosine("plagiarism-detection", 2),
        Arc::new(PlainTextExtractor::new()),
        Arc::new(summarizer),
        Arc::new(LookupEmbedder::new().with("A campus library portal.", vec![1.0, 0.0])),
        index.clone(),
    );
    (router(Arc::new(engine)), index)
}

fn make_app() -> (Router, Arc<RecordingIndex>) {
    make_app_with(ScriptedSummarizer::first_line(&["PHP"]))
}

/// One multipart part. `filename: None` omits the attribute entirely.
fn multipart_body(field: &str, filename: Option<&str>, content_type: &str, data: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };
    let mut body = format!(
        "--{}\r\nContent-Disposition: {}\r\nContent-Type: {}\r\n\r\n",
        BOUNDARY, disposition, content_type
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::post("/check-plagiarism")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _) = make_app();
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn original_then_duplicate_upload() {
    let (app, index) = make_app();

    let first = app
        .clone()
        .oneshot(upload(multipart_body("file", Some("library.pdf"), "application/pdf", SRS.as_bytes())))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let json = json_body(first).await;
    assert_eq!(
        json,
        serde_json::json!({
            "plagiarism_detected": false,
            "max_score": 0.0,
            "matched_files": [],
            "threshold": 0.75,
            "document_added": true
        })
    );
    assert_eq!(index.len(), 1);

    let second = app
        .oneshot(upload(multipart_body("file", Some("copy.pdf"), "application/pdf", SRS.as_bytes())))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let json = json_body(second).await;
    assert_eq!(json["plagiarism_detected"], true);
    assert_eq!(json["matched_files"], serde_json::json!(["library.pdf"]));
    assert_eq!(json["document_added"], false);
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn docx_content_type_is_accepted_without_extension() {
    let (app, _) = make_app();
    let resp = app
        .oneshot(upload(multipart_body(
            "file",
            Some("submission"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            SRS.as_bytes(),
        )))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn stats_counts_admitted_documents() {
    let (app, _) = make_app();
    app.clone()
        .oneshot(upload(multipart_body("file", Some("a.pdf"), "application/pdf", SRS.as_bytes())))
        .await
        .unwrap();

    let resp = app
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["index"], "plagiarism-detection");
    assert_eq!(json["entries"], 1);
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let (app, index) = make_app();
    let resp = app
        .oneshot(upload(multipart_body("document", Some("a.pdf"), "application/pdf", SRS.as_bytes())))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "invalid_input");
    assert!(index.ops().is_empty());
}

#[tokio::test]
async fn missing_filename_is_bad_request() {
    let (app, _) = make_app();
    let resp = app
        .oneshot(upload(multipart_body("file", None, "application/pdf", SRS.as_bytes())))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert!(json["error"]["message"].as_str().unwrap().contains("filename"));
}

#[tokio::test]
async fn unsupported_type_is_bad_request() {
    let (app, index) = make_app();
    let resp = app
        .oneshot(upload(multipart_body("file", Some("notes.txt"), "text/plain", SRS.as_bytes())))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "invalid_input");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.contains("notes.txt"), "got: {}", message);
    assert!(message.contains("application/pdf"), "got: {}", message);
    assert!(index.is_empty());
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let (app, index) = make_app();
    let resp = app
        .oneshot(upload(multipart_body("file", Some("big.pdf"), "application/pdf", &[b'a'; 300])))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "payload_too_large");
    assert!(index.ops().is_empty());
}

#[tokio::test]
async fn non_multipart_request_is_bad_request() {
    let (app, _) = make_app();
    let resp = app
        .oneshot(
            Request::post("/check-plagiarism")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn document_without_sections_is_unprocessable() {
    let (app, index) = make_app();
    let resp = app
        .oneshot(upload(multipart_body(
            "file",
            Some("essay.pdf"),
            "application/pdf",
            b"An essay about nothing in particular.",
        )))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "unreadable_document");
    assert!(index.is_empty());
}

#[tokio::test]
async fn summarizer_outage_is_service_unavailable() {
    let (app, index) = make_app_with(ScriptedSummarizer::failing("upstream 503"));
    let resp = app
        .oneshot(upload(multipart_body("file", Some("a.pdf"), "application/pdf", SRS.as_bytes())))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "collaborator_unavailable");
    assert!(index.is_empty());
}
