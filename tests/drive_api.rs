//! Drive client and end-to-end extraction against a local fake of the
//! Drive v3 REST API.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use drive_extract::config::DriveConfig;
use drive_extract::drive::DriveClient;
use drive_extract::models::{OutcomeStatus, ResponseBody, ResponseEncoding, Stage};
use drive_extract::{ContentFetcher, ExtractionOrchestrator, FetchError, FileLister, OutputWriter};

const TOKEN: &str = "test-token";

struct FakeFile {
    id: &'static str,
    name: &'static str,
    mime: &'static str,
}

const FILES: &[FakeFile] = &[
    FakeFile { id: "doc1", name: "Notes", mime: "application/vnd.google-apps.document" },
    FakeFile { id: "sheet1", name: "Budget", mime: "application/vnd.google-apps.spreadsheet" },
    FakeFile { id: "slides1", name: "Kickoff", mime: "application/vnd.google-apps.presentation" },
    FakeFile {
        id: "docx1",
        name: "Quarterly.docx",
        mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    },
    FakeFile { id: "txt1", name: "readme.txt", mime: "text/plain" },
    FakeFile { id: "pdf1", name: "scan.pdf", mime: "application/pdf" },
    FakeFile { id: "png1", name: "photo.png", mime: "image/png" },
    FakeFile { id: "copy1", name: "Copy of Notes", mime: "application/vnd.google-apps.document" },
];

#[derive(Clone, Default)]
struct FakeDrive {
    list_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn find(id: &str) -> Option<&'static FakeFile> {
    FILES.iter().find(|f| f.id == id)
}

fn docx_bytes() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(
        "word/document.xml",
        zip::write::SimpleFileOptions::default(),
    )
    .unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello from docx</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
    )
    .unwrap();
    zip.finish().unwrap().into_inner()
}

async fn list(
    State(state): State<FakeDrive>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid Credentials").into_response();
    }
    state.list_requests.lock().unwrap().push(params.clone());

    let page_size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    let offset: usize = params
        .get("pageToken")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let end = (offset + page_size).min(FILES.len());

    let files: Vec<_> = FILES[offset..end]
        .iter()
        .map(|f| json!({ "id": f.id, "name": f.name, "mimeType": f.mime }))
        .collect();
    let mut body = json!({ "files": files });
    if end < FILES.len() {
        body["nextPageToken"] = json!(end.to_string());
    }
    Json(body).into_response()
}

async fn file(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid Credentials").into_response();
    }
    let Some(f) = find(&id) else {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    if params.get("alt").map(String::as_str) == Some("media") {
        let body: Vec<u8> = match f.id {
            "docx1" => docx_bytes(),
            "txt1" => b"plain readme\nsecond line\n".to_vec(),
            "pdf1" => b"%PDF-1.4 truncated garbage".to_vec(),
            _ => {
                return (
                    StatusCode::FORBIDDEN,
                    "Only files with binary content can be downloaded",
                )
                    .into_response()
            }
        };
        return ([(header::CONTENT_TYPE, f.mime)], body).into_response();
    }

    Json(json!({ "id": f.id, "name": f.name, "mimeType": f.mime })).into_response()
}

async fn export(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid Credentials").into_response();
    }
    let target = params.get("mimeType").cloned().unwrap_or_default();
    let body = match (id.as_str(), target.as_str()) {
        ("doc1", "text/plain") | ("copy1", "text/plain") => "\u{feff}Hello doc\r\nSecond line",
        ("slides1", "text/plain") => "Slide 1\n\nSlide 2",
        ("sheet1", "text/csv") => "a,b\r\n\r\n1,2\r\n",
        _ => return (StatusCode::BAD_REQUEST, "Export not supported").into_response(),
    };
    ([(header::CONTENT_TYPE, target)], body.to_string()).into_response()
}

async fn spawn_fake_drive() -> (String, FakeDrive) {
    let state = FakeDrive::default();
    let app = Router::new()
        .route("/drive/v3/files", get(list))
        .route("/drive/v3/files/{id}", get(file))
        .route("/drive/v3/files/{id}/export", get(export))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/drive/v3/", addr), state)
}

fn drive_config(api_base: &str) -> DriveConfig {
    DriveConfig {
        api_base: api_base.to_string(),
        page_size: 3,
        exclude_globs: vec!["Copy of *".to_string()],
        ..DriveConfig::default()
    }
}

#[tokio::test]
async fn listing_follows_pages_and_filters_names() {
    let (base, state) = spawn_fake_drive().await;
    let client = DriveClient::with_token(&drive_config(&base), TOKEN).unwrap();

    let files = client.list_files().await.unwrap();

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Budget",
            "Kickoff",
            "Notes",
            "Quarterly.docx",
            "photo.png",
            "readme.txt",
            "scan.pdf"
        ]
    );

    let requests = state.list_requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].get("pageSize").map(String::as_str), Some("3"));
    assert_eq!(requests[0].get("q").map(String::as_str), Some("trashed = false"));
    assert!(requests[0].get("pageToken").is_none());
    assert_eq!(requests[1].get("pageToken").map(String::as_str), Some("3"));
    assert_eq!(requests[2].get("pageToken").map(String::as_str), Some("6"));
}

#[tokio::test]
async fn bad_token_fails_listing() {
    let (base, _) = spawn_fake_drive().await;
    let client = DriveClient::with_token(&drive_config(&base), "wrong").unwrap();

    let err = client.list_files().await.unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains("Failed to list Drive files"), "{}", chain);
    assert!(chain.contains("401"), "{}", chain);
}

#[tokio::test]
async fn metadata_lookup_and_missing_file() {
    let (base, _) = spawn_fake_drive().await;
    let client = DriveClient::with_token(&drive_config(&base), TOKEN).unwrap();

    let meta = client.fetch_metadata("docx1").await.unwrap();
    assert_eq!(meta.name, "Quarterly.docx");
    assert_eq!(
        meta.mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );

    match client.fetch_metadata("nope").await.unwrap_err() {
        FetchError::Status {
            operation, status, ..
        } => {
            assert_eq!(operation, "metadata");
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn batch_run_writes_one_artifact_per_supported_file() {
    let (base, _) = spawn_fake_drive().await;
    let client = Arc::new(DriveClient::with_token(&drive_config(&base), TOKEN).unwrap());
    let out = TempDir::new().unwrap();

    let files = client.list_files().await.unwrap();
    let report = ExtractionOrchestrator::new(client, OutputWriter::new(out.path()))
        .run_batch(files, CancellationToken::new())
        .await;

    assert!(!report.cancelled);
    assert_eq!(report.outcomes.len(), 7);
    assert_eq!(report.succeeded(), 5);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 1);

    let read = |rel: &str| std::fs::read_to_string(out.path().join(rel)).unwrap();
    assert_eq!(read("document/Notes-converted.txt"), "Hello doc\r\nSecond line");
    assert_eq!(read("spreadsheet/Budget-converted.txt"), "a | b\n1 | 2");
    assert_eq!(read("presentation/Kickoff-converted.txt"), "Slide 1\n\nSlide 2");
    assert_eq!(
        read("word-doc/Quarterly-converted.txt"),
        "Hello from docx\nSecond paragraph"
    );
    assert_eq!(read("plain-text/readme-converted.txt"), "plain readme\nsecond line\n");
    assert!(!out.path().join("pdf").join("scan-converted.txt").exists());

    let pdf = report
        .outcomes
        .iter()
        .find(|o| o.source.id == "pdf1")
        .unwrap();
    assert!(matches!(
        pdf.status,
        OutcomeStatus::Failed {
            stage: Stage::Extracting,
            ..
        }
    ));
}

#[tokio::test]
async fn single_file_by_id() {
    let (base, _) = spawn_fake_drive().await;
    let client = Arc::new(DriveClient::with_token(&drive_config(&base), TOKEN).unwrap());
    let out = TempDir::new().unwrap();
    let orchestrator = ExtractionOrchestrator::new(client, OutputWriter::new(out.path()));

    let outcome = orchestrator.process_by_id("sheet1").await;
    assert!(outcome.is_success(), "{:?}", outcome.status);

    let missing = orchestrator.process_by_id("nope").await;
    match missing.status {
        OutcomeStatus::Failed { stage, error } => {
            assert_eq!(stage, Stage::Fetching);
            assert!(error.contains("404"), "{}", error);
        }
        other => panic!("unexpected status {:?}", other),
    }
}

#[tokio::test]
async fn text_bodies_arrive_as_streams() {
    let (base, _) = spawn_fake_drive().await;
    let client = DriveClient::with_token(&drive_config(&base), TOKEN).unwrap();

    let media = client.fetch_content("txt1", "text/plain").await.unwrap();
    assert_eq!(media.encoding, ResponseEncoding::MediaText);
    assert!(matches!(media.body, ResponseBody::Stream(_)), "{:?}", media.body);

    let export = client
        .fetch_content("doc1", "application/vnd.google-apps.document")
        .await
        .unwrap();
    assert_eq!(export.encoding, ResponseEncoding::ExportText);
    assert!(matches!(export.body, ResponseBody::Stream(_)), "{:?}", export.body);
}

#[tokio::test]
async fn oversized_text_file_fails_at_normalize() {
    let (base, _) = spawn_fake_drive().await;
    let client = Arc::new(DriveClient::with_token(&drive_config(&base), TOKEN).unwrap());
    let out = TempDir::new().unwrap();
    let orchestrator = ExtractionOrchestrator::new(client, OutputWriter::new(out.path()))
        .with_max_bytes(Some(8));

    let outcome = orchestrator.process_by_id("txt1").await;

    match outcome.status {
        OutcomeStatus::Failed { stage, error } => {
            assert_eq!(stage, Stage::Normalizing);
            assert!(error.contains("size limit"), "{}", error);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(!out.path().join("plain-text").exists());
}
