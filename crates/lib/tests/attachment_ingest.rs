//! Integration test: serve attachments from a local axum fixture and ingest them.
//! Covers per-item failure isolation, input-order replies, concurrent fetching, and
//! rehydration of JSON byte-array markers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use lib::activity::AttachmentRef;
use lib::attachments::{AttachmentFetcher, AttachmentIngestor, FetchOutcome, NOT_SAVED_TEXT};
use lib::reply::CollectingSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0xff, 0x7f];

async fn image() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

async fn buffer_json() -> impl IntoResponse {
    let body = serde_json::json!({ "type": "Buffer", "data": PNG_BYTES }).to_string();
    ([(header::CONTENT_TYPE, "application/json")], body)
}

async fn plain_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        r#"{"name":"report","pages":[1,2,3]}"#,
    )
}

async fn buffer_json_with_charset() -> impl IntoResponse {
    let body = serde_json::json!({ "type": "Buffer", "data": PNG_BYTES }).to_string();
    ([(header::CONTENT_TYPE, "application/json; charset=utf-8")], body)
}

async fn broken_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{\"type\":\"Buffer\",")
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(300)).await;
    ([(header::CONTENT_TYPE, "text/plain")], "slow body")
}

async fn missing() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Responds only once two requests are waiting, so serialized fetching would never finish.
async fn gate(State(barrier): State<Arc<Barrier>>) -> impl IntoResponse {
    barrier.wait().await;
    ([(header::CONTENT_TYPE, "application/octet-stream")], vec![1u8, 2, 3])
}

async fn start_fixture() -> String {
    let app = Router::new()
        .route("/image.png", get(image))
        .route("/buffer.json", get(buffer_json))
        .route("/plain.json", get(plain_json))
        .route("/buffer-charset.json", get(buffer_json_with_charset))
        .route("/broken.json", get(broken_json))
        .route("/slow.txt", get(slow))
        .route("/missing", get(missing))
        .route("/gate", get(gate))
        .with_state(Arc::new(Barrier::new(2)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn temp_attachments_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("botin-ingest-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create attachments dir");
    dir
}

#[tokio::test]
async fn binary_attachment_is_written_verbatim() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let fetcher = AttachmentFetcher::new(&dir);

    let outcome = fetcher
        .fetch(&AttachmentRef::new("foto.png", format!("{}/image.png", base)))
        .await;
    let saved = match outcome {
        FetchOutcome::Saved(saved) => saved,
        other => panic!("expected saved outcome, got {:?}", other),
    };
    assert_eq!(saved.file_name, "foto.png");
    assert_eq!(saved.local_path, dir.join("foto.png"));
    assert_eq!(std::fs::read(&saved.local_path).unwrap(), PNG_BYTES);
}

#[tokio::test]
async fn json_buffer_marker_is_rehydrated_to_original_bytes() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let fetcher = AttachmentFetcher::new(&dir);

    let outcome = fetcher
        .fetch(&AttachmentRef::new("restored.png", format!("{}/buffer.json", base)))
        .await;
    assert!(outcome.is_saved());
    assert_eq!(std::fs::read(dir.join("restored.png")).unwrap(), PNG_BYTES);
}

#[tokio::test]
async fn plain_json_is_written_unchanged() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let fetcher = AttachmentFetcher::new(&dir);

    let outcome = fetcher
        .fetch(&AttachmentRef::new("report.json", format!("{}/plain.json", base)))
        .await;
    assert!(outcome.is_saved());
    assert_eq!(
        std::fs::read_to_string(dir.join("report.json")).unwrap(),
        r#"{"name":"report","pages":[1,2,3]}"#
    );
}

#[tokio::test]
async fn marker_with_charset_parameter_is_not_decoded() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let fetcher = AttachmentFetcher::new(&dir);

    let outcome = fetcher
        .fetch(&AttachmentRef::new("marker.json", format!("{}/buffer-charset.json", base)))
        .await;
    assert!(outcome.is_saved());
    let expected = serde_json::json!({ "type": "Buffer", "data": PNG_BYTES }).to_string();
    assert_eq!(std::fs::read_to_string(dir.join("marker.json")).unwrap(), expected);
}

#[tokio::test]
async fn failures_are_reported_not_raised() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let fetcher = AttachmentFetcher::new(&dir);

    for attachment in [
        AttachmentRef::new("gone.bin", format!("{}/missing", base)),
        AttachmentRef::new("broken.json", format!("{}/broken.json", base)),
        AttachmentRef::new("nowhere.bin", "http://127.0.0.1:9/nowhere"),
        AttachmentRef::new("no-dir.png", format!("{}/image.png", base)),
    ] {
        let fetcher = if attachment.name == "no-dir.png" {
            AttachmentFetcher::new(dir.join("does-not-exist"))
        } else {
            fetcher.clone()
        };
        assert_eq!(fetcher.fetch(&attachment).await, FetchOutcome::Failed, "{}", attachment.name);
    }
}

#[tokio::test]
async fn replies_follow_input_order_and_isolate_failures() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let ingestor = AttachmentIngestor::new(AttachmentFetcher::new(&dir));

    // The first download finishes last; replies must still start with it.
    let attachments = vec![
        AttachmentRef::new("slow.txt", format!("{}/slow.txt", base)),
        AttachmentRef::new("gone.bin", format!("{}/missing", base)),
        AttachmentRef::new("foto.png", format!("{}/image.png", base)),
    ];
    let sink = CollectingSink::new();
    ingestor.ingest_and_reply(&attachments, &sink).await.unwrap();
    let replies = sink.into_replies();

    assert_eq!(replies.len(), 3);
    let texts: Vec<String> = replies
        .iter()
        .map(|r| r.text.clone().unwrap_or_default())
        .collect();
    assert_eq!(
        texts[0],
        format!(
            "Attachment \"slow.txt\" has been received and saved to \"{}\".",
            dir.join("slow.txt").display()
        )
    );
    assert_eq!(texts[1], NOT_SAVED_TEXT);
    assert!(texts[2].starts_with("Attachment \"foto.png\" has been received"));
    assert_eq!(std::fs::read_to_string(dir.join("slow.txt")).unwrap(), "slow body");
}

#[tokio::test]
async fn fetches_run_concurrently() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let ingestor = AttachmentIngestor::new(AttachmentFetcher::new(&dir));

    let attachments = vec![
        AttachmentRef::new("first.bin", format!("{}/gate", base)),
        AttachmentRef::new("second.bin", format!("{}/gate", base)),
    ];
    let outcomes = tokio::time::timeout(Duration::from_secs(10), ingestor.ingest(&attachments))
        .await
        .expect("both gated downloads must be in flight at once");
    assert!(outcomes.iter().all(FetchOutcome::is_saved));
    assert_eq!(std::fs::read(dir.join("second.bin")).unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn same_name_overwrites() {
    let base = start_fixture().await;
    let dir = temp_attachments_dir();
    let fetcher = AttachmentFetcher::new(&dir);

    assert!(fetcher
        .fetch(&AttachmentRef::new("same", format!("{}/slow.txt", base)))
        .await
        .is_saved());
    assert!(fetcher
        .fetch(&AttachmentRef::new("same", format!("{}/image.png", base)))
        .await
        .is_saved());
    assert_eq!(std::fs::read(dir.join("same")).unwrap(), PNG_BYTES);
}
