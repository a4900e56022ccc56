//! Upload-to-seed pipeline contracts over HTTP.

use axum::http::StatusCode;
use seedcast_core::state::KEY_MAGNET_URI;
use serde_json::json;

use crate::common::{TestApp, body_text};

#[tokio::test]
async fn test_upload_rejects_non_mp4_with_410() {
    let app = TestApp::new();

    let response = app.upload("movie.avi", b"not a video").await;

    assert_eq!(response.status(), StatusCode::GONE);
    assert_eq!(body_text(response).await, "Invalid file type, must be mp4");
    // Rejected before any disk I/O: nothing landed, nothing was seeded.
    assert!(app.data_files().is_empty());
    assert!(app.seeder.calls.lock().is_empty());
}

#[tokio::test]
async fn test_upload_publishes_file_and_returns_magnet_uri() {
    let app = TestApp::with_uri("magnet:?xt=urn:btih:cafe");

    let response = app.upload("movie.mp4", b"video bytes").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "magnet:?xt=urn:btih:cafe");
    assert_eq!(app.data_files(), vec!["movie.mp4".to_string()]);
    assert_eq!(
        std::fs::read(app.data_dir.path().join("movie.mp4")).unwrap(),
        b"video bytes"
    );
    assert_eq!(
        app.state.get(KEY_MAGNET_URI).unwrap(),
        Some(json!("magnet:?xt=urn:btih:cafe"))
    );
}

#[tokio::test]
async fn test_duplicate_upload_succeeds_and_reseeds() {
    let app = TestApp::new();

    let first = app.upload("movie.mp4", b"same bytes").await;
    let second = app.upload("movie.mp4", b"same bytes").await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    // One published file, no stray temp file, seeding ran for both uploads.
    assert_eq!(app.data_files(), vec!["movie.mp4".to_string()]);
    assert_eq!(app.seeder.calls.lock().len(), 2);
}

#[tokio::test]
async fn test_name_collision_with_different_size_is_server_error() {
    let app = TestApp::new();

    let first = app.upload("movie.mp4", b"original").await;
    let second = app.upload("movie.mp4", b"different length body").await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body_text(second).await;
    assert!(detail.starts_with("There was an error uploading the file because:"));
    assert!(detail.contains("already exists"));
    // The original stays untouched and no temp file survives.
    assert_eq!(app.data_files(), vec!["movie.mp4".to_string()]);
    assert_eq!(
        std::fs::read(app.data_dir.path().join("movie.mp4")).unwrap(),
        b"original"
    );
}

#[tokio::test]
async fn test_upload_without_file_field_is_bad_request() {
    let app = TestApp::new();

    let response = app.upload_field("attachment", "movie.mp4", b"data").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.data_files().is_empty());
}
