//! Read-endpoint and state-lifecycle contracts.

use axum::http::StatusCode;
use seedcast_core::state::{KEY_MAGNET_URI, KEY_VIEWS};
use serde_json::json;

use crate::common::{TestApp, body_json, body_text};

#[tokio::test]
async fn test_access_magnet_uri_increments_views_by_default() {
    let app = TestApp::new();

    let response = app.get("/accessMagnetURI").await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;

    assert_eq!(payload["views"], json!(1));
    assert_eq!(payload["magnetURI"], json!(null));
    assert_eq!(payload["add_view"], json!(true));

    let payload = body_json(app.get("/accessMagnetURI").await).await;
    assert_eq!(payload["views"], json!(2));
}

#[tokio::test]
async fn test_access_magnet_uri_add_view_false_skips_increment() {
    let app = TestApp::new();
    app.state.atomic_add(KEY_VIEWS, 5).unwrap();
    app.state
        .set(KEY_MAGNET_URI, &json!("magnet:?xt=urn:btih:abc"))
        .unwrap();

    let payload = body_json(app.get("/accessMagnetURI?add_view=false").await).await;

    assert_eq!(payload["views"], json!(5));
    assert_eq!(payload["magnetURI"], json!("magnet:?xt=urn:btih:abc"));
    assert_eq!(payload["add_view"], json!(false));
}

#[tokio::test]
async fn test_stats_stringifies_view_count() {
    let app = TestApp::new();
    app.state.atomic_add(KEY_VIEWS, 12).unwrap();

    let payload = body_json(app.get("/stats").await).await;

    assert_eq!(payload["views"], json!("12"));
}

#[tokio::test]
async fn test_info_reports_process_identity_and_snapshot() {
    let app = TestApp::new();
    app.state.atomic_add(KEY_VIEWS, 3).unwrap();

    let payload = body_json(app.get("/info").await).await;

    assert_eq!(payload["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(payload["process_id"], json!(std::process::id()));
    assert_eq!(payload["views"], json!(3));
    assert!(payload["launched_at"].is_string());
    assert!(payload["current_utc_time"].is_string());
    assert!(payload["thread_id"].is_string());
    assert_eq!(payload["app_state"]["views"], json!(3));
}

#[tokio::test]
async fn test_clear_empties_state_and_touches_restart_sentinel() {
    let app = TestApp::new();
    app.state.atomic_add(KEY_VIEWS, 2).unwrap();
    app.state
        .set(KEY_MAGNET_URI, &json!("magnet:?xt=urn:btih:abc"))
        .unwrap();
    assert!(!app.sentinel.exists());

    let response = app.get("/clear").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Server queued for restart.");
    assert!(app.state.snapshot().unwrap().is_empty());
    assert!(app.sentinel.exists());
}

#[tokio::test]
async fn test_index_and_favicon_redirect_to_static_assets() {
    let app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/www/index.html");

    let response = app.get("/favicon.ico").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/www/favicon.ico");
}
