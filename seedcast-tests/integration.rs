//! Integration tests for Seedcast
//!
//! These tests drive the axum router in-process, with the seeding subprocess
//! replaced by a recording mock, and verify the HTTP contracts end to end.

#[path = "integration/common.rs"]
mod common;

#[path = "integration/http_api.rs"]
mod http_api;

#[path = "integration/upload_pipeline.rs"]
mod upload_pipeline;
