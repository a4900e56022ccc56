//! Seedcast Web - HTTP API server
//!
//! Serves the upload endpoint, the magnet URI and view-counter read
//! endpoints, and the static asset mount. All state reaches handlers through
//! an explicitly constructed [`server::AppState`].

pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, router, run_server};
