//! HTTP request handlers.

mod api;
mod upload;

pub use api::{access_magnet_uri, clear, info, stats};
pub use upload::upload;
