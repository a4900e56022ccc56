//! Seeding subprocess management.
//!
//! Seeding is delegated to an external tool that ingests a published file,
//! announces it to a tracker, and prints a `magnetURI: <uri>` line to stdout
//! once the file is available. This module owns the process lifecycle: spawn,
//! scan for the marker line, and keep the pipe drained afterwards.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

mod webtorrent;

pub use webtorrent::WebTorrentSeeder;

/// Stdout line prefix the external tool uses to report the magnet URI.
pub const MAGNET_URI_MARKER: &str = "magnetURI: ";

/// Errors raised while running the external seeding tool.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seeding process could not be started (missing binary, permission).
    #[error("failed to start seeding process: {0}")]
    Spawn(io::Error),

    /// Reading the process's stdout failed mid-scan.
    #[error("failed to read seeding process output: {0}")]
    Stdout(io::Error),

    /// The process closed stdout or exited before printing a marker line.
    /// Not retried; the upload that triggered seeding fails.
    #[error("seeding process produced no magnet URI")]
    NoMagnetUri,
}

/// Makes a published file available for peer-to-peer distribution.
///
/// Narrow seam over the process-invocation detail so request handling can be
/// tested without spawning real processes.
#[async_trait]
pub trait Seeder: Send + Sync {
    /// Starts seeding `file_path` and returns the extracted magnet URI.
    ///
    /// The seeding process outlives this call: it keeps running (and seeding)
    /// in the background for the lifetime of the service.
    ///
    /// # Errors
    /// - `SeedError::Spawn` - Process could not be started
    /// - `SeedError::Stdout` - Output stream read failed
    /// - `SeedError::NoMagnetUri` - Process ended without reporting a URI
    async fn seed(&self, file_path: &Path) -> Result<String, SeedError>;
}
