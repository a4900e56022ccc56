//! Tracing setup for Seedcast.
//!
//! Provides dual output: console logs at a user-controlled level and full
//! debug logs written to a file in the data directory, so a complete record
//! of every run is available next to the uploads it describes.

use std::fs::{File, create_dir_all};
use std::path::Path;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Initializes tracing with dual output: console (user level) + file (debug).
///
/// The file layer writes everything at TRACE level to `<data_dir>/log.txt`,
/// overwriting the previous run. The console layer honors `RUST_LOG` when
/// set, falling back to `console_level`.
///
/// # Errors
/// - `Box<dyn std::error::Error>` - The data directory could not be created
///   or the log file could not be opened for writing
pub fn init_tracing(
    console_level: Level,
    data_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    create_dir_all(data_dir)?;

    let log_file_path = data_dir.join("log.txt");
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        "Tracing initialized: console={}, debug_file={}",
        console_level,
        log_file_path.display()
    );

    Ok(())
}
