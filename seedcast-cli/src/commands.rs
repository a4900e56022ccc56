//! CLI command implementations.

use std::path::PathBuf;

use clap::Subcommand;
use seedcast_core::config::SeedcastConfig;
use seedcast_core::tracing_setup::init_tracing;
use seedcast_core::{Result, SeedcastError, Seeder, WebTorrentSeeder};
use tracing::Level;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the upload-and-seed server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Directory uploads and state are stored in
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Tracker announce URL passed to the seeding tool
        #[arg(long)]
        tracker_url: Option<String>,
        /// Console log level (error, warn, info, debug, trace)
        #[arg(long, default_value = "info")]
        log_level: String,
    },
    /// Seed an existing local file and print its magnet URI
    Seed {
        /// Path to the file to seed
        file: PathBuf,
        /// Tracker announce URL passed to the seeding tool
        #[arg(long)]
        tracker_url: Option<String>,
        /// Local port the seeding tool listens on
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            data_dir,
            tracker_url,
            log_level,
        } => serve(host, port, data_dir, tracker_url, log_level).await,
        Commands::Seed {
            file,
            tracker_url,
            port,
        } => seed_file(file, tracker_url, port).await,
    }
}

/// Start the HTTP server with flags layered over env and defaults.
///
/// # Errors
/// - `SeedcastError::Configuration` - Bad log level or tracing setup failure
/// - `SeedcastError::Web` - Server failed to start or crashed
async fn serve(
    host: String,
    port: u16,
    data_dir: Option<PathBuf>,
    tracker_url: Option<String>,
    log_level: String,
) -> Result<()> {
    let mut config = SeedcastConfig::from_env();
    config.server.host = host;
    config.server.port = port;
    if let Some(data_dir) = data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(tracker_url) = tracker_url {
        config.seeding.tracker_url = tracker_url;
    }

    let console_level: Level =
        log_level
            .parse()
            .map_err(|e| SeedcastError::Configuration {
                reason: format!("invalid log level {log_level:?}: {e}"),
            })?;
    init_tracing(console_level, &config.storage.data_dir).map_err(|e| {
        SeedcastError::Configuration {
            reason: format!("failed to initialize tracing: {e}"),
        }
    })?;

    seedcast_web::run_server(config)
        .await
        .map_err(SeedcastError::from_web_error)
}

/// Seed one local file without the HTTP layer and print the magnet URI.
///
/// # Errors
/// - `SeedcastError::Io` - File could not be resolved
/// - `SeedcastError::Seed` - Seeding tool failed or produced no URI
async fn seed_file(file: PathBuf, tracker_url: Option<String>, port: Option<u16>) -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = SeedcastConfig::from_env();
    if let Some(tracker_url) = tracker_url {
        config.seeding.tracker_url = tracker_url;
    }
    if let Some(port) = port {
        config.seeding.seed_port = port;
    }

    // The seeder runs with cwd = the file's directory, so resolve first.
    let file = tokio::fs::canonicalize(&file).await?;
    let seeder = WebTorrentSeeder::new(config.seeding);
    let magnet_uri = seeder.seed(&file).await?;

    println!("magnetURI: {magnet_uri}");
    println!("Seeding continues until interrupted (ctrl-c to stop).");
    tokio::signal::ctrl_c().await?;

    Ok(())
}
