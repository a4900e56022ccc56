//! Seedcast Core - Upload ingest and seeding pipeline
//!
//! This crate provides the building blocks for the Seedcast service:
//! concurrency-safe upload landing, external seeding process management,
//! persisted application state, and configuration.

pub mod config;
pub mod fsutil;
pub mod ingest;
pub mod seeding;
pub mod state;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::SeedcastConfig;
pub use ingest::{IngestCoordinator, IngestError};
pub use seeding::{SeedError, Seeder, WebTorrentSeeder};
pub use state::{AppStateStore, StateError};

/// Core errors that can bubble up from any Seedcast subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SeedcastError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Seeding error: {0}")]
    Seed(#[from] SeedError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Web server error: {reason}")]
    Web { reason: String },
}

impl SeedcastError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            SeedcastError::Ingest(e) => match e {
                IngestError::InvalidType { .. } => "Invalid file type, must be mp4".to_string(),
                IngestError::NameCollision { name, .. } => {
                    format!("A different file named {name} already exists")
                }
                _ => format!("Upload failed: {e}"),
            },
            SeedcastError::Seed(_) => "Seeding error occurred".to_string(),
            SeedcastError::State(_) => "State storage error occurred".to_string(),
            SeedcastError::Configuration { reason } => format!("Configuration error: {reason}"),
            SeedcastError::Io(_) => "File system error occurred".to_string(),
            SeedcastError::Web { reason } => format!("Web server error: {reason}"),
        }
    }

    /// Convert a boxed web-server error into a `SeedcastError`.
    pub fn from_web_error(error: impl std::fmt::Display) -> Self {
        SeedcastError::Web {
            reason: error.to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SeedcastError::Configuration { .. }
                | SeedcastError::Ingest(IngestError::InvalidType { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, SeedcastError>;
