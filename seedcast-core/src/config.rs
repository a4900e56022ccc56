//! Centralized configuration for Seedcast.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;

/// Central configuration for all Seedcast components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct SeedcastConfig {
    pub server: ServerConfig,
    pub seeding: SeedingConfig,
    pub storage: StorageConfig,
}

impl SeedcastConfig {
    /// Creates a configuration with environment variable overrides applied.
    ///
    /// `TRACKER_URL` overrides the announce URL and `DATA_DIR` overrides the
    /// upload directory. Both are read once; later environment changes have
    /// no effect.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(tracker_url) = std::env::var("TRACKER_URL") {
            config.seeding.tracker_url = tracker_url;
        }
        if let Ok(data_dir) = std::env::var("DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }
        config
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind the HTTP listener to
    pub host: String,
    /// Port to bind the HTTP listener to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// External seeding tool configuration.
///
/// Controls how the seeding subprocess is invoked. The tool is expected to
/// print a `magnetURI: <uri>` line to stdout once seeding is ready.
#[derive(Debug, Clone)]
pub struct SeedingConfig {
    /// Executable name or path of the external seeding tool
    pub command: String,
    /// Tracker announce URL passed to the seeding tool
    pub tracker_url: String,
    /// Local port the seeding tool listens on
    pub seed_port: u16,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            command: "webtorrent-hybrid".to_string(),
            tracker_url: "wss://webtorrent-tracker.onrender.com".to_string(),
            seed_port: 8000,
        }
    }
}

/// File storage and persisted state configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory where uploaded files and the state database live
    pub data_dir: PathBuf,
    /// State database file name inside the data directory
    pub state_db_name: String,
    /// State table name inside the database
    pub state_table: String,
    /// Restart sentinel file touched by the clear endpoint, relative to the
    /// service root
    pub restart_file: PathBuf,
    /// Directory of static assets served under /www
    pub www_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            state_db_name: "app.sqlite".to_string(),
            state_table: "app".to_string(),
            restart_file: PathBuf::from("restart.file"),
            www_dir: PathBuf::from("www"),
        }
    }
}

impl StorageConfig {
    /// Full path of the state database file.
    pub fn state_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_db_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SeedcastConfig::default();
        assert_eq!(config.seeding.command, "webtorrent-hybrid");
        assert_eq!(config.seeding.seed_port, 8000);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_state_db_path_joins_data_dir() {
        let config = StorageConfig::default();
        assert_eq!(config.state_db_path(), PathBuf::from("data/app.sqlite"));
    }
}
