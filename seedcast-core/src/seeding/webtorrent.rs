//! `webtorrent-hybrid` seeder implementation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::{MAGNET_URI_MARKER, SeedError, Seeder};
use crate::config::SeedingConfig;

/// Seeds files by shelling out to the `webtorrent-hybrid` CLI.
///
/// Invocation: `<command> seed --keep-seeding <basename> --announce
/// <tracker_url> --port <seed_port>` with the working directory set to the
/// file's containing directory.
#[derive(Debug, Clone)]
pub struct WebTorrentSeeder {
    command: String,
    tracker_url: String,
    seed_port: u16,
}

impl WebTorrentSeeder {
    /// Creates a seeder from the seeding configuration section.
    pub fn new(config: SeedingConfig) -> Self {
        Self {
            command: config.command,
            tracker_url: config.tracker_url,
            seed_port: config.seed_port,
        }
    }
}

#[async_trait]
impl Seeder for WebTorrentSeeder {
    async fn seed(&self, file_path: &Path) -> Result<String, SeedError> {
        let file_name = file_path.file_name().ok_or_else(|| {
            SeedError::Spawn(io::Error::other(format!(
                "path has no file name: {}",
                file_path.display()
            )))
        })?;
        let cwd = file_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        info!(file = %file_path.display(), tracker = %self.tracker_url, "starting seeding process");

        let mut child = Command::new(&self.command)
            .arg("seed")
            .arg("--keep-seeding")
            .arg(file_name)
            .arg("--announce")
            .arg(&self.tracker_url)
            .arg("--port")
            .arg(self.seed_port.to_string())
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(SeedError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SeedError::Spawn(io::Error::other("seeding process has no stdout handle"))
        })?;
        let mut lines = BufReader::new(stdout).lines();

        // Scan until the marker line appears. The process is still running
        // and still writing; the pipe must stay open past this loop.
        let magnet_uri = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    debug!("{}: {line}", self.command);
                    if let Some(rest) = line.strip_prefix(MAGNET_URI_MARKER) {
                        break rest.split_whitespace().next().unwrap_or_default().to_string();
                    }
                }
                Ok(None) => return Err(SeedError::NoMagnetUri),
                Err(e) => return Err(SeedError::Stdout(e)),
            }
        };

        info!(magnet_uri = %magnet_uri, "magnet URI extracted");
        spawn_stdout_drain(self.command.clone(), lines, child);

        Ok(magnet_uri)
    }
}

/// Keeps reading the child's stdout after the scan loop returned.
///
/// The child blocks once the pipe buffer fills if nothing reads it, and it
/// keeps producing output for as long as it seeds. The task is deliberately
/// leaked for the lifetime of the child process and never joined from the
/// request path; read failures are logged and cannot reach any client.
fn spawn_stdout_drain(command: String, mut lines: Lines<BufReader<ChildStdout>>, mut child: Child) {
    tokio::spawn(async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!("{command}: {line}"),
                Ok(None) => break,
                Err(e) => {
                    warn!("failed to drain seeding process stdout: {e}");
                    break;
                }
            }
        }
        match child.wait().await {
            Ok(status) => debug!("seeding process exited: {status}"),
            Err(e) => warn!("failed to reap seeding process: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use super::*;

    /// Writes an executable shell script standing in for webtorrent-hybrid.
    fn write_fake_tool(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-webtorrent");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn seeder_for(tool: &Path) -> WebTorrentSeeder {
        WebTorrentSeeder::new(SeedingConfig {
            command: tool.to_str().unwrap().to_string(),
            ..SeedingConfig::default()
        })
    }

    #[tokio::test]
    async fn test_seed_extracts_uri_without_waiting_for_exit() {
        let dir = TempDir::new().unwrap();
        let tool = write_fake_tool(
            dir.path(),
            "echo 'Seeding started'\n\
             echo 'magnetURI: magnet:?xt=urn:btih:abc123 trailing'\n\
             sleep 3\n\
             echo 'still seeding'",
        );
        let file_path = dir.path().join("movie.mp4");
        fs::write(&file_path, b"fake video").unwrap();

        let started = Instant::now();
        let uri = seeder_for(&tool).seed(&file_path).await.unwrap();

        assert_eq!(uri, "magnet:?xt=urn:btih:abc123");
        // The scan must return on the marker line, not on process exit.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_seed_fails_when_no_marker_emitted() {
        let dir = TempDir::new().unwrap();
        let tool = write_fake_tool(dir.path(), "echo 'no magnet here'\necho 'bye'");
        let file_path = dir.path().join("movie.mp4");
        fs::write(&file_path, b"fake video").unwrap();

        let err = seeder_for(&tool).seed(&file_path).await.unwrap_err();
        assert!(matches!(err, SeedError::NoMagnetUri));
    }

    #[tokio::test]
    async fn test_seed_fails_when_binary_missing() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("movie.mp4");
        fs::write(&file_path, b"fake video").unwrap();

        let seeder = WebTorrentSeeder::new(SeedingConfig {
            command: "/nonexistent/webtorrent-hybrid".to_string(),
            ..SeedingConfig::default()
        });
        let err = seeder.seed(&file_path).await.unwrap_err();
        assert!(matches!(err, SeedError::Spawn(_)));
    }
}
