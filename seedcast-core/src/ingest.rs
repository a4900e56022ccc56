//! Upload ingest coordination.
//!
//! Lands an uploaded byte stream safely on disk (temp file, then atomic
//! rename), resolves duplicate-name collisions, hands the published file to
//! the seeder, and records the resulting magnet URI in the state store.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rand::{Rng, rng};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::seeding::{SeedError, Seeder};
use crate::state::{AppStateStore, KEY_MAGNET_URI, StateError};

/// Uploaded files must carry this extension.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Errors raised while ingesting an upload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The declared filename does not end in the expected video extension.
    /// Rejected before any disk I/O.
    #[error("invalid file type, must be mp4: {name}")]
    InvalidType { name: String },

    /// A disk write, rename, or delete failed.
    #[error("file system error: {0}")]
    Io(#[from] io::Error),

    /// A file with the declared name already exists with a different size.
    #[error(
        "a file named {name} already exists with a different size \
         ({existing} bytes on disk, {uploaded} bytes uploaded)"
    )]
    NameCollision {
        name: String,
        existing: u64,
        uploaded: u64,
    },

    /// The seeding process failed to produce a magnet URI.
    #[error(transparent)]
    Seed(#[from] SeedError),

    /// The magnet URI could not be recorded in the state store.
    #[error("failed to record magnet URI: {0}")]
    State(#[from] StateError),

    /// The upload itself succeeded but the staged temp file could not be
    /// removed afterwards.
    #[error("failed to remove temp file: {0}")]
    TempFileCleanup(io::Error),

    /// An ingest error occurred and the temp file cleanup failed on top of
    /// it. Both are reported; the primary error is not masked.
    #[error("{primary}; additionally failed to remove temp file: {cleanup}")]
    CleanupFailed {
        primary: Box<IngestError>,
        cleanup: io::Error,
    },
}

impl IngestError {
    /// True when the error is correctable by the uploader.
    pub fn is_user_error(&self) -> bool {
        matches!(self, IngestError::InvalidType { .. })
    }
}

/// Coordinates the upload-to-seed pipeline for one data directory.
///
/// Constructed once at startup and shared across request handlers; holds the
/// seeder and the state store explicitly instead of reaching for process-wide
/// globals.
pub struct IngestCoordinator {
    data_dir: PathBuf,
    seeder: Arc<dyn Seeder>,
    state: Arc<AppStateStore>,
}

impl IngestCoordinator {
    /// Creates a coordinator landing uploads in `data_dir`.
    pub fn new(data_dir: PathBuf, seeder: Arc<dyn Seeder>, state: Arc<AppStateStore>) -> Self {
        Self {
            data_dir,
            seeder,
            state,
        }
    }

    /// Directory uploads are published into.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Ingests one upload: lands the body on disk under `declared_name`,
    /// seeds the published file, records the magnet URI, and returns it.
    ///
    /// The declared name is used verbatim as the on-disk name; collisions are
    /// resolved by exact byte-size match (equal size is treated as a
    /// re-upload of the same file). Re-uploads still re-seed and re-set the
    /// magnet URI. The staged temp file is removed on every exit path.
    ///
    /// # Errors
    /// - `IngestError::InvalidType` - Name does not end in `.mp4`
    /// - `IngestError::Io` - Disk write, rename, or stream read failed
    /// - `IngestError::NameCollision` - Existing file with a different size
    /// - `IngestError::Seed` - Seeding process failed
    /// - `IngestError::State` - Magnet URI could not be persisted
    /// - `IngestError::TempFileCleanup` / `IngestError::CleanupFailed` -
    ///   Temp file removal failed
    pub async fn ingest<S>(&self, declared_name: &str, body: S) -> Result<String, IngestError>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        if !declared_name.ends_with(VIDEO_EXTENSION) {
            return Err(IngestError::InvalidType {
                name: declared_name.to_string(),
            });
        }

        let temp_path = self
            .data_dir
            .join(format!("tmp_{}.mp4", hex::encode(rng().random::<[u8; 16]>())));

        let outcome = self.land_and_seed(declared_name, &temp_path, body).await;

        // Unconditional cleanup: the temp file must not survive the request,
        // whatever happened above. A cleanup failure is reported alongside
        // the primary error rather than silently swallowed.
        match fs::remove_file(&temp_path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                warn!(temp = %temp_path.display(), "failed to remove temp file: {e}");
                match outcome {
                    Ok(_) => Err(IngestError::TempFileCleanup(e)),
                    Err(primary) => Err(IngestError::CleanupFailed {
                        primary: Box::new(primary),
                        cleanup: e,
                    }),
                }
            }
            _ => outcome,
        }
    }

    async fn land_and_seed<S>(
        &self,
        declared_name: &str,
        temp_path: &Path,
        mut body: S,
    ) -> Result<String, IngestError>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        let mut staged = fs::File::create(temp_path).await?;
        let mut staged_len: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            staged.write_all(&chunk).await?;
            staged_len += chunk.len() as u64;
        }
        staged.flush().await?;
        // Close the handle before the rename.
        drop(staged);

        let final_path = self.data_dir.join(declared_name);
        match fs::metadata(&final_path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Two concurrent uploads of the same name can both land here;
                // the same-filesystem rename keeps either outcome whole.
                fs::rename(temp_path, &final_path).await?;
                info!(file = %final_path.display(), bytes = staged_len, "upload published");
            }
            Err(e) => return Err(e.into()),
            Ok(existing) => {
                if existing.len() != staged_len {
                    return Err(IngestError::NameCollision {
                        name: declared_name.to_string(),
                        existing: existing.len(),
                        uploaded: staged_len,
                    });
                }
                info!(file = %final_path.display(), "duplicate upload, reusing published file");
                fs::remove_file(temp_path).await?;
            }
        }

        let magnet_uri = self.seeder.seed(&final_path).await?;
        self.state
            .set(KEY_MAGNET_URI, &Value::String(magnet_uri.clone()))?;
        Ok(magnet_uri)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    use super::*;

    /// Records seed calls and returns a fixed URI, no process spawned.
    struct RecordingSeeder {
        uri: String,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl RecordingSeeder {
        fn new(uri: &str) -> Self {
            Self {
                uri: uri.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Seeder for RecordingSeeder {
        async fn seed(&self, file_path: &Path) -> Result<String, SeedError> {
            self.calls.lock().push(file_path.to_path_buf());
            Ok(self.uri.clone())
        }
    }

    struct FailingSeeder;

    #[async_trait]
    impl Seeder for FailingSeeder {
        async fn seed(&self, _file_path: &Path) -> Result<String, SeedError> {
            Err(SeedError::NoMagnetUri)
        }
    }

    struct Fixture {
        data_dir: TempDir,
        _state_dir: TempDir,
        state: Arc<AppStateStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let data_dir = TempDir::new().unwrap();
            let state_dir = TempDir::new().unwrap();
            let state = Arc::new(
                AppStateStore::open(&state_dir.path().join("app.sqlite"), "app").unwrap(),
            );
            Self {
                data_dir,
                _state_dir: state_dir,
                state,
            }
        }

        fn coordinator(&self, seeder: Arc<dyn Seeder>) -> IngestCoordinator {
            IngestCoordinator::new(self.data_dir.path().to_path_buf(), seeder, self.state.clone())
        }

        fn files(&self) -> Vec<String> {
            std::fs::read_dir(self.data_dir.path())
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        }
    }

    fn body(chunks: &[&[u8]]) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        futures::stream::iter(
            chunks
                .iter()
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_rejects_wrong_extension_before_touching_disk() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator(Arc::new(RecordingSeeder::new("magnet:?xt=a")));

        let err = coordinator.ingest("movie.avi", body(&[b"data" as &[u8]])).await.unwrap_err();

        assert!(matches!(err, IngestError::InvalidType { .. }));
        assert!(err.is_user_error());
        assert!(fixture.files().is_empty());
    }

    #[tokio::test]
    async fn test_publishes_seeds_and_records_uri() {
        let fixture = Fixture::new();
        let seeder = Arc::new(RecordingSeeder::new("magnet:?xt=urn:btih:abc"));
        let coordinator = fixture.coordinator(seeder.clone());

        let uri = coordinator
            .ingest("movie.mp4", body(&[b"chunk one " as &[u8], b"chunk two"]))
            .await
            .unwrap();

        assert_eq!(uri, "magnet:?xt=urn:btih:abc");
        assert_eq!(fixture.files(), vec!["movie.mp4".to_string()]);
        assert_eq!(
            std::fs::read(fixture.data_dir.path().join("movie.mp4")).unwrap(),
            b"chunk one chunk two"
        );
        assert_eq!(
            seeder.calls.lock().as_slice(),
            &[fixture.data_dir.path().join("movie.mp4")]
        );
        assert_eq!(
            fixture.state.get(KEY_MAGNET_URI).unwrap(),
            Some(Value::String("magnet:?xt=urn:btih:abc".to_string()))
        );
    }

    #[tokio::test]
    async fn test_duplicate_upload_reuses_file_and_reseeds() {
        let fixture = Fixture::new();
        let seeder = Arc::new(RecordingSeeder::new("magnet:?xt=a"));
        let coordinator = fixture.coordinator(seeder.clone());

        coordinator.ingest("movie.mp4", body(&[b"same bytes" as &[u8]])).await.unwrap();
        coordinator.ingest("movie.mp4", body(&[b"same bytes" as &[u8]])).await.unwrap();

        // One published file, no stray temp files, seeding ran both times.
        assert_eq!(fixture.files(), vec!["movie.mp4".to_string()]);
        assert_eq!(seeder.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_size_mismatch_is_a_collision_and_keeps_original() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator(Arc::new(RecordingSeeder::new("magnet:?xt=a")));

        coordinator.ingest("movie.mp4", body(&[b"original" as &[u8]])).await.unwrap();
        let err = coordinator
            .ingest("movie.mp4", body(&[b"different length" as &[u8]]))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::NameCollision { .. }));
        assert_eq!(fixture.files(), vec!["movie.mp4".to_string()]);
        assert_eq!(
            std::fs::read(fixture.data_dir.path().join("movie.mp4")).unwrap(),
            b"original"
        );
    }

    #[tokio::test]
    async fn test_seed_failure_cleans_temp_and_leaves_state_unset() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator(Arc::new(FailingSeeder));

        let err = coordinator.ingest("movie.mp4", body(&[b"data" as &[u8]])).await.unwrap_err();

        assert!(matches!(err, IngestError::Seed(SeedError::NoMagnetUri)));
        // The published file stays, the staged temp does not.
        assert_eq!(fixture.files(), vec!["movie.mp4".to_string()]);
        assert!(fixture.state.get(KEY_MAGNET_URI).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_body_stream_error_cleans_temp() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator(Arc::new(RecordingSeeder::new("magnet:?xt=a")));

        let broken = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"start")),
            Err(io::Error::other("client went away")),
        ]);
        let err = coordinator.ingest("movie.mp4", broken).await.unwrap_err();

        assert!(matches!(err, IngestError::Io(_)));
        assert!(fixture.files().is_empty());
    }
}
