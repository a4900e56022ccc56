//! Shared fixtures: an in-process app with a mock seeder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use parking_lot::Mutex;
use seedcast_core::config::SeedcastConfig;
use seedcast_core::seeding::{SeedError, Seeder};
use seedcast_core::{AppStateStore, IngestCoordinator};
use seedcast_web::AppState;
use tempfile::TempDir;
use tower::ServiceExt;

/// Seeder double: records every call and returns a fixed magnet URI.
pub struct RecordingSeeder {
    pub uri: String,
    pub calls: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Seeder for RecordingSeeder {
    async fn seed(&self, file_path: &Path) -> Result<String, SeedError> {
        self.calls.lock().push(file_path.to_path_buf());
        Ok(self.uri.clone())
    }
}

/// An app wired like production, minus the real seeding subprocess.
///
/// Uploads land in `data_dir`; the state database and the restart sentinel
/// live in a separate root so upload tests can assert on the exact contents
/// of the data directory.
pub struct TestApp {
    pub data_dir: TempDir,
    _root: TempDir,
    pub state: Arc<AppStateStore>,
    pub seeder: Arc<RecordingSeeder>,
    pub sentinel: PathBuf,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_uri("magnet:?xt=urn:btih:feedbeef")
    }

    pub fn with_uri(uri: &str) -> Self {
        let data_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        let mut config = SeedcastConfig::default();
        config.storage.data_dir = data_dir.path().to_path_buf();
        config.storage.restart_file = root.path().join("restart.file");
        config.storage.www_dir = root.path().join("www");

        let state = Arc::new(
            AppStateStore::open(&root.path().join("app.sqlite"), &config.storage.state_table)
                .unwrap(),
        );
        let seeder = Arc::new(RecordingSeeder {
            uri: uri.to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let ingest = Arc::new(IngestCoordinator::new(
            data_dir.path().to_path_buf(),
            seeder.clone(),
            state.clone(),
        ));

        let sentinel = config.storage.restart_file.clone();
        let router = seedcast_web::router(AppState::new(config, state.clone(), ingest));

        Self {
            data_dir,
            _root: root,
            state,
            seeder,
            sentinel,
            router,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Uploads `bytes` as multipart field `file` with the given filename.
    pub async fn upload(&self, file_name: &str, bytes: &[u8]) -> Response<Body> {
        self.upload_field("file", file_name, bytes).await
    }

    pub async fn upload_field(
        &self,
        field_name: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Response<Body> {
        let boundary = "seedcast-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"{field_name}\"; \
                 filename=\"{file_name}\"\r\n\
                 Content-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        self.request(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// File names currently present in the upload data directory.
    pub fn data_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.data_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
