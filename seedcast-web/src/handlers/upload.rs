//! Upload handler: lands a multipart file and returns its magnet URI.

use std::io;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream;
use tracing::error;

use crate::server::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// `POST /upload` - streams the uploaded file into the ingest pipeline and
/// returns the magnet URI as plain text.
///
/// `410` when the declared filename is not an `.mp4`; `500` with a
/// human-readable explanation for any other ingest or seeding failure.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("missing multipart field {FILE_FIELD:?}"),
                )
                    .into_response();
            }
            Err(e) => {
                return (StatusCode::BAD_REQUEST, format!("malformed multipart body: {e}"))
                    .into_response();
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared_name = field.file_name().unwrap_or_default().to_string();

        // Adapt the multipart field into the chunk stream the coordinator
        // copies to disk, so the body never buffers in memory.
        let body = Box::pin(stream::unfold(field, |mut field| async move {
            let item: Option<(io::Result<Bytes>, _)> = match field.chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), field)),
                Ok(None) => None,
                Err(e) => Some((Err(io::Error::other(e)), field)),
            };
            item
        }));

        return match state.ingest.ingest(&declared_name, body).await {
            Ok(magnet_uri) => (StatusCode::OK, magnet_uri).into_response(),
            Err(err) if err.is_user_error() => {
                (StatusCode::GONE, "Invalid file type, must be mp4").into_response()
            }
            Err(err) => {
                error!(file = %declared_name, "upload failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("There was an error uploading the file because: {err}"),
                )
                    .into_response()
            }
        };
    }
}
