/// Upload API route
use crate::{
    error::{Result, ServerError},
    middleware::RemoteUser,
    state::AppState,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use futures_util::TryStreamExt;
use juicebox_importer::IngestOutcome;
use tokio_util::io::StreamReader;

/// Multipart field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// POST /api/upload - Ingest one audio file
///
/// The `file` part is streamed straight into the ingestion pipeline; other parts
/// are ignored. Responds 201 for a new song and 200 when the upload duplicates an
/// existing one.
pub async fn upload(
    State(app_state): State<AppState>,
    user: RemoteUser,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<IngestOutcome>)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ServerError::BadRequest("Missing Content-Type".to_string()))?;

    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| ServerError::BadRequest(format!("Expected multipart/form-data: {}", e)))?;

    let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ServerError::BadRequest("Missing filename".to_string()))?;

        let stream =
            field.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e));
        let reader = StreamReader::new(Box::pin(stream));

        let outcome = app_state
            .ingester
            .ingest(reader, &filename, user.user())
            .await?;

        let status = match &outcome {
            IngestOutcome::Created(song) => {
                tracing::info!(
                    song_id = song.id,
                    user = %user.user().username,
                    "Upload stored"
                );
                StatusCode::CREATED
            }
            IngestOutcome::Duplicate { existing } => {
                tracing::info!(
                    existing = ?existing,
                    user = %user.user().username,
                    "Upload was a duplicate"
                );
                StatusCode::OK
            }
        };

        return Ok((status, Json(outcome)));
    }

    Err(ServerError::BadRequest(format!(
        "Missing multipart field: {}",
        FILE_FIELD
    )))
}
