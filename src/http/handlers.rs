use super::state::AppState;
use crate::error::RecorderError;
use crate::session::{ArtifactTicket, SessionSnapshot, DEFAULT_FILE_STEM};
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRecordingRequest {
    /// Recording name; an empty name leaves the session untouched
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub path: PathBuf,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn recorder_error(e: RecorderError) -> Response {
    match e {
        RecorderError::ControllerClosed => {
            error!("Recorder unavailable: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        RecorderError::Download(_) => {
            error!("Download failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn snapshot_response(state: &AppState) -> Response {
    (StatusCode::OK, Json(state.recorder.snapshot())).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /recording
/// Current session snapshot
pub async fn get_recording(State(state): State<AppState>) -> impl IntoResponse {
    snapshot_response(&state)
}

/// POST /recording/start
/// Start a new recording (ignored unless the session can start)
pub async fn start_recording(
    State(state): State<AppState>,
    Json(req): Json<StartRecordingRequest>,
) -> impl IntoResponse {
    info!("Start requested: {:?}", req.name);

    match state.recorder.start(req.name).await {
        Ok(()) => snapshot_response(&state),
        Err(e) => recorder_error(e),
    }
}

/// POST /recording/stop
/// Stop the current recording
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested");

    match state.recorder.stop().await {
        Ok(()) => snapshot_response(&state),
        Err(e) => recorder_error(e),
    }
}

/// POST /recording/upload
/// Submit the recording for transcription; poll GET /recording for the result
pub async fn upload_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Upload requested");

    match state.recorder.upload().await {
        Ok(()) => snapshot_response(&state),
        Err(e) => recorder_error(e),
    }
}

/// POST /recording/download
/// Save a local copy of the recording
pub async fn download_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Download requested");

    match state.recorder.download().await {
        Ok(Some(path)) => (
            StatusCode::OK,
            Json(DownloadResponse {
                path,
                snapshot: state.recorder.snapshot(),
            }),
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No recording available"),
        Err(e) => recorder_error(e),
    }
}

/// GET /recording/artifact
/// Recording bytes, served as an attachment
pub async fn get_artifact(State(state): State<AppState>) -> impl IntoResponse {
    let ArtifactTicket { name, artifact, .. } = match state.recorder.artifact_ticket().await {
        Ok(Some(ticket)) => ticket,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "No recording available"),
        Err(e) => return recorder_error(e),
    };

    let content_type = HeaderValue::from_str(&artifact.mime_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.file_name(&name)
    ))
    .unwrap_or_else(|_| {
        // Non-ASCII names cannot go into a plain header value
        HeaderValue::from_str(&format!(
            "attachment; filename=\"{}.{}\"",
            DEFAULT_FILE_STEM,
            artifact.encoding().file_extension()
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes().to_vec(),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
