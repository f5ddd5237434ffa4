//! HTTP API for the presentation layer
//!
//! This module exposes the recorder controller as a small REST API:
//! - GET  /health - Health check
//! - GET  /recording - Current session snapshot
//! - POST /recording/start - Start recording (`{"name": "..."}`)
//! - POST /recording/stop - Stop recording
//! - POST /recording/upload - Submit the recording for transcription
//! - POST /recording/download - Save a local copy of the recording
//! - GET  /recording/artifact - Recording bytes as an attachment

mod handlers;
mod routes;
mod state;

pub use handlers::{DownloadResponse, ErrorResponse, StartRecordingRequest};
pub use routes::create_router;
pub use state::AppState;
