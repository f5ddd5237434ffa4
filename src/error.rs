//! Error types shared across the capture, upload and controller seams.
//!
//! Failed preconditions (starting without a name, stopping while idle, ...)
//! have no variant here: those commands are ignored, not reported.

use thiserror::Error;

/// Why a capture device could not be acquired or driven
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user or OS refused access to the device
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),

    /// No usable device was found
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("capture backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Failure reported for a single upload attempt
///
/// The `Display` text is what ends up in the session's upload result.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The service answered with an error message
    #[error("{0}")]
    Service(String),

    /// The service answered with a non-success status
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    /// The request never produced a response
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered 2xx with a body we could not read
    #[error("invalid response from transcription service: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by `RecorderHandle`
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The controller task is gone; no further commands can be processed
    #[error("recorder controller has shut down")]
    ControllerClosed,

    /// Writing the local copy of the artifact failed
    #[error("failed to save recording: {0:#}")]
    Download(anyhow::Error),
}
