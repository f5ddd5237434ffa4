//! Upload pipeline collaborator
//!
//! The controller hands a finished artifact to an `UploadService` and gets
//! back either a transcript or a human-readable failure. One call is one
//! attempt: implementations must not retry.

pub mod client;
pub mod messages;

use crate::error::UploadError;
use crate::session::Artifact;

pub use client::HttpUploadService;
pub use messages::{ServiceErrorBody, Transcript};

#[async_trait::async_trait]
pub trait UploadService: Send + Sync {
    /// Submit `artifact` (tagged `name`) for transcription
    async fn submit(&self, name: &str, artifact: &Artifact) -> Result<Transcript, UploadError>;

    /// Service name for logging
    fn name(&self) -> &str;
}
