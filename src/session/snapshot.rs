use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::artifact::ArtifactInfo;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Capture device not (yet) granted
    Unready,
    /// Device granted, nothing recorded
    Ready,
    Recording,
    /// Capture finished; an artifact exists if anything was captured
    Stopped,
    Uploading,
    UploadSucceeded,
    UploadFailed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unready => "Microphone access required",
            Self::Ready => "Ready",
            Self::Recording => "Recording",
            Self::Stopped => "Stopped",
            Self::Uploading => "Uploading...",
            Self::UploadSucceeded => "Upload successful",
            Self::UploadFailed => "Upload failed",
        };
        f.write_str(label)
    }
}

/// Outcome of the most recent upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum UploadResult {
    Transcript(String),
    Error(String),
}

impl UploadResult {
    /// Transcript text or error message
    pub fn message(&self) -> &str {
        match self {
            Self::Transcript(text) | Self::Error(text) => text,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Transcript(_))
    }
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transcript(text) => write!(f, "Upload successful: Transcript - \"{}\"", text),
            Self::Error(message) => write!(f, "Upload failed: {}", message),
        }
    }
}

/// Read-only view of the session published after every handled event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,

    /// Name given at the last accepted start (empty before the first one)
    pub name: String,

    /// Whole seconds spent recording in the current phase
    pub elapsed_seconds: u64,

    /// Whether the capture device was granted
    pub device_available: bool,

    /// Segments accumulated in the current phase
    pub segment_count: usize,

    /// When the current recording phase began
    pub started_at: Option<DateTime<Utc>>,

    pub artifact: Option<ArtifactInfo>,

    pub upload_result: Option<UploadResult>,

    pub download_status: Option<String>,
}

impl SessionSnapshot {
    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }
}
