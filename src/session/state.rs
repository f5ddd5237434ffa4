//! Session record and its state machine
//!
//! Every method here is a synchronous transition on an owned `Session`. The
//! controller serializes calls to them, so none of them need locking. A
//! transition whose guard fails returns `false` (or `None`) and leaves the
//! session untouched.

use chrono::{DateTime, Utc};

use super::accumulator::ChunkAccumulator;
use super::artifact::Artifact;
use super::snapshot::{SessionSnapshot, SessionStatus, UploadResult};
use crate::audio::{Encoding, Segment};

/// Download status shown once a local copy has been written
pub const DOWNLOAD_COMPLETED: &str = "Download completed";

/// Artifact handed out for one upload attempt or one local save
#[derive(Debug, Clone)]
pub struct ArtifactTicket {
    /// Recording phase the artifact belongs to
    pub generation: u64,
    pub name: String,
    pub artifact: Artifact,
}

#[derive(Debug)]
pub struct Session {
    /// Incremented by every accepted start; tags asynchronous completions
    generation: u64,
    name: String,
    status: SessionStatus,
    elapsed_seconds: u64,
    segments: ChunkAccumulator,
    artifact: Option<Artifact>,
    upload_result: Option<UploadResult>,
    download_status: Option<String>,
    device_available: bool,
    encoding: Encoding,
    started_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            generation: 0,
            name: String::new(),
            status: SessionStatus::Unready,
            elapsed_seconds: 0,
            segments: ChunkAccumulator::new(),
            artifact: None,
            upload_result: None,
            download_status: None,
            device_available: false,
            encoding: Encoding::default(),
            started_at: None,
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn segments(&self) -> &ChunkAccumulator {
        &self.segments
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn upload_result(&self) -> Option<&UploadResult> {
        self.upload_result.as_ref()
    }

    pub fn download_status(&self) -> Option<&str> {
        self.download_status.as_deref()
    }

    pub fn device_available(&self) -> bool {
        self.device_available
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            name: self.name.clone(),
            elapsed_seconds: self.elapsed_seconds,
            device_available: self.device_available,
            segment_count: self.segments.len(),
            started_at: self.started_at,
            artifact: self.artifact.as_ref().map(Artifact::info),
            upload_result: self.upload_result.clone(),
            download_status: self.download_status.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Device acquisition
    // ------------------------------------------------------------------

    /// Unready → Ready once the capture device is granted
    pub fn device_granted(&mut self, encoding: Encoding) -> bool {
        if self.status != SessionStatus::Unready {
            return false;
        }
        self.device_available = true;
        self.encoding = encoding;
        self.status = SessionStatus::Ready;
        true
    }

    /// Capture refused: the session stays Unready for good
    pub fn device_denied(&mut self) {
        self.device_available = false;
        self.status = SessionStatus::Unready;
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Guard for `start`: device granted, non-empty name, not recording
    pub fn can_start(&self, name: &str) -> bool {
        self.device_available
            && !name.is_empty()
            && matches!(
                self.status,
                SessionStatus::Ready
                    | SessionStatus::Stopped
                    | SessionStatus::Uploading
                    | SessionStatus::UploadSucceeded
                    | SessionStatus::UploadFailed
            )
    }

    /// Enter Recording, discarding everything from the previous phase
    pub fn begin_recording(&mut self, name: &str) -> bool {
        if !self.can_start(name) {
            return false;
        }

        self.generation += 1;
        self.name = name.to_string();
        self.segments.clear();
        self.artifact = None;
        self.upload_result = None;
        self.download_status = None;
        self.elapsed_seconds = 0;
        self.started_at = Some(Utc::now());
        self.status = SessionStatus::Recording;
        true
    }

    /// Append a segment that arrived during Recording
    pub fn append_segment(&mut self, segment: Segment) -> bool {
        if self.status != SessionStatus::Recording {
            return false;
        }
        self.segments.push(segment);
        true
    }

    /// One ticker firing
    pub fn tick(&mut self) -> bool {
        if self.status != SessionStatus::Recording {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// Recording → Stopped, materializing the artifact exactly once
    pub fn finish_recording(&mut self) -> bool {
        if self.status != SessionStatus::Recording {
            return false;
        }
        self.artifact = Artifact::materialize(&self.segments, self.encoding);
        self.status = SessionStatus::Stopped;
        true
    }

    // ------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------

    /// Enter Uploading and hand out the artifact to submit
    ///
    /// Requires an artifact and no upload in flight.
    pub fn begin_upload(&mut self) -> Option<ArtifactTicket> {
        if !matches!(
            self.status,
            SessionStatus::Stopped | SessionStatus::UploadSucceeded | SessionStatus::UploadFailed
        ) {
            return None;
        }
        let ticket = self.ticket()?;
        self.status = SessionStatus::Uploading;
        Some(ticket)
    }

    /// Record the result of the upload issued under `generation`
    ///
    /// Completions from an earlier recording phase are ignored.
    pub fn complete_upload(&mut self, generation: u64, outcome: Result<String, String>) -> bool {
        if generation != self.generation || self.status != SessionStatus::Uploading {
            return false;
        }

        match outcome {
            Ok(transcript) => {
                self.upload_result = Some(UploadResult::Transcript(transcript));
                self.status = SessionStatus::UploadSucceeded;
            }
            Err(message) => {
                self.upload_result = Some(UploadResult::Error(message));
                self.status = SessionStatus::UploadFailed;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Download
    // ------------------------------------------------------------------

    /// The artifact to save locally, if one exists
    pub fn download_ticket(&self) -> Option<ArtifactTicket> {
        self.ticket()
    }

    /// A local copy issued under `generation` was written
    pub fn mark_downloaded(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.artifact.is_none() {
            return false;
        }
        self.download_status = Some(DOWNLOAD_COMPLETED.to_string());
        true
    }

    fn ticket(&self) -> Option<ArtifactTicket> {
        let artifact = self.artifact.as_ref()?;
        Some(ArtifactTicket {
            generation: self.generation,
            name: self.name.clone(),
            artifact: artifact.clone(),
        })
    }
}
