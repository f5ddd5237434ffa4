//! Recording session management
//!
//! This module provides the recording-session controller:
//! - `Session`: the owned session record and its state machine
//! - `ChunkAccumulator`: ordered segment storage for one recording phase
//! - `Artifact`: the finished recording, built once per stop
//! - `RecorderController` / `RecorderHandle`: the serialized event loop that
//!   binds the capture device, drives the ticker and dispatches uploads

mod accumulator;
mod artifact;
mod controller;
mod snapshot;
mod state;
mod ticker;

pub use accumulator::ChunkAccumulator;
pub use artifact::{Artifact, ArtifactInfo, DEFAULT_FILE_STEM};
pub use controller::{ControllerOptions, RecorderController, RecorderHandle};
pub use snapshot::{SessionSnapshot, SessionStatus, UploadResult};
pub use state::{ArtifactTicket, Session, DOWNLOAD_COMPLETED};
pub use ticker::Ticker;
