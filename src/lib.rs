pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod upload;

pub use audio::{
    AudioFile, CaptureConfig, CaptureDevice, CaptureDeviceFactory, CaptureSource, CaptureStream,
    Encoding, FileDevice, Segment, UnavailableDevice,
};
pub use config::Config;
pub use error::{CaptureError, RecorderError, UploadError};
pub use http::{create_router, AppState};
pub use session::{
    Artifact, ArtifactInfo, ChunkAccumulator, ControllerOptions, RecorderController,
    RecorderHandle, Session, SessionSnapshot, SessionStatus, UploadResult,
};
pub use upload::{HttpUploadService, Transcript, UploadService};
