pub mod backend;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{
    CaptureConfig, CaptureDevice, CaptureDeviceFactory, CaptureSource, CaptureStream, Encoding,
    Segment, UnavailableDevice,
};
pub use file::{AudioFile, FileDevice};

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneDevice;
