use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::config::{CaptureSettings, CaptureSourceKind};
use crate::error::CaptureError;

/// One opaque binary chunk emitted by a capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Encoded (or raw PCM) bytes, meaningful only once concatenated with their neighbours
    pub data: Vec<u8>,
    /// Milliseconds since the stream was started
    pub timestamp_ms: u64,
}

impl Segment {
    pub fn new(data: Vec<u8>, timestamp_ms: u64) -> Self {
        Self { data, timestamp_ms }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Media encoding carried by every segment of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Opus in a WebM container (what browser recorders produce)
    WebmOpus,
    /// Interleaved little-endian signed 16-bit PCM
    Pcm16 { sample_rate: u32, channels: u16 },
}

impl Encoding {
    /// MIME type sent with uploads and downloads
    pub fn mime_type(&self) -> String {
        match self {
            Self::WebmOpus => "audio/webm; codecs=opus".to_string(),
            Self::Pcm16 {
                sample_rate,
                channels,
            } => format!("audio/L16; rate={}; channels={}", sample_rate, channels),
        }
    }

    /// File extension used for local copies
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::WebmOpus => "webm",
            // Raw PCM gets wrapped in a WAV header when saved
            Self::Pcm16 { .. } => "wav",
        }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::WebmOpus
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type())
    }
}

/// Configuration shared by capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// How much audio each emitted segment covers
    pub segment_duration_ms: u64,
    /// Segment size when replaying pre-encoded files
    pub file_chunk_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            segment_duration_ms: 1000, // 1s segments
            file_chunk_bytes: 16 * 1024,
        }
    }
}

/// A capture device that has not been opened yet
///
/// Implementations:
/// - `FileDevice`: replays a local file (WAV or pre-encoded WebM)
/// - `MicrophoneDevice`: default input device via cpal (feature `microphone`)
#[async_trait::async_trait]
pub trait CaptureDevice: Send {
    /// Request access to the device
    ///
    /// Called once per controller. An error means capture stays unavailable.
    async fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// A granted capture stream
#[async_trait::async_trait]
pub trait CaptureStream: Send {
    /// Encoding of every segment this stream emits
    fn encoding(&self) -> Encoding;

    /// Start emitting segments
    ///
    /// Returns a fresh receiver for this capture phase. Segments arrive in
    /// emission order; the channel closes if the device ends on its own.
    /// The channel is unbounded: a device never drops a segment or waits on
    /// the controller to make room.
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<Segment>>;

    /// Stop emitting segments
    ///
    /// Once this returns, every segment of the phase is already buffered in
    /// the receiver returned by `start`.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the stream is currently capturing
    fn is_capturing(&self) -> bool;

    /// Stream name for logging
    fn name(&self) -> &str;
}

/// Capture source selected by configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Default input device
    Microphone,
    /// Local file played back in real time
    File(PathBuf),
}

impl CaptureSource {
    pub fn from_settings(settings: &CaptureSettings) -> Result<Self> {
        match settings.source {
            CaptureSourceKind::Microphone => Ok(Self::Microphone),
            CaptureSourceKind::File => {
                let path = settings
                    .file_path
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("capture.file_path is required when capture.source = \"file\""))?;
                Ok(Self::File(crate::config::expand_path(path)))
            }
        }
    }
}

/// Capture device factory
pub struct CaptureDeviceFactory;

impl CaptureDeviceFactory {
    /// Create the capture device described by configuration
    pub fn create(settings: &CaptureSettings) -> Result<Box<dyn CaptureDevice>> {
        let config = CaptureConfig {
            segment_duration_ms: settings.segment_duration_ms,
            file_chunk_bytes: settings.file_chunk_bytes,
            ..CaptureConfig::default()
        };

        match CaptureSource::from_settings(settings)? {
            CaptureSource::File(path) => {
                Ok(Box::new(super::file::FileDevice::new(path, config)))
            }

            CaptureSource::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    Ok(Box::new(super::microphone::MicrophoneDevice::new(config)))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    tracing::warn!(
                        "Built without the `microphone` feature; capture will be unavailable \
                        (set capture.source = \"file\" to replay a recording)"
                    );
                    Ok(Box::new(UnavailableDevice::new(
                        "microphone",
                        "built without microphone support",
                    )))
                }
            }
        }
    }
}

/// Device that can never be acquired
///
/// Stands in for a source this build cannot drive, so the controller still
/// runs and reports the session as Unready.
pub struct UnavailableDevice {
    name: String,
    reason: String,
}

impl UnavailableDevice {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for UnavailableDevice {
    async fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        Err(CaptureError::Unavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
