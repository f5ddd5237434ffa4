// File-backed capture device
//
// Replays a local recording as if it were a live input: the file is loaded
// once at acquisition, then cut into segments that are emitted one per
// segment period. WAV input is decoded to 16-bit PCM; anything else is
// treated as a pre-encoded WebM/Opus byte stream and chunked verbatim.

use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::backend::{CaptureConfig, CaptureDevice, CaptureStream, Encoding, Segment};
use crate::error::CaptureError;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            bail!(
                "Unsupported WAV format: {} bits {:?} (expected 16-bit PCM)",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Interleaved little-endian PCM bytes
    pub fn pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::Pcm16 {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Capture device that replays a local file
pub struct FileDevice {
    path: PathBuf,
    config: CaptureConfig,
    name: String,
}

impl FileDevice {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, config, name }
    }

    fn is_wav(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false)
    }

    async fn load(&self) -> Result<(Encoding, Vec<u8>, usize), CaptureError> {
        // Surface access problems as acquisition outcomes before decoding
        if let Err(e) = tokio::fs::metadata(&self.path).await {
            let reason = format!("{}: {}", self.path.display(), e);
            return Err(match e.kind() {
                ErrorKind::NotFound => CaptureError::Unavailable(reason),
                ErrorKind::PermissionDenied => CaptureError::PermissionDenied(reason),
                _ => CaptureError::Backend(anyhow::Error::new(e)),
            });
        }

        if self.is_wav() {
            let path = self.path.clone();
            let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
                .await
                .context("WAV decoding task panicked")??;

            let encoding = audio.encoding();
            let chunk_bytes = pcm_segment_bytes(
                audio.sample_rate,
                audio.channels,
                self.config.segment_duration_ms,
            );
            Ok((encoding, audio.pcm_bytes(), chunk_bytes))
        } else {
            let data = tokio::fs::read(&self.path).await.map_err(|e| {
                let reason = format!("{}: {}", self.path.display(), e);
                match e.kind() {
                    ErrorKind::PermissionDenied => CaptureError::PermissionDenied(reason),
                    _ => CaptureError::Backend(anyhow::Error::new(e)),
                }
            })?;
            Ok((Encoding::WebmOpus, data, self.config.file_chunk_bytes.max(1)))
        }
    }
}

/// Bytes of interleaved 16-bit PCM covering `duration_ms`, rounded to whole frames
pub(crate) fn pcm_segment_bytes(sample_rate: u32, channels: u16, duration_ms: u64) -> usize {
    let frame_bytes = channels.max(1) as u64 * 2;
    let frames = (sample_rate as u64 * duration_ms / 1000).max(1);
    (frames * frame_bytes) as usize
}

#[async_trait::async_trait]
impl CaptureDevice for FileDevice {
    async fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (encoding, data, chunk_bytes) = self.load().await?;

        info!(
            "File device ready: {} ({} bytes, {}, {} bytes/segment)",
            self.path.display(),
            data.len(),
            encoding,
            chunk_bytes
        );

        Ok(Box::new(FileStream {
            name: self.name.clone(),
            encoding,
            data: Arc::from(data),
            chunk_bytes,
            period: Duration::from_millis(self.config.segment_duration_ms.max(1)),
            playback: None,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Running playback task plus the signal that ends it
struct Playback {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct FileStream {
    name: String,
    encoding: Encoding,
    data: Arc<[u8]>,
    chunk_bytes: usize,
    period: Duration,
    playback: Option<Playback>,
}

#[async_trait::async_trait]
impl CaptureStream for FileStream {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<Segment>> {
        if self.is_capturing() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let data = Arc::clone(&self.data);
        let chunk_bytes = self.chunk_bytes;
        let period = self.period;

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut interval = tokio::time::interval_at(started + period, period);
            let mut emitted = 0usize;

            for chunk in data.chunks(chunk_bytes) {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {}
                }

                let timestamp_ms = started.elapsed().as_millis() as u64;
                if tx.send(Segment::new(chunk.to_vec(), timestamp_ms)).is_err() {
                    break;
                }
                emitted += 1;
            }

            debug!("File playback ended after {} segments", emitted);
        });

        self.playback = Some(Playback { stop_tx, handle });
        info!("File playback started: {}", self.name);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(playback) = self.playback.take() else {
            return Ok(());
        };

        // The task may already have finished; a closed signal is fine
        let _ = playback.stop_tx.send(());
        if let Err(e) = playback.handle.await {
            warn!("File playback task failed: {}", e);
        }

        info!("File playback stopped: {}", self.name);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.playback
            .as_ref()
            .map(|p| !p.handle.is_finished())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
