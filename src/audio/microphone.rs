// Microphone capture via cpal
//
// cpal streams are not `Send`, so each capture phase runs its stream on a
// dedicated thread. The data callback converts samples to 16-bit PCM and
// cuts a segment every segment period; stopping the phase drops the stream,
// flushes the partial segment and joins the thread.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::backend::{CaptureConfig, CaptureDevice, CaptureStream, Encoding, Segment};
use super::file::pcm_segment_bytes;
use crate::error::CaptureError;

/// Default host input device
pub struct MicrophoneDevice {
    config: CaptureConfig,
}

impl MicrophoneDevice {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneDevice {
    async fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (device_name, sample_rate, channels) = tokio::task::spawn_blocking(probe_default_input)
            .await
            .map_err(|e| CaptureError::Backend(anyhow!("device probe panicked: {}", e)))??;

        info!(
            "Microphone acquired: {} ({} Hz, {} channels)",
            device_name, sample_rate, channels
        );

        Ok(Box::new(MicrophoneStream {
            name: device_name,
            encoding: Encoding::Pcm16 {
                sample_rate,
                channels,
            },
            segment_bytes: pcm_segment_bytes(sample_rate, channels, self.config.segment_duration_ms),
            worker: None,
        }))
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn probe_default_input() -> Result<(String, u32, u16), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::Unavailable("no input device available".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());

    // Hosts that gate microphone access fail here rather than at enumeration
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::PermissionDenied(format!("{}: {}", device_name, e)))?;

    Ok((device_name, supported.sample_rate().0, supported.channels()))
}

/// Accumulates converted samples and emits fixed-size segments
struct Segmenter {
    buffer: Vec<u8>,
    segment_bytes: usize,
    started: Instant,
    tx: mpsc::UnboundedSender<Segment>,
}

impl Segmenter {
    fn push(&mut self, samples: impl Iterator<Item = i16>) {
        for sample in samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }

        while self.buffer.len() >= self.segment_bytes {
            let rest = self.buffer.split_off(self.segment_bytes);
            let data = std::mem::replace(&mut self.buffer, rest);
            let segment = Segment::new(data, self.started.elapsed().as_millis() as u64);
            if self.tx.send(segment).is_err() {
                debug!("segment receiver closed, capture output discarded");
            }
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.buffer);
        let segment = Segment::new(data, self.started.elapsed().as_millis() as u64);
        if self.tx.send(segment).is_err() {
            debug!("segment receiver closed before final flush");
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn u16_to_i16(sample: u16) -> i16 {
    (sample as i32 - 32768) as i16
}

/// Body of the capture thread for one phase
fn run_capture(
    segment_bytes: usize,
    tx: mpsc::UnboundedSender<Segment>,
    stop_rx: std_mpsc::Receiver<()>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let segmenter = Arc::new(Mutex::new(Segmenter {
        buffer: Vec::with_capacity(segment_bytes),
        segment_bytes,
        started: Instant::now(),
        tx,
    }));

    let stream = match build_stream(Arc::clone(&segmenter)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!("failed to start input stream: {}", e)));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    // Blocks until stop() signals or the stream handle is dropped
    let _ = stop_rx.recv();
    drop(stream);

    if let Ok(mut segmenter) = segmenter.lock() {
        segmenter.flush();
    }
}

fn build_stream(segmenter: Arc<Mutex<Segmenter>>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("no input device available")?;
    let supported = device
        .default_input_config()
        .context("failed to get default input config")?;

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let err_fn = |err| warn!("audio stream error: {}", err);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut s) = segmenter.lock() {
                    s.push(data.iter().map(|&x| f32_to_i16(x)));
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut s) = segmenter.lock() {
                    s.push(data.iter().copied());
                }
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut s) = segmenter.lock() {
                    s.push(data.iter().map(|&x| u16_to_i16(x)));
                }
            },
            err_fn,
            None,
        ),
        other => bail!("unsupported input sample format: {:?}", other),
    }
    .context("failed to build input stream")?;

    Ok(stream)
}

struct Worker {
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

struct MicrophoneStream {
    name: String,
    encoding: Encoding,
    segment_bytes: usize,
    worker: Option<Worker>,
}

#[async_trait::async_trait]
impl CaptureStream for MicrophoneStream {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<Segment>> {
        if self.worker.is_some() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let segment_bytes = self.segment_bytes;

        let handle = std::thread::Builder::new()
            .name("loqa-clips-mic".to_string())
            .spawn(move || run_capture(segment_bytes, tx, stop_rx, ready_tx))
            .context("failed to spawn capture thread")?;

        ready_rx
            .await
            .context("capture thread exited before starting")??;

        self.worker = Some(Worker { stop_tx, handle });
        info!("Microphone capture started: {}", self.name);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let _ = worker.stop_tx.send(());
        tokio::task::spawn_blocking(move || worker.handle.join())
            .await
            .context("failed to join capture thread")?
            .map_err(|_| anyhow!("capture thread panicked"))?;

        info!("Microphone capture stopped: {}", self.name);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
