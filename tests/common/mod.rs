// Shared test doubles for the capture device and the upload service
//
// The scripted device hands segments to the controller only when a test
// emits them; the mock uploader counts submissions and can hold them open
// until released.

#![allow(dead_code)]

use anyhow::{bail, Result};
use loqa_clips::{
    Artifact, CaptureDevice, CaptureError, CaptureStream, ControllerOptions, Encoding,
    RecorderController, RecorderHandle, Segment, Transcript, UploadError, UploadService,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Test-side view of a scripted device
#[derive(Clone, Default)]
pub struct DeviceProbe {
    feed: Arc<Mutex<Option<mpsc::UnboundedSender<Segment>>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl DeviceProbe {
    /// Emit one segment; returns false when the device is not capturing
    pub fn emit(&self, data: &[u8]) -> bool {
        let sender = self.feed.lock().unwrap().clone();
        match sender {
            Some(sender) => sender.send(Segment::new(data.to_vec(), 0)).is_ok(),
            None => false,
        }
    }

    /// Close the active phase from the device side
    pub fn end_capture(&self) {
        self.feed.lock().unwrap().take();
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_capturing(&self) -> bool {
        self.feed.lock().unwrap().is_some()
    }
}

pub struct ScriptedDevice {
    grant: bool,
    encoding: Encoding,
    probe: DeviceProbe,
}

impl ScriptedDevice {
    pub fn granted() -> (Self, DeviceProbe) {
        Self::with_encoding(Encoding::WebmOpus)
    }

    pub fn with_encoding(encoding: Encoding) -> (Self, DeviceProbe) {
        let probe = DeviceProbe::default();
        (
            Self {
                grant: true,
                encoding,
                probe: probe.clone(),
            },
            probe,
        )
    }

    pub fn denied() -> (Self, DeviceProbe) {
        let (mut device, probe) = Self::granted();
        device.grant = false;
        (device, probe)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn acquire(&mut self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if !self.grant {
            return Err(CaptureError::PermissionDenied("user declined".to_string()));
        }
        Ok(Box::new(ScriptedStream {
            encoding: self.encoding,
            probe: self.probe.clone(),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedStream {
    encoding: Encoding,
    probe: DeviceProbe,
}

#[async_trait::async_trait]
impl CaptureStream for ScriptedStream {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<Segment>> {
        let mut feed = self.probe.feed.lock().unwrap();
        if feed.is_some() {
            bail!("Already capturing");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *feed = Some(tx);
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.probe.feed.lock().unwrap().take();
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.probe.is_capturing()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Upload service double
pub struct MockUploader {
    outcome: Result<String, String>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    gate: Option<Arc<Notify>>,
    last_name: Mutex<Option<String>>,
    last_bytes: Mutex<Option<Vec<u8>>>,
}

impl MockUploader {
    pub fn succeeding(transcript: &str) -> Arc<Self> {
        Arc::new(Self::new(Ok(transcript.to_string()), None))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self::new(Err(message.to_string()), None))
    }

    /// Succeeds only after `gate` is notified
    pub fn gated(transcript: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self::new(Ok(transcript.to_string()), Some(gate)))
    }

    fn new(outcome: Result<String, String>, gate: Option<Arc<Notify>>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            gate,
            last_name: Mutex::new(None),
            last_bytes: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn last_name(&self) -> Option<String> {
        self.last_name.lock().unwrap().clone()
    }

    pub fn last_bytes(&self) -> Option<Vec<u8>> {
        self.last_bytes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl UploadService for MockUploader {
    async fn submit(&self, name: &str, artifact: &Artifact) -> Result<Transcript, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_name.lock().unwrap() = Some(name.to_string());
        *self.last_bytes.lock().unwrap() = Some(artifact.bytes().to_vec());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(transcript) => Ok(Transcript {
                transcript: transcript.clone(),
            }),
            Err(message) => Err(UploadError::Service(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn options(downloads_dir: PathBuf) -> ControllerOptions {
    ControllerOptions {
        downloads_dir,
        ..ControllerOptions::default()
    }
}

/// Spawn a controller over a granted scripted device
pub fn spawn_recorder(uploader: Arc<MockUploader>) -> (RecorderHandle, DeviceProbe) {
    let (device, probe) = ScriptedDevice::granted();
    let handle = RecorderController::spawn(
        Box::new(device),
        uploader,
        options(std::env::temp_dir().join("loqa-clips-tests")),
    );
    (handle, probe)
}

/// Let spawned tasks run to quiescence (paused-clock tests only)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
