use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::artifact::Artifact;
use super::snapshot::{SessionSnapshot, SessionStatus};
use super::state::{ArtifactTicket, Session};
use super::ticker::Ticker;
use crate::audio::{CaptureDevice, CaptureStream, Segment};
use crate::error::RecorderError;
use crate::upload::UploadService;

/// Tunables for a controller instance
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Cadence of `elapsed_seconds` (one second outside tests)
    pub tick_period: Duration,
    /// Where `download` writes local copies
    pub downloads_dir: PathBuf,
    /// Capacity of the command/event queue
    pub inbox_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_period: Ticker::DEFAULT_PERIOD,
            downloads_dir: PathBuf::from("recordings"),
            inbox_capacity: 64,
        }
    }
}

/// Everything the controller loop reacts to, besides segments and ticks
enum Event {
    Start {
        name: String,
        done: oneshot::Sender<()>,
    },
    Stop {
        done: oneshot::Sender<()>,
    },
    Upload {
        done: oneshot::Sender<()>,
    },
    /// The current artifact together with the phase it belongs to
    Ticket {
        reply: oneshot::Sender<Option<ArtifactTicket>>,
    },
    Downloaded {
        generation: u64,
        done: oneshot::Sender<()>,
    },
    UploadFinished {
        generation: u64,
        outcome: Result<String, String>,
    },
}

/// Owns the session and serializes everything that touches it
///
/// Segment arrivals, ticker firings, commands and upload completions are all
/// handled on one task, one at a time, so transitions never interleave.
pub struct RecorderController {
    session: Session,
    stream: Option<Box<dyn CaptureStream>>,
    /// Receiver of the active recording phase
    segments: Option<mpsc::UnboundedReceiver<Segment>>,
    /// Held only while recording
    ticker: Option<Ticker>,
    tick_period: Duration,
    uploader: Arc<dyn UploadService>,
    inbox: mpsc::Receiver<Event>,
    /// Lets upload tasks report back without keeping the loop alive
    outbox: mpsc::WeakSender<Event>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl RecorderController {
    /// Spawn the controller loop and return a handle to it
    ///
    /// The device is acquired once, before the first command is processed.
    /// The loop ends when the last handle is dropped.
    pub fn spawn(
        device: Box<dyn CaptureDevice>,
        uploader: Arc<dyn UploadService>,
        options: ControllerOptions,
    ) -> RecorderHandle {
        let (events, inbox) = mpsc::channel(options.inbox_capacity.max(1));
        let session = Session::new();
        let (snapshots, snapshot_rx) = watch::channel(session.snapshot());

        let controller = Self {
            session,
            stream: None,
            segments: None,
            ticker: None,
            tick_period: options.tick_period,
            uploader,
            inbox,
            outbox: events.downgrade(),
            snapshots,
        };

        tokio::spawn(controller.run(device));

        RecorderHandle {
            events,
            snapshots: snapshot_rx,
            downloads_dir: Arc::new(options.downloads_dir),
        }
    }

    async fn run(mut self, mut device: Box<dyn CaptureDevice>) {
        self.acquire(device.as_mut()).await;
        self.publish();

        loop {
            tokio::select! {
                biased;

                segment = next_segment(&mut self.segments) => self.on_segment(segment).await,

                _ = next_tick(&mut self.ticker) => self.on_tick(),

                event = self.inbox.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }

            self.publish();
        }

        if self.session.status() == SessionStatus::Recording {
            self.finish_recording("controller shutting down").await;
        }
        info!("Recorder controller stopped");
    }

    async fn acquire(&mut self, device: &mut dyn CaptureDevice) {
        info!("Requesting capture device: {}", device.name());

        match device.acquire().await {
            Ok(stream) => {
                info!(
                    "Capture device granted: {} ({})",
                    stream.name(),
                    stream.encoding()
                );
                self.session.device_granted(stream.encoding());
                self.stream = Some(stream);
            }
            Err(e) => {
                warn!("Capture device {} unavailable: {}", device.name(), e);
                self.session.device_denied();
            }
        }
    }

    async fn handle(&mut self, event: Event) {
        match event {
            Event::Start { name, done } => {
                self.start(name).await;
                self.ack(done);
            }
            Event::Stop { done } => {
                if self.session.status() == SessionStatus::Recording {
                    self.finish_recording("stop requested").await;
                } else {
                    debug!("stop ignored: session is {:?}", self.session.status());
                }
                self.ack(done);
            }
            Event::Upload { done } => {
                self.upload();
                self.ack(done);
            }
            Event::Ticket { reply } => {
                let ticket = self.session.download_ticket();
                if ticket.is_none() {
                    debug!("no artifact available");
                }
                let _ = reply.send(ticket);
            }
            Event::Downloaded { generation, done } => {
                if !self.session.mark_downloaded(generation) {
                    debug!("download completion for generation {} is stale", generation);
                }
                self.ack(done);
            }
            Event::UploadFinished {
                generation,
                outcome,
            } => self.on_upload_finished(generation, outcome),
        }
    }

    async fn start(&mut self, name: String) {
        if !self.session.can_start(&name) {
            debug!(
                "start ignored: status={:?}, device_available={}, name_empty={}",
                self.session.status(),
                self.session.device_available(),
                name.is_empty()
            );
            return;
        }

        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let receiver = match stream.start().await {
            Ok(receiver) => receiver,
            Err(e) => {
                error!("Failed to start capture on {}: {:#}", stream.name(), e);
                return;
            }
        };

        self.session.begin_recording(&name);
        self.segments = Some(receiver);
        self.ticker = Some(Ticker::start(self.tick_period));

        info!(
            "Recording started: {:?} (generation {})",
            name,
            self.session.generation()
        );
    }

    /// Leave the recording phase: release the ticker, stop the device, take
    /// in every segment it already produced, then materialize
    async fn finish_recording(&mut self, reason: &str) {
        self.ticker = None;

        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = stream.stop().await {
                warn!("Failed to stop capture on {}: {:#}", stream.name(), e);
            }
        }

        if let Some(mut receiver) = self.segments.take() {
            while let Ok(segment) = receiver.try_recv() {
                self.session.append_segment(segment);
            }
        }

        self.session.finish_recording();

        match self.session.artifact() {
            Some(artifact) => info!(
                "Recording stopped ({}): {} segments, {} bytes, {}s, artifact {}",
                reason,
                artifact.segment_count(),
                artifact.len(),
                self.session.elapsed_seconds(),
                artifact.id()
            ),
            None => info!(
                "Recording stopped ({}): no segments captured, nothing to save or upload",
                reason
            ),
        }
    }

    async fn on_segment(&mut self, segment: Option<Segment>) {
        match segment {
            Some(segment) => {
                let len = segment.len();
                if self.session.append_segment(segment) {
                    debug!(
                        "segment {} appended ({} bytes)",
                        self.session.segments().len(),
                        len
                    );
                } else {
                    debug!("segment outside recording phase discarded");
                }
            }
            None => {
                // The device closed the phase on its own
                self.segments = None;
                if self.session.status() == SessionStatus::Recording {
                    self.finish_recording("capture ended by device").await;
                }
            }
        }
    }

    fn on_tick(&mut self) {
        if self.session.tick() {
            debug!("elapsed {}s", self.session.elapsed_seconds());
        }
    }

    fn upload(&mut self) {
        let Some(ticket) = self.session.begin_upload() else {
            debug!(
                "upload ignored: status={:?}, artifact={}",
                self.session.status(),
                self.session.artifact().is_some()
            );
            return;
        };

        info!(
            "Upload started via {}: artifact {} (generation {})",
            self.uploader.name(),
            ticket.artifact.id(),
            ticket.generation
        );

        let uploader = Arc::clone(&self.uploader);
        let outbox = self.outbox.clone();

        tokio::spawn(async move {
            let outcome = uploader
                .submit(&ticket.name, &ticket.artifact)
                .await
                .map(|t| t.transcript)
                .map_err(|e| e.to_string());

            if let Some(events) = outbox.upgrade() {
                let _ = events
                    .send(Event::UploadFinished {
                        generation: ticket.generation,
                        outcome,
                    })
                    .await;
            }
        });
    }

    fn on_upload_finished(&mut self, generation: u64, outcome: Result<String, String>) {
        let succeeded = outcome.is_ok();
        if !self.session.complete_upload(generation, outcome) {
            debug!(
                "upload completion for generation {} discarded (current generation {})",
                generation,
                self.session.generation()
            );
            return;
        }

        if succeeded {
            info!("Upload succeeded (generation {})", generation);
        } else {
            warn!(
                "Upload failed (generation {}): {}",
                generation,
                self.session
                    .upload_result()
                    .map(|r| r.message())
                    .unwrap_or_default()
            );
        }
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Acknowledge a command once its effect is observable
    fn ack(&self, done: oneshot::Sender<()>) {
        self.publish();
        let _ = done.send(());
    }
}

async fn next_segment(
    segments: &mut Option<mpsc::UnboundedReceiver<Segment>>,
) -> Option<Segment> {
    match segments {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Ticker>) {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running controller
///
/// Commands resolve once the controller has processed them, so a following
/// `snapshot()` already reflects their effect. Commands whose preconditions
/// do not hold are ignored without error.
#[derive(Clone)]
pub struct RecorderHandle {
    events: mpsc::Sender<Event>,
    snapshots: watch::Receiver<SessionSnapshot>,
    downloads_dir: Arc<PathBuf>,
}

impl RecorderHandle {
    /// Begin a new recording named `name`
    pub async fn start(&self, name: impl Into<String>) -> Result<(), RecorderError> {
        let name = name.into();
        self.request(|done| Event::Start { name, done }).await
    }

    /// Stop the current recording and build its artifact
    pub async fn stop(&self) -> Result<(), RecorderError> {
        self.request(|done| Event::Stop { done }).await
    }

    /// Submit the artifact for transcription; completion is observed via snapshots
    pub async fn upload(&self) -> Result<(), RecorderError> {
        self.request(|done| Event::Upload { done }).await
    }

    /// Save a local copy of the artifact, if there is one
    pub async fn download(&self) -> Result<Option<PathBuf>, RecorderError> {
        self.download_with(|_| {}).await
    }

    /// Save a local copy of the artifact and run `on_complete` with its path
    pub async fn download_with<F>(&self, on_complete: F) -> Result<Option<PathBuf>, RecorderError>
    where
        F: FnOnce(&Path) + Send,
    {
        let Some(ticket) = self.artifact_ticket().await? else {
            return Ok(None);
        };

        let path = ticket
            .artifact
            .save_to(&self.downloads_dir, &ticket.name)
            .await
            .map_err(RecorderError::Download)?;

        self.request(|done| Event::Downloaded {
            generation: ticket.generation,
            done,
        })
        .await?;

        on_complete(&path);
        Ok(Some(path))
    }

    /// The current artifact
    pub async fn artifact(&self) -> Result<Option<Artifact>, RecorderError> {
        Ok(self.artifact_ticket().await?.map(|ticket| ticket.artifact))
    }

    /// The current artifact with the session name and generation it was
    /// recorded under, read in one step
    pub async fn artifact_ticket(&self) -> Result<Option<ArtifactTicket>, RecorderError> {
        self.request(|reply| Event::Ticket { reply }).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshots.borrow().status
    }

    /// Receiver that changes whenever the session does
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot, RecorderError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut receiver = self.snapshots.clone();
        loop {
            {
                let snapshot = receiver.borrow_and_update();
                if predicate(&snapshot) {
                    return Ok(snapshot.clone());
                }
            }
            receiver
                .changed()
                .await
                .map_err(|_| RecorderError::ControllerClosed)?;
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Event,
    ) -> Result<T, RecorderError> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(make(tx))
            .await
            .map_err(|_| RecorderError::ControllerClosed)?;
        rx.await.map_err(|_| RecorderError::ControllerClosed)
    }
}
