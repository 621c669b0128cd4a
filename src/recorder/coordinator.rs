//! Recording coordinator
//!
//! Owns the recording status and the active composite session, and drives the
//! start/stop/pause/resume lifecycle across capture, compositor and sink.

use super::error::{RecordingError, RecordingResult};
use super::session::{CompositeSession, SessionInfo};
use super::state::RecordingStatus;
use crate::capture::{acquire_streams, CaptureProvider, MediaStream, StreamHandle};
use crate::compositor::{
    begin_composite, CompositorEvent, IntervalPacer, SharedLayout, SharedSurface,
};
use crate::config::RecorderConfig;
use crate::sink::{ArtifactInfo, RecordedArtifact, RecorderBackend, RecordingSink};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Events emitted during recording
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// Session started
    Started(Uuid),
    /// Session stopped, artifact ready if finalization succeeded
    Stopped(Uuid),
    Paused,
    Resumed,
    /// Session torn down after a failure
    Error(String),
    /// Artifact handed out
    Finished(Uuid),
}

/// Drives one composite session at a time
pub struct RecordingCoordinator {
    /// Current status
    status: Arc<RwLock<RecordingStatus>>,

    provider: Arc<dyn CaptureProvider>,

    surface: SharedSurface,

    sink: RecordingSink,

    /// Overlay layout, read by the draw loop every frame
    layout: SharedLayout,

    refresh_rate: u32,

    /// Active session; present exactly while recording or paused
    session: Option<CompositeSession>,

    /// Artifact of the last stopped session, until collected
    artifact: Option<RecordedArtifact>,

    last_error: Option<String>,

    event_tx: broadcast::Sender<RecordingEvent>,

    compositor_tx: mpsc::UnboundedSender<CompositorEvent>,

    compositor_rx: Option<mpsc::UnboundedReceiver<CompositorEvent>>,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(
        config: &RecorderConfig,
        provider: Arc<dyn CaptureProvider>,
        surface: SharedSurface,
        backend: Arc<dyn RecorderBackend>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (compositor_tx, compositor_rx) = mpsc::unbounded_channel();
        Self {
            status: Arc::new(RwLock::new(RecordingStatus::Initialized)),
            provider,
            surface,
            sink: RecordingSink::new(backend, config.recorder_options()),
            layout: Arc::new(RwLock::new(config.layout())),
            refresh_rate: config.refresh_rate,
            session: None,
            artifact: None,
            last_error: None,
            event_tx,
            compositor_tx,
            compositor_rx: Some(compositor_rx),
        }
    }

    /// Get the current recording status.
    ///
    /// This is the last committed transition. While `stop` or `fail` is
    /// still tearing a session down it keeps reporting `recording` or
    /// `paused`, and `start` stays rejected until teardown has finished.
    pub fn status(&self) -> RecordingStatus {
        *self.status.read()
    }

    /// Shared status cell, readable without locking the coordinator. Lags
    /// teardown the same way `status` does.
    pub fn status_handle(&self) -> Arc<RwLock<RecordingStatus>> {
        self.status.clone()
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Shared overlay layout; edits apply from the next drawn frame
    pub fn layout(&self) -> SharedLayout {
        self.layout.clone()
    }

    /// Take the receiver for draw loop events. Returns `None` after the first
    /// call.
    pub fn take_compositor_events(&mut self) -> Option<mpsc::UnboundedReceiver<CompositorEvent>> {
        self.compositor_rx.take()
    }

    pub fn session(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|s| s.info())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Metadata of the artifact waiting to be collected
    pub fn artifact_info(&self) -> Option<&ArtifactInfo> {
        self.artifact.as_ref().map(|a| &a.info)
    }

    /// Get recording duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.session.as_ref().map(|s| s.duration_ms()).unwrap_or(0.0)
    }

    fn set_status(&self, status: RecordingStatus) {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            tracing::debug!("Recording status {} -> {}", previous, status);
        }
    }

    fn emit(&self, event: RecordingEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Start a session.
    ///
    /// Acquires both streams, starts compositing into the canvas, then starts
    /// the recorder on the composite stream. Rejected while a session exists.
    /// Any failure releases whatever was already acquired and leaves the
    /// status unchanged.
    pub async fn start(&mut self) -> RecordingResult<()> {
        let current = self.status();
        if !current.can_start() {
            tracing::warn!("Rejecting start while {}", current);
            return Err(RecordingError::InvalidStateTransition {
                from: current,
                action: "start",
            });
        }

        tracing::info!("Starting recording");

        let (screen, webcam) = acquire_streams(self.provider.as_ref())
            .await
            .map_err(|e| {
                tracing::warn!("Stream acquisition failed: {}", e);
                RecordingError::from(e)
            })?;

        let output = match begin_composite(
            screen.clone(),
            webcam.clone(),
            self.surface.clone(),
            self.layout.clone(),
            Box::new(IntervalPacer::new(self.refresh_rate)),
            Some(self.compositor_tx.clone()),
        ) {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Failed to start compositing: {}", e);
                release(&[&screen, &webcam]);
                return Err(e.into());
            }
        };

        let recorder = match self.sink.start_recording(output.output_stream.clone()) {
            Ok(recorder) => recorder,
            Err(e) => {
                tracing::error!("Failed to start recorder: {}", e);
                output.cancel.cancel();
                release(&[&screen, &webcam, &output.output_stream]);
                if let Err(join) = output.task.await {
                    tracing::warn!("Draw loop ended abnormally: {}", join);
                }
                return Err(e.into());
            }
        };

        if let Some(stale) = self.artifact.take() {
            tracing::info!("Discarding uncollected artifact {}", stale.info.id);
        }

        let session = CompositeSession::new(
            screen,
            webcam,
            output.output_stream,
            output.cancel,
            output.task,
            recorder,
        );
        let session_id = session.id();
        self.session = Some(session);
        self.last_error = None;
        self.set_status(RecordingStatus::Recording);
        self.emit(RecordingEvent::Started(session_id));

        tracing::info!("Recording started, session {}", session_id);
        Ok(())
    }

    /// Stop the active session and keep its artifact for collection.
    ///
    /// Without an active session this is a no-op returning `None`. The
    /// session is always torn down and the status always ends at `stopped`;
    /// a finalization failure is reported after that.
    pub async fn stop(&mut self) -> RecordingResult<Option<ArtifactInfo>> {
        let Some(session) = self.session.take() else {
            tracing::debug!("Stop requested while {}, nothing to do", self.status());
            return Ok(None);
        };

        let session_id = session.id();
        tracing::info!("Stopping recording, session {}", session_id);

        let result = session.teardown(&self.sink).await;
        self.set_status(RecordingStatus::Stopped);
        self.emit(RecordingEvent::Stopped(session_id));

        match result {
            Ok(artifact) => {
                let info = artifact.as_ref().map(|a| a.info.clone());
                self.artifact = artifact;
                tracing::info!("Recording stopped, session {}", session_id);
                Ok(info)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Pause the recorder. The draw loop keeps running.
    pub async fn pause(&mut self) -> RecordingResult<()> {
        let current = self.status();
        let session = match (&mut self.session, current) {
            (Some(session), RecordingStatus::Recording) => session,
            _ => {
                return Err(RecordingError::InvalidStateTransition {
                    from: current,
                    action: "pause",
                })
            }
        };

        tracing::info!("Pausing recording");
        if let Some(recorder) = session.recorder_mut() {
            recorder.pause()?;
        }
        session.end_segment();

        self.set_status(RecordingStatus::Paused);
        self.emit(RecordingEvent::Paused);
        Ok(())
    }

    /// Resume a paused recorder
    pub async fn resume(&mut self) -> RecordingResult<()> {
        let current = self.status();
        let session = match (&mut self.session, current) {
            (Some(session), RecordingStatus::Paused) => session,
            _ => {
                return Err(RecordingError::InvalidStateTransition {
                    from: current,
                    action: "resume",
                })
            }
        };

        tracing::info!("Resuming recording");
        if let Some(recorder) = session.recorder_mut() {
            recorder.resume()?;
        }
        session.begin_segment();

        self.set_status(RecordingStatus::Recording);
        self.emit(RecordingEvent::Resumed);
        Ok(())
    }

    /// Hand out the artifact of the last stopped session
    pub fn take_artifact(&mut self) -> RecordingResult<RecordedArtifact> {
        let current = self.status();
        if current != RecordingStatus::Stopped {
            return Err(RecordingError::InvalidStateTransition {
                from: current,
                action: "collect the recording",
            });
        }
        let artifact = self.artifact.take().ok_or_else(|| {
            RecordingError::RecorderFailure("no artifact was produced".to_string())
        })?;

        self.set_status(RecordingStatus::Finished);
        self.emit(RecordingEvent::Finished(artifact.info.id));
        tracing::info!("Artifact {} collected", artifact.info.id);
        Ok(artifact)
    }

    /// Abort the active session after an unrecoverable failure.
    ///
    /// Performs the same teardown as `stop` on a best-effort basis; whatever
    /// the recorder produced is discarded. No-op without an active session.
    pub async fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        let Some(session) = self.session.take() else {
            tracing::debug!("Ignoring failure without a session: {}", reason);
            return;
        };

        tracing::error!("Recording failed: {}", reason);
        if let Err(e) = session.teardown(&self.sink).await {
            tracing::warn!("Teardown after failure: {}", e);
        }

        self.last_error = Some(reason.clone());
        self.set_status(RecordingStatus::Error);
        self.emit(RecordingEvent::Error(reason));
    }

    /// React to a draw loop event. Events from a previous session are ignored.
    pub async fn handle_compositor_event(&mut self, event: CompositorEvent) {
        match event {
            CompositorEvent::SourceEnded { kind, stream_id } => {
                let current = self
                    .session
                    .as_ref()
                    .map(|s| s.owns_stream(stream_id))
                    .unwrap_or(false);
                if !current {
                    tracing::debug!("Ignoring end of stale {} stream {}", kind, stream_id);
                    return;
                }
                self.fail(format!("{kind} device lost")).await;
            }
        }
    }
}

fn release(streams: &[&StreamHandle]) {
    for stream in streams {
        if stream.stop_tracks() {
            tracing::debug!("Released {} stream {}", stream.kind(), stream.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureFailure, StreamKind, SyntheticCaptureProvider, SyntheticSettings};
    use crate::compositor::PixelCanvas;
    use crate::geometry::{CategoricalPosition, Dimension};
    use crate::sink::testing::MockBackend;
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        coordinator: RecordingCoordinator,
        provider: Arc<SyntheticCaptureProvider>,
        backend: Arc<MockBackend>,
        canvas: Arc<Mutex<PixelCanvas>>,
    }

    fn dim(width: u32, height: u32) -> Dimension {
        Dimension::new(width, height).unwrap()
    }

    fn harness() -> Harness {
        let mut config = RecorderConfig::default();
        config.screen.dimension = dim(64, 48);
        config.webcam.dimension = dim(16, 16);
        config.webcam.margin = 4.0;

        let provider = Arc::new(SyntheticCaptureProvider::new(SyntheticSettings {
            screen: dim(128, 96),
            screen_color: [255, 0, 0, 255],
            webcam: dim(32, 32),
            webcam_color: [0, 0, 255, 255],
        }));
        let backend = Arc::new(MockBackend::default());
        let canvas = Arc::new(Mutex::new(PixelCanvas::new(0, 0)));
        let surface: SharedSurface = canvas.clone();

        let coordinator =
            RecordingCoordinator::new(&config, provider.clone(), surface, backend.clone());
        Harness {
            coordinator,
            provider,
            backend,
            canvas,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop() {
        let mut h = harness();
        let mut events = h.coordinator.subscribe();

        h.coordinator.start().await.unwrap();
        assert_eq!(h.coordinator.status(), RecordingStatus::Recording);
        let session = h.coordinator.session().unwrap();
        assert!(session.recorder_id.is_some());
        assert!(matches!(events.recv().await.unwrap(), RecordingEvent::Started(id) if id == session.id));

        tokio::time::sleep(Duration::from_millis(100)).await;

        let info = h.coordinator.stop().await.unwrap().unwrap();
        assert_eq!(info.dimension, dim(64, 48));
        assert_eq!(h.coordinator.status(), RecordingStatus::Stopped);
        assert!(h.coordinator.session().is_none());

        // Recorder finalized while the composite stream was still live
        assert_eq!(h.backend.calls(), vec!["create", "start", "stop live=true"]);

        for stream in h.provider.issued() {
            assert!(!stream.is_live());
            assert_eq!(stream.stop_requests(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_active_coordinator_releases_devices() {
        let mut h = harness();
        h.coordinator.start().await.unwrap();
        h.coordinator.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let Harness {
            coordinator,
            provider,
            canvas,
            ..
        } = h;
        drop(coordinator);

        let issued = provider.issued();
        assert!(issued.iter().all(|s| !s.is_live()));
        assert!(issued.iter().all(|s| s.stop_requests() == 1));

        // Nothing draws into the canvas any more
        let before = canvas.lock().snapshot();
        issued[1].push_frame(crate::capture::VideoFrame::solid(dim(32, 32), [0, 255, 0, 255]));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(canvas.lock().snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_session_not_released_twice() {
        let mut h = harness();
        h.coordinator.start().await.unwrap();
        h.coordinator.stop().await.unwrap();
        drop(h.coordinator);

        for stream in h.provider.issued() {
            assert_eq!(stream.stop_requests(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut h = harness();
        assert!(h.coordinator.stop().await.unwrap().is_none());
        assert_eq!(h.coordinator.status(), RecordingStatus::Initialized);

        h.coordinator.start().await.unwrap();
        assert!(h.coordinator.stop().await.unwrap().is_some());
        assert!(h.coordinator.stop().await.unwrap().is_none());

        assert_eq!(h.coordinator.status(), RecordingStatus::Stopped);
        assert!(h.coordinator.artifact_info().is_some());
        let stops = h.backend.calls().iter().filter(|c| c.starts_with("stop")).count();
        assert_eq!(stops, 1);
        for stream in h.provider.issued() {
            assert_eq!(stream.stop_requests(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_rejected() {
        let mut h = harness();
        h.coordinator.start().await.unwrap();

        let err = h.coordinator.start().await.unwrap_err();
        assert!(matches!(
            err,
            RecordingError::InvalidStateTransition {
                from: RecordingStatus::Recording,
                ..
            }
        ));
        // No extra devices were requested
        assert_eq!(h.provider.issued().len(), 2);
        assert_eq!(h.coordinator.status(), RecordingStatus::Recording);

        h.coordinator.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_uses_fresh_streams() {
        let mut h = harness();

        h.coordinator.start().await.unwrap();
        let first = h.coordinator.session().unwrap();
        h.coordinator.stop().await.unwrap();

        h.coordinator.start().await.unwrap();
        let second = h.coordinator.session().unwrap();
        h.coordinator.stop().await.unwrap();

        assert_ne!(first.id, second.id);
        let first_ids = [first.screen_stream_id, first.webcam_stream_id, first.composite_stream_id];
        let second_ids = [
            second.screen_stream_id,
            second.webcam_stream_id,
            second.composite_stream_id,
        ];
        assert!(first_ids.iter().all(|id| !second_ids.contains(id)));
        assert_eq!(h.provider.issued().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_webcam_denied_leaves_status() {
        let mut h = harness();
        h.provider
            .fail_next(StreamKind::Webcam, CaptureFailure::PermissionDenied);

        let err = h.coordinator.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::PermissionDenied(_)));
        assert_eq!(h.coordinator.status(), RecordingStatus::Initialized);
        assert!(h.coordinator.session().is_none());
        assert!(h.backend.calls().is_empty());

        let issued = h.provider.issued();
        assert_eq!(issued.len(), 1);
        assert!(!issued[0].is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_start_failure_releases_streams() {
        let mut h = harness();
        h.backend.fail_start.store(true, Ordering::SeqCst);

        let err = h.coordinator.start().await.unwrap_err();
        assert!(matches!(err, RecordingError::RecorderFailure(_)));
        assert_eq!(h.coordinator.status(), RecordingStatus::Initialized);
        for stream in h.provider.issued() {
            assert!(!stream.is_live());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_failure_still_tears_down() {
        let mut h = harness();
        h.backend.fail_stop.store(true, Ordering::SeqCst);

        h.coordinator.start().await.unwrap();
        let err = h.coordinator.stop().await.unwrap_err();

        assert!(matches!(err, RecordingError::RecorderFailure(_)));
        assert_eq!(h.coordinator.status(), RecordingStatus::Stopped);
        assert!(h.coordinator.session().is_none());
        assert!(h.provider.issued().iter().all(|s| !s.is_live()));
        assert!(h.coordinator.take_artifact().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_and_collect() {
        let mut h = harness();
        assert!(h.coordinator.pause().await.is_err());

        h.coordinator.start().await.unwrap();
        h.coordinator.pause().await.unwrap();
        assert_eq!(h.coordinator.status(), RecordingStatus::Paused);
        assert!(h.coordinator.pause().await.is_err());
        assert!(h.coordinator.start().await.is_err());

        h.coordinator.resume().await.unwrap();
        assert_eq!(h.coordinator.status(), RecordingStatus::Recording);
        assert_eq!(h.coordinator.session().unwrap().segment_count, 2);

        h.coordinator.pause().await.unwrap();
        h.coordinator.stop().await.unwrap();

        let artifact = h.coordinator.take_artifact().unwrap();
        assert_eq!(artifact.info.mime_type, "video/webm");
        assert_eq!(h.coordinator.status(), RecordingStatus::Finished);
        assert!(h.coordinator.take_artifact().is_err());

        assert_eq!(
            h.backend.calls(),
            vec!["create", "start", "pause", "resume", "pause", "stop live=true"]
        );

        // A finished recorder can start over
        h.coordinator.start().await.unwrap();
        h.coordinator.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_loss_moves_to_error() {
        let mut h = harness();
        let mut compositor_events = h.coordinator.take_compositor_events().unwrap();

        h.coordinator.start().await.unwrap();
        let webcam = h.provider.issued()[1].clone();
        webcam.disconnect();

        let event = compositor_events.recv().await.unwrap();
        h.coordinator.handle_compositor_event(event).await;

        assert_eq!(h.coordinator.status(), RecordingStatus::Error);
        assert!(h.coordinator.session().is_none());
        assert_eq!(h.coordinator.last_error(), Some("webcam device lost"));
        assert!(h.provider.issued().iter().all(|s| !s.is_live()));

        // Recoverable by starting again
        h.coordinator.start().await.unwrap();
        assert_eq!(h.coordinator.status(), RecordingStatus::Recording);
        h.coordinator.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_source_event_ignored() {
        let mut h = harness();
        h.coordinator.start().await.unwrap();
        let old_webcam = h.provider.issued()[1].id();
        h.coordinator.stop().await.unwrap();
        h.coordinator.start().await.unwrap();

        h.coordinator
            .handle_compositor_event(CompositorEvent::SourceEnded {
                kind: StreamKind::Webcam,
                stream_id: old_webcam,
            })
            .await;
        assert_eq!(h.coordinator.status(), RecordingStatus::Recording);

        h.coordinator.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_loop_stops_with_session() {
        let mut h = harness();
        h.coordinator.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let drawn = h.coordinator.session().unwrap().frames_drawn;
        assert!(drawn > 1);

        h.coordinator.stop().await.unwrap();
        assert!(h.coordinator.session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_layout_edit_reaches_canvas() {
        let mut h = harness();
        h.coordinator.layout().write().position = CategoricalPosition::BottomRight;
        assert_eq!(
            h.coordinator.layout().read().origin(),
            crate::geometry::Point::new(44.0, 28.0)
        );

        h.coordinator.start().await.unwrap();
        h.coordinator.stop().await.unwrap();
    }
}
