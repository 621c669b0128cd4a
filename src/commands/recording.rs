//! Recording commands
//!
//! Entry points for the record/stop/pause/resume buttons and the webcam
//! settings panel. Every command returns an `ErrorResponse` on failure so the
//! UI can switch on a stable code.

use crate::capture::CaptureProvider;
use crate::compositor::{OverlayLayout, OverlayShape, SharedLayout, SharedSurface};
use crate::config::RecorderConfig;
use crate::geometry::{CategoricalPosition, Dimension};
use crate::recorder::{RecordingCoordinator, RecordingEvent, RecordingStatus, SessionInfo};
use crate::sink::{ArtifactInfo, RecordedArtifact, RecorderBackend};
use crate::utils::{AppError, AppResult, ErrorResponse};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Recording state shared by the UI commands
pub struct RecorderController {
    coordinator: Arc<Mutex<RecordingCoordinator>>,
    status: Arc<RwLock<RecordingStatus>>,
    layout: SharedLayout,
    countdown: Duration,
    /// Forwards draw loop events to the coordinator
    watcher: JoinHandle<()>,
}

impl RecorderController {
    /// Build a controller. Must be called from within a tokio runtime.
    pub fn new(
        config: &RecorderConfig,
        provider: Arc<dyn CaptureProvider>,
        surface: SharedSurface,
        backend: Arc<dyn RecorderBackend>,
    ) -> Self {
        let mut coordinator = RecordingCoordinator::new(config, provider, surface, backend);
        let status = coordinator.status_handle();
        let layout = coordinator.layout();
        let events = coordinator.take_compositor_events();
        let coordinator = Arc::new(Mutex::new(coordinator));

        let watcher = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                let Some(mut events) = events else {
                    return;
                };
                while let Some(event) = events.recv().await {
                    coordinator.lock().await.handle_compositor_event(event).await;
                }
            })
        };

        Self {
            coordinator,
            status,
            layout,
            countdown: config.countdown(),
            watcher,
        }
    }

    /// Build a controller from a JSON config file
    pub fn from_config_file(
        path: &Path,
        provider: Arc<dyn CaptureProvider>,
        surface: SharedSurface,
        backend: Arc<dyn RecorderBackend>,
    ) -> AppResult<Self> {
        let config = RecorderConfig::load(path)?;
        Ok(Self::new(&config, provider, surface, backend))
    }

    /// Last committed status. Still `recording` or `paused` while a stop is
    /// tearing the session down.
    pub fn status(&self) -> RecordingStatus {
        *self.status.read()
    }

    /// Snapshot of the current overlay layout
    pub fn layout(&self) -> OverlayLayout {
        *self.layout.read()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.coordinator.lock().await.subscribe()
    }

    pub async fn session(&self) -> Option<SessionInfo> {
        self.coordinator.lock().await.session()
    }

    pub async fn duration_ms(&self) -> f64 {
        self.coordinator.lock().await.duration_ms()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.coordinator.lock().await.last_error().map(str::to_string)
    }

    /// Record button: wait out the countdown, then start a session
    pub async fn on_record_pressed(&self) -> Result<(), ErrorResponse> {
        let current = self.status();
        if !current.can_start() {
            tracing::warn!("Record pressed while {}", current);
            return Err(crate::recorder::RecordingError::InvalidStateTransition {
                from: current,
                action: "start",
            }
            .into());
        }

        if !self.countdown.is_zero() {
            tracing::debug!("Recording starts in {:?}", self.countdown);
            tokio::time::sleep(self.countdown).await;
        }

        self.coordinator.lock().await.start().await?;
        Ok(())
    }

    /// Stop button. Returns the artifact metadata, or `None` if nothing was
    /// recording.
    pub async fn on_stop_pressed(&self) -> Result<Option<ArtifactInfo>, ErrorResponse> {
        Ok(self.coordinator.lock().await.stop().await?)
    }

    pub async fn on_pause_pressed(&self) -> Result<(), ErrorResponse> {
        Ok(self.coordinator.lock().await.pause().await?)
    }

    pub async fn on_resume_pressed(&self) -> Result<(), ErrorResponse> {
        Ok(self.coordinator.lock().await.resume().await?)
    }

    /// Save button: hand out the finished recording
    pub async fn take_artifact(&self) -> Result<RecordedArtifact, ErrorResponse> {
        Ok(self.coordinator.lock().await.take_artifact()?)
    }

    /// Position picker, takes names like `"bottom-right"`
    pub fn on_position_changed(&self, name: &str) -> Result<(), ErrorResponse> {
        let position: CategoricalPosition = name.parse()?;
        self.layout.write().position = position;
        tracing::debug!("Webcam position set to {}", position);
        Ok(())
    }

    pub fn on_margin_changed(&self, margin: f64) -> Result<(), ErrorResponse> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "margin must be a non-negative number, got {margin}"
            ))
            .into());
        }
        self.layout.write().margin = margin;
        Ok(())
    }

    pub fn on_webcam_dimension_changed(&self, width: u32, height: u32) -> Result<(), ErrorResponse> {
        let dimension = Dimension::new(width, height)?;
        self.layout.write().overlay = dimension;
        tracing::debug!("Webcam overlay resized to {}", dimension);
        Ok(())
    }

    pub fn on_shape_changed(&self, shape: OverlayShape) -> Result<(), ErrorResponse> {
        if let OverlayShape::RoundedRect { radius } = shape {
            if !radius.is_finite() || radius < 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "corner radius must be a non-negative number, got {radius}"
                ))
                .into());
            }
        }
        self.layout.write().shape = shape;
        Ok(())
    }
}

impl Drop for RecorderController {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
