//! Synthetic capture provider
//!
//! Hands out solid-color streams instead of talking to real devices. Used for
//! headless runs and tests; failures can be queued to mimic a denied prompt
//! or a missing camera.

use super::frame::VideoFrame;
use super::traits::{
    CaptureError, CaptureFailure, CaptureProvider, MediaConstraints, MediaStream, StreamHandle,
    StreamKind,
};
use crate::geometry::Dimension;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A stream whose picture is set by the caller
pub struct SyntheticStream {
    id: Uuid,
    kind: StreamKind,
    dimension: Dimension,
    frame: RwLock<VideoFrame>,
    live: AtomicBool,
    stop_requests: AtomicUsize,
}

impl SyntheticStream {
    pub fn new(kind: StreamKind, dimension: Dimension, rgba: [u8; 4]) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            dimension,
            frame: RwLock::new(VideoFrame::solid(dimension, rgba)),
            live: AtomicBool::new(true),
            stop_requests: AtomicUsize::new(0),
        }
    }

    /// Replace the picture returned by `latest_frame`
    pub fn push_frame(&self, frame: VideoFrame) {
        *self.frame.write() = frame;
    }

    /// Simulate the device going away without anyone releasing it
    pub fn disconnect(&self) {
        tracing::debug!("Synthetic {} stream {} disconnected", self.kind, self.id);
        self.live.store(false, Ordering::SeqCst);
    }

    /// How many times `stop_tracks` has been called
    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn latest_frame(&self) -> Option<VideoFrame> {
        if !self.is_live() {
            return None;
        }
        Some(self.frame.read().clone())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop_tracks(&self) -> bool {
        self.stop_requests.fetch_add(1, Ordering::SeqCst);
        self.live.swap(false, Ordering::SeqCst)
    }
}

/// Settings for the streams a `SyntheticCaptureProvider` hands out
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSettings {
    pub screen: Dimension,
    pub screen_color: [u8; 4],
    pub webcam: Dimension,
    pub webcam_color: [u8; 4],
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            screen: Dimension::new(1024, 768).expect("non-zero"),
            screen_color: [32, 32, 48, 255],
            webcam: Dimension::new(640, 480).expect("non-zero"),
            webcam_color: [220, 120, 60, 255],
        }
    }
}

/// Capture provider backed by `SyntheticStream`s
#[derive(Default)]
pub struct SyntheticCaptureProvider {
    settings: SyntheticSettings,
    pending_failures: Mutex<HashMap<StreamKind, CaptureFailure>>,
    issued: Mutex<Vec<Arc<SyntheticStream>>>,
}

impl SyntheticCaptureProvider {
    pub fn new(settings: SyntheticSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Make the next request for `kind` fail with `reason`
    pub fn fail_next(&self, kind: StreamKind, reason: CaptureFailure) {
        self.pending_failures.lock().insert(kind, reason);
    }

    /// Every stream handed out so far, oldest first
    pub fn issued(&self) -> Vec<Arc<SyntheticStream>> {
        self.issued.lock().clone()
    }

    fn issue(
        &self,
        kind: StreamKind,
        constraints: MediaConstraints,
    ) -> Result<StreamHandle, CaptureError> {
        if let Some(reason) = self.pending_failures.lock().remove(&kind) {
            tracing::debug!("Synthetic {} request failing with {}", kind, reason);
            return Err(CaptureError::new(kind, reason, "synthetic failure"));
        }
        if !constraints.video {
            return Err(CaptureError::new(
                kind,
                CaptureFailure::Unsupported,
                "only video capture is supported",
            ));
        }

        let (dimension, color) = match kind {
            StreamKind::Screen => (self.settings.screen, self.settings.screen_color),
            _ => (self.settings.webcam, self.settings.webcam_color),
        };
        let stream = Arc::new(SyntheticStream::new(kind, dimension, color));
        self.issued.lock().push(stream.clone());
        Ok(stream)
    }
}

#[async_trait]
impl CaptureProvider for SyntheticCaptureProvider {
    async fn get_display_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<StreamHandle, CaptureError> {
        self.issue(StreamKind::Screen, constraints)
    }

    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<StreamHandle, CaptureError> {
        self.issue(StreamKind::Webcam, constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_tracks_only_once() {
        let stream = SyntheticStream::new(
            StreamKind::Webcam,
            Dimension::new(4, 4).unwrap(),
            [0, 0, 255, 255],
        );
        assert!(stream.latest_frame().is_some());

        assert!(stream.stop_tracks());
        assert!(!stream.stop_tracks());
        assert_eq!(stream.stop_requests(), 2);
        assert!(stream.latest_frame().is_none());
    }

    #[tokio::test]
    async fn test_rejects_audio_only_constraints() {
        let provider = SyntheticCaptureProvider::default();
        let err = provider
            .get_user_media(MediaConstraints { video: false })
            .await
            .err()
            .unwrap();
        assert_eq!(err.reason, CaptureFailure::Unsupported);
    }
}
