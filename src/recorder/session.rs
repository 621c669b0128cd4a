//! Composite session
//!
//! Everything one recording attempt owns: the two source streams, the
//! composite stream derived from the canvas, the draw loop, and the
//! recorder. Built on `start`, consumed by teardown.

use super::state::RecordingSegment;
use crate::capture::{MediaStream, StreamHandle};
use crate::compositor::CancelHandle;
use crate::sink::{RecordedArtifact, RecorderHandle, RecordingSink, SinkError};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct CompositeSession {
    id: Uuid,
    screen: StreamHandle,
    webcam: StreamHandle,
    composite: StreamHandle,
    cancel: CancelHandle,
    draw_task: JoinHandle<()>,
    recorder: Option<RecorderHandle>,
    segments: Vec<RecordingSegment>,
    released: bool,
}

/// Read-only view of a running session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub screen_stream_id: Uuid,
    pub webcam_stream_id: Uuid,
    pub composite_stream_id: Uuid,
    pub recorder_id: Option<Uuid>,
    pub frames_drawn: u64,
    pub duration_ms: f64,
    pub segment_count: usize,
}

impl CompositeSession {
    pub(crate) fn new(
        screen: StreamHandle,
        webcam: StreamHandle,
        composite: StreamHandle,
        cancel: CancelHandle,
        draw_task: JoinHandle<()>,
        recorder: RecorderHandle,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            screen,
            webcam,
            composite,
            cancel,
            draw_task,
            recorder: Some(recorder),
            segments: vec![RecordingSegment::new(0)],
            released: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether `stream_id` is one of this session's streams
    pub fn owns_stream(&self, stream_id: Uuid) -> bool {
        [&self.screen, &self.webcam, &self.composite]
            .iter()
            .any(|s| s.id() == stream_id)
    }

    pub fn recorder_mut(&mut self) -> Option<&mut RecorderHandle> {
        self.recorder.as_mut()
    }

    pub(crate) fn end_segment(&mut self) {
        if let Some(segment) = self.segments.last_mut() {
            segment.end();
        }
    }

    pub(crate) fn begin_segment(&mut self) {
        let index = self.segments.len();
        self.segments.push(RecordingSegment::new(index));
    }

    /// Total recorded time across segments
    pub fn duration_ms(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_ms()).sum()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            screen_stream_id: self.screen.id(),
            webcam_stream_id: self.webcam.id(),
            composite_stream_id: self.composite.id(),
            recorder_id: self.recorder.as_ref().map(|r| r.id()),
            frames_drawn: self.cancel.frames_drawn(),
            duration_ms: self.duration_ms(),
            segment_count: self.segments.len(),
        }
    }

    /// Cancel the draw loop and stop every track
    fn release(&mut self) {
        self.released = true;
        self.cancel.cancel();

        for stream in [&self.screen, &self.webcam, &self.composite] {
            if stream.stop_tracks() {
                tracing::debug!("Released {} stream {}", stream.kind(), stream.id());
            }
        }
    }

    /// Tear the session down.
    ///
    /// Finalizes the recorder, cancels the draw loop, stops every track and
    /// waits for the loop to exit. Each step runs even when an earlier one
    /// failed; the finalization result is returned last.
    pub(crate) async fn teardown(
        mut self,
        sink: &RecordingSink,
    ) -> Result<Option<RecordedArtifact>, SinkError> {
        tracing::info!("Tearing down session {}", self.id);
        self.end_segment();

        let artifact = match self.recorder.take() {
            Some(recorder) => sink.stop_recording(recorder).await.map(Some),
            None => Ok(None),
        };
        if let Err(e) = &artifact {
            tracing::error!("Recorder finalization failed for session {}: {}", self.id, e);
        }

        self.release();

        if let Err(e) = (&mut self.draw_task).await {
            tracing::warn!("Draw loop for session {} ended abnormally: {}", self.id, e);
        }

        artifact
    }
}

impl Drop for CompositeSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!("Session {} dropped while active, releasing devices", self.id);
        self.release();
        self.draw_task.abort();
    }
}
