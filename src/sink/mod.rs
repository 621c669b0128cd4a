//! Recording sink
//!
//! Wraps a recording engine: start it on the composite stream, pause and
//! resume it, and finalize it into a single artifact.

pub mod engine;
pub mod ffmpeg;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{ContainerFormat, MediaKind, RecorderBackend, RecorderOptions, RecordingEngine};
pub use ffmpeg::FfmpegRecorderBackend;

use crate::capture::StreamHandle;
use crate::geometry::Dimension;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Recording sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Recorder is not running")]
    NotRunning,

    #[error("Recorder already started")]
    AlreadyStarted,
}

/// Finished recording. Bytes are only available once the engine has flushed.
#[derive(Debug, Clone)]
pub struct RecordedArtifact {
    pub info: ArtifactInfo,
    pub bytes: Arc<[u8]>,
}

/// Metadata describing a recorded artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub id: Uuid,
    pub mime_type: String,
    pub dimension: Dimension,
    pub frame_count: u64,
    pub duration_ms: f64,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

impl RecordedArtifact {
    pub fn new(
        mime_type: impl Into<String>,
        dimension: Dimension,
        frame_count: u64,
        duration_ms: f64,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            info: ArtifactInfo {
                id: Uuid::new_v4(),
                mime_type: mime_type.into(),
                dimension,
                frame_count,
                duration_ms,
                size_bytes: bytes.len(),
                created_at: Utc::now(),
            },
            bytes: bytes.into(),
        }
    }
}

/// A running engine bound to the stream it records
pub struct RecorderHandle {
    id: Uuid,
    stream_id: Uuid,
    engine: Box<dyn RecordingEngine>,
    started_at: DateTime<Utc>,
}

impl RecorderHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the stream being recorded
    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn pause(&mut self) -> Result<(), SinkError> {
        tracing::debug!("Pausing recorder {}", self.id);
        self.engine.pause()
    }

    pub fn resume(&mut self) -> Result<(), SinkError> {
        tracing::debug!("Resuming recorder {}", self.id);
        self.engine.resume()
    }
}

/// Starts and finalizes recordings through a backend
#[derive(Clone)]
pub struct RecordingSink {
    backend: Arc<dyn RecorderBackend>,
    options: RecorderOptions,
}

impl RecordingSink {
    pub fn new(backend: Arc<dyn RecorderBackend>, options: RecorderOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &RecorderOptions {
        &self.options
    }

    /// Build an engine for `stream` and start it
    pub fn start_recording(&self, stream: StreamHandle) -> Result<RecorderHandle, SinkError> {
        let stream_id = stream.id();
        let mut engine = self.backend.create(stream, &self.options)?;
        engine.start()?;

        let handle = RecorderHandle {
            id: Uuid::new_v4(),
            stream_id,
            engine,
            started_at: Utc::now(),
        };
        tracing::info!(
            "Recorder {} started on stream {} ({:?} @ {}fps)",
            handle.id,
            stream_id,
            self.options.format,
            self.options.frame_rate
        );
        Ok(handle)
    }

    /// Finalize the recording. Consumes the handle, so a recorder can only
    /// produce one artifact.
    pub async fn stop_recording(
        &self,
        mut handle: RecorderHandle,
    ) -> Result<RecordedArtifact, SinkError> {
        tracing::info!("Finalizing recorder {}", handle.id);
        let artifact = handle.engine.stop().await?;
        tracing::info!(
            "Recorder {} finalized: {} frames, {} bytes",
            handle.id,
            artifact.info.frame_count,
            artifact.info.size_bytes
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockBackend;
    use super::*;
    use crate::capture::{StreamKind, SyntheticStream};

    fn stream() -> StreamHandle {
        Arc::new(SyntheticStream::new(
            StreamKind::Composite,
            Dimension::new(32, 24).unwrap(),
            [0, 0, 0, 255],
        ))
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let backend = Arc::new(MockBackend::default());
        let sink = RecordingSink::new(backend.clone(), RecorderOptions::default());
        let stream = stream();

        let mut handle = sink.start_recording(stream.clone()).unwrap();
        assert_eq!(handle.stream_id(), stream.id());
        handle.pause().unwrap();
        handle.resume().unwrap();

        let artifact = sink.stop_recording(handle).await.unwrap();
        assert_eq!(artifact.info.dimension, stream.dimension());
        assert_eq!(artifact.info.size_bytes, artifact.bytes.len());
        assert_eq!(
            backend.calls(),
            vec!["create", "start", "pause", "resume", "stop live=true"]
        );
    }

    #[test]
    fn test_engine_start_failure_propagates() {
        let backend = Arc::new(MockBackend::default());
        backend
            .fail_start
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let sink = RecordingSink::new(backend, RecorderOptions::default());

        assert!(matches!(
            sink.start_recording(stream()),
            Err(SinkError::Engine(_))
        ));
    }

    #[test]
    fn test_options_serialize_type_field() {
        let json = serde_json::to_value(RecorderOptions::default()).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["frameRate"], 30);
        assert_eq!(json["format"], "webm");
    }
}
