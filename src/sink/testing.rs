//! In-memory recorder backend for tests

use super::engine::{RecorderBackend, RecorderOptions, RecordingEngine};
use super::{RecordedArtifact, SinkError};
use crate::capture::StreamHandle;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Records the engine calls it sees, in order
#[derive(Default)]
pub struct MockBackend {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    /// How long finalization takes
    pub stop_delay_ms: AtomicU64,
}

impl MockBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl RecorderBackend for MockBackend {
    fn create(
        &self,
        stream: StreamHandle,
        _options: &RecorderOptions,
    ) -> Result<Box<dyn RecordingEngine>, SinkError> {
        self.calls.lock().push("create".to_string());
        Ok(Box::new(MockEngine {
            stream_id: stream.id(),
            stream,
            calls: self.calls.clone(),
            fail_start: self.fail_start.load(Ordering::SeqCst),
            fail_stop: self.fail_stop.load(Ordering::SeqCst),
            stop_delay: Duration::from_millis(self.stop_delay_ms.load(Ordering::SeqCst)),
        }))
    }
}

struct MockEngine {
    stream_id: Uuid,
    stream: StreamHandle,
    calls: Arc<Mutex<Vec<String>>>,
    fail_start: bool,
    fail_stop: bool,
    stop_delay: Duration,
}

#[async_trait]
impl RecordingEngine for MockEngine {
    fn start(&mut self) -> Result<(), SinkError> {
        self.calls.lock().push("start".to_string());
        if self.fail_start {
            return Err(SinkError::Engine("mock start failure".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SinkError> {
        self.calls.lock().push("pause".to_string());
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SinkError> {
        self.calls.lock().push("resume".to_string());
        Ok(())
    }

    async fn stop(&mut self) -> Result<RecordedArtifact, SinkError> {
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }
        // Finalization must see a live composite stream
        let live = self.stream.is_live();
        self.calls.lock().push(format!("stop live={live}"));
        if self.fail_stop {
            return Err(SinkError::Engine("mock stop failure".to_string()));
        }
        Ok(RecordedArtifact::new(
            "video/webm",
            self.stream.dimension(),
            1,
            33.0,
            self.stream_id.as_bytes().to_vec(),
        ))
    }
}
