//! Recording errors

use super::state::RecordingStatus;
use crate::capture::{CaptureError, CaptureFailure};
use crate::compositor::CompositorError;
use crate::sink::SinkError;
use thiserror::Error;

/// Errors surfaced by the recording session
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Canvas is not ready for capture")]
    CanvasNotReady,

    #[error("Recorder failure: {0}")]
    RecorderFailure(String),

    #[error("Cannot {action} while {from}")]
    InvalidStateTransition {
        from: RecordingStatus,
        action: &'static str,
    },
}

impl From<CaptureError> for RecordingError {
    fn from(error: CaptureError) -> Self {
        match error.reason {
            CaptureFailure::PermissionDenied => RecordingError::PermissionDenied(error.to_string()),
            CaptureFailure::NoDevice | CaptureFailure::DeviceInUse | CaptureFailure::Unsupported => {
                RecordingError::DeviceUnavailable(error.to_string())
            }
        }
    }
}

impl From<CompositorError> for RecordingError {
    fn from(error: CompositorError) -> Self {
        match error {
            CompositorError::CanvasNotReady => RecordingError::CanvasNotReady,
            CompositorError::SourceNotLive(_) => RecordingError::DeviceUnavailable(error.to_string()),
        }
    }
}

impl From<SinkError> for RecordingError {
    fn from(error: SinkError) -> Self {
        RecordingError::RecorderFailure(error.to_string())
    }
}

/// Result type alias for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
