//! Recording state management
//!
//! Defines the recording status machine and per-segment timing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current status of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    /// Nothing recorded yet
    Initialized,
    /// Recording a session
    Recording,
    /// Session alive, recorder paused
    Paused,
    /// Session torn down, artifact waiting to be collected
    Stopped,
    /// Session torn down after a failure
    Error,
    /// Artifact collected
    Finished,
}

impl Default for RecordingStatus {
    fn default() -> Self {
        Self::Initialized
    }
}

impl RecordingStatus {
    /// Whether a session currently exists
    pub fn is_active(&self) -> bool {
        matches!(self, RecordingStatus::Recording | RecordingStatus::Paused)
    }

    /// Whether `start` is accepted from this status
    pub fn can_start(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingStatus::Initialized => "initialized",
            RecordingStatus::Recording => "recording",
            RecordingStatus::Paused => "paused",
            RecordingStatus::Stopped => "stopped",
            RecordingStatus::Error => "error",
            RecordingStatus::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// One uninterrupted stretch of recording.
///
/// A new segment starts each time recording is resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSegment {
    /// Segment index (0, 1, 2, ...)
    pub index: usize,

    pub started_at: DateTime<Utc>,

    /// `None` while the segment is still running
    pub ended_at: Option<DateTime<Utc>>,
}

impl RecordingSegment {
    /// Create a new segment starting now
    pub fn new(index: usize) -> Self {
        Self {
            index,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// End the segment. Ending twice keeps the first end time.
    pub fn end(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Duration in milliseconds, measured up to now while running
    pub fn duration_ms(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_microseconds().unwrap_or(0) as f64 / 1000.0
    }
}
