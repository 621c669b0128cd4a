//! Capture trait definitions
//!
//! Platform-agnostic traits for live video sources and the provider that
//! hands them out after the user grants access.

use super::frame::VideoFrame;
use crate::geometry::Dimension;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// What a stream is a picture of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Screen,
    Webcam,
    Composite,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Screen => "screen",
            StreamKind::Webcam => "webcam",
            StreamKind::Composite => "composite",
        };
        f.write_str(name)
    }
}

/// A live, revocable video source.
///
/// Once `stop_tracks` has been called (or the device goes away) the stream
/// stops producing frames and `latest_frame` returns `None`.
pub trait MediaStream: Send + Sync {
    /// Unique id, never shared between two acquisitions
    fn id(&self) -> Uuid;

    fn kind(&self) -> StreamKind;

    fn dimension(&self) -> Dimension;

    /// Most recent frame, or `None` when the stream has no picture
    fn latest_frame(&self) -> Option<VideoFrame>;

    fn is_live(&self) -> bool;

    /// Stop every track. Returns `true` only for the call that stopped them.
    fn stop_tracks(&self) -> bool;
}

/// Shared handle to a live stream
pub type StreamHandle = Arc<dyn MediaStream>;

/// Options passed to the capture provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
}

impl MediaConstraints {
    pub fn video() -> Self {
        Self { video: true }
    }
}

/// Why a capture request did not produce a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureFailure {
    PermissionDenied,
    NoDevice,
    DeviceInUse,
    Unsupported,
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureFailure::PermissionDenied => "permission denied",
            CaptureFailure::NoDevice => "no device",
            CaptureFailure::DeviceInUse => "device in use",
            CaptureFailure::Unsupported => "unsupported constraints",
        };
        f.write_str(name)
    }
}

/// Failed capture request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stream} capture failed ({reason}): {message}")]
pub struct CaptureError {
    pub stream: StreamKind,
    pub reason: CaptureFailure,
    pub message: String,
}

impl CaptureError {
    pub fn new(stream: StreamKind, reason: CaptureFailure, message: impl Into<String>) -> Self {
        Self {
            stream,
            reason,
            message: message.into(),
        }
    }
}

/// Host capability that hands out screen and camera streams.
///
/// Both calls may wait indefinitely on a consent prompt.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Ask for a display-sharing stream
    async fn get_display_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<StreamHandle, CaptureError>;

    /// Ask for a camera stream
    async fn get_user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<StreamHandle, CaptureError>;
}
