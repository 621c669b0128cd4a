//! Recording engine traits and options

use super::{RecordedArtifact, SinkError};
use crate::capture::StreamHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the engine records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
}

/// Container the artifact is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Webm,
    Mp4,
}

impl ContainerFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mp4 => "mp4",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "video/webm",
            ContainerFormat::Mp4 => "video/mp4",
        }
    }

    /// FFmpeg video codec for this format
    pub fn video_codec(&self) -> &'static str {
        match self {
            ContainerFormat::Webm => "libvpx-vp9",
            ContainerFormat::Mp4 => "libx264",
        }
    }
}

/// Options handed to the engine when a recording starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderOptions {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub frame_rate: u32,
    pub format: ContainerFormat,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            kind: MediaKind::Video,
            frame_rate: 30,
            format: ContainerFormat::Webm,
        }
    }
}

/// An encoder/muxer recording one stream.
///
/// `stop` flushes buffered frames; the artifact only exists once it returns.
#[async_trait]
pub trait RecordingEngine: Send {
    fn start(&mut self) -> Result<(), SinkError>;

    fn pause(&mut self) -> Result<(), SinkError>;

    fn resume(&mut self) -> Result<(), SinkError>;

    async fn stop(&mut self) -> Result<RecordedArtifact, SinkError>;
}

/// Builds engines for a stream
pub trait RecorderBackend: Send + Sync {
    fn create(
        &self,
        stream: StreamHandle,
        options: &RecorderOptions,
    ) -> Result<Box<dyn RecordingEngine>, SinkError>;
}
