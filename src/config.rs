//! Recorder configuration
//!
//! Typed settings for the canvas, the webcam overlay, frame pacing and the
//! recorder. Settings are read once; nothing is written back.

use crate::compositor::{OverlayLayout, OverlayShape};
use crate::geometry::{CategoricalPosition, Dimension};
use crate::sink::{ContainerFormat, MediaKind, RecorderOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Screen canvas settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenConfig {
    pub dimension: Dimension,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            dimension: Dimension::new(1024, 768).expect("non-zero"),
        }
    }
}

/// Webcam overlay settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebcamConfig {
    pub dimension: Dimension,
    pub position: CategoricalPosition,
    pub margin: f64,
    pub shape: OverlayShape,
}

impl Default for WebcamConfig {
    fn default() -> Self {
        Self {
            dimension: Dimension::new(64, 64).expect("non-zero"),
            position: CategoricalPosition::TopLeft,
            margin: 10.0,
            shape: OverlayShape::Circle,
        }
    }
}

/// Recorder output settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingConfig {
    pub frame_rate: u32,
    pub format: ContainerFormat,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            format: ContainerFormat::Webm,
        }
    }
}

/// Top-level recorder configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    pub screen: ScreenConfig,
    pub webcam: WebcamConfig,
    /// Draw loop refresh rate in Hz
    pub refresh_rate: u32,
    pub recording: RecordingConfig,
    /// Delay between pressing record and the session starting
    pub countdown_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            webcam: WebcamConfig::default(),
            refresh_rate: 60,
            recording: RecordingConfig::default(),
            countdown_ms: 2000,
        }
    }
}

impl RecorderConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RecorderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!("Loaded recorder config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_rate == 0 {
            return Err(ConfigError::Invalid("refreshRate must be positive".to_string()));
        }
        if self.recording.frame_rate == 0 {
            return Err(ConfigError::Invalid("recording.frameRate must be positive".to_string()));
        }
        if !self.webcam.margin.is_finite() || self.webcam.margin < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "webcam.margin must be a non-negative number, got {}",
                self.webcam.margin
            )));
        }
        if let OverlayShape::RoundedRect { radius } = self.webcam.shape {
            if !radius.is_finite() || radius < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "webcam.shape.radius must be a non-negative number, got {radius}"
                )));
            }
        }
        Ok(())
    }

    /// Initial overlay layout
    pub fn layout(&self) -> OverlayLayout {
        OverlayLayout {
            screen: self.screen.dimension,
            overlay: self.webcam.dimension,
            position: self.webcam.position,
            margin: self.webcam.margin,
            shape: self.webcam.shape,
        }
    }

    pub fn recorder_options(&self) -> RecorderOptions {
        RecorderOptions {
            kind: MediaKind::Video,
            frame_rate: self.recording.frame_rate,
            format: self.recording.format,
        }
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }
}
