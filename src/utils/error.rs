//! Error types and handling
//!
//! Common error types used across the application.

use crate::config::ConfigError;
use crate::geometry::GeometryError;
use crate::recorder::RecordingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Error response for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Recording(e) => match e {
                RecordingError::PermissionDenied(_) => "PERMISSION_DENIED",
                RecordingError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
                RecordingError::CanvasNotReady => "CANVAS_NOT_READY",
                RecordingError::RecorderFailure(_) => "RECORDER_FAILURE",
                RecordingError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            },
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Geometry(_) | AppError::InvalidInput(_) => "INVALID_INPUT",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<RecordingError> for ErrorResponse {
    fn from(error: RecordingError) -> Self {
        AppError::from(error).into()
    }
}

impl From<GeometryError> for ErrorResponse {
    fn from(error: GeometryError) -> Self {
        AppError::from(error).into()
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecordingStatus;

    #[test]
    fn test_error_codes() {
        let response: ErrorResponse = RecordingError::PermissionDenied("screen".into()).into();
        assert_eq!(response.code, "PERMISSION_DENIED");

        let response: ErrorResponse = RecordingError::InvalidStateTransition {
            from: RecordingStatus::Recording,
            action: "start",
        }
        .into();
        assert_eq!(response.code, "INVALID_STATE_TRANSITION");
        assert_eq!(response.message, "Cannot start while recording");

        let response: ErrorResponse = AppError::InvalidInput("margin".into()).into();
        assert_eq!(response.code, "INVALID_INPUT");
    }

    #[test]
    fn test_config_error_code() {
        let error = crate::config::RecorderConfig::from_json_str(r#"{"refreshRate":0}"#).unwrap_err();
        let response: ErrorResponse = AppError::from(error).into();
        assert_eq!(response.code, "CONFIG_ERROR");
        assert!(response.message.contains("refreshRate"));
    }

    #[test]
    fn test_response_serialization() {
        let response = ErrorResponse {
            code: "CANVAS_NOT_READY".to_string(),
            message: "Canvas is not ready for capture".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"code\":\"CANVAS_NOT_READY\""));
    }
}
