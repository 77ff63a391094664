//! Error types and handling
//!
//! Common error types used across the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Required configuration is absent or malformed. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No capture source available")]
    NoCaptureSource,

    #[error("No audio device selected")]
    NoAudioDevice,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Microphone could not be opened. Start degrades to video-only.
    #[error("Error capturing audio: {0}")]
    AudioCapture(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    /// Carries the store's message verbatim.
    #[error("{0}")]
    UploadFailed(String),
}

impl AppError {
    /// Stable code used by the frontend to pick a message style
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::NoCaptureSource => "NO_CAPTURE_SOURCE",
            AppError::NoAudioDevice => "NO_AUDIO_DEVICE",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::AudioCapture(_) => "AUDIO_CAPTURE_FAILED",
            AppError::Encoder(_) => "ENCODER_ERROR",
            AppError::AlreadyRecording => "ALREADY_RECORDING",
            AppError::NotRecording => "NOT_RECORDING",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::UploadFailed(_) => "UPLOAD_FAILED",
        }
    }

    /// Whether the user can retry without restarting the app
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Config(_))
    }
}

/// Error response for frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        ErrorResponse::from(&error)
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failure_message_is_verbatim() {
        let err = AppError::UploadFailed("connection reset by peer".to_string());
        let response = ErrorResponse::from(err);
        assert_eq!(response.code, "UPLOAD_FAILED");
        assert_eq!(response.message, "connection reset by peer");
        assert!(response.recoverable);
    }

    #[test]
    fn test_config_error_response_is_not_recoverable() {
        let response = ErrorResponse::from(AppError::Config("BUCKET_NAME".into()));
        assert!(!response.recoverable);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["recoverable"], serde_json::json!(false));
    }

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(!AppError::Config("BUCKET_NAME".into()).is_recoverable());
        assert!(AppError::NoCaptureSource.is_recoverable());
        assert!(AppError::PermissionDenied("screen".into()).is_recoverable());
        assert!(AppError::UploadFailed("timeout".into()).is_recoverable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppError::InvalidTransition {
            action: "cancel",
            phase: "uploading".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot cancel while uploading");
    }
}
