use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity attached to every failure notification.
///
/// `Warning` failures leave the session usable; `Error` failures end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Warning,
    Error,
}

/// Errors that can occur during camera session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("failed to open camera: {0}")]
    HardwareOpenFailure(String),

    #[error("camera hardware fault: {0}")]
    HardwareRuntimeFailure(String),

    #[error("capture failed: {0}")]
    CaptureFailure(String),

    #[error("transcode failed: {0}")]
    TranscodeFailure(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("listener failed: {0}")]
    ListenerFailure(String),

    #[error("configuration failed: {0}")]
    Configuration(String),
}

impl CameraError {
    /// Severity this error is reported with when it travels the error channel.
    pub fn level(&self) -> ErrorLevel {
        match self {
            Self::HardwareOpenFailure(_) | Self::HardwareRuntimeFailure(_) => ErrorLevel::Error,
            _ => ErrorLevel::Warning,
        }
    }

    /// Whether the error forces the session back to `Closed`.
    pub fn is_session_ending(&self) -> bool {
        self.level() == ErrorLevel::Error
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        Self::TranscodeFailure(err.to_string())
    }
}
