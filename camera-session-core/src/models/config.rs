use serde::{Deserialize, Serialize};

use super::camera_models::{FlashMode, ImageEncoding};
use super::error::CameraError;

/// Configuration for a camera session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfiguration {
    /// Maximum preview frames per second delivered to frame listeners
    /// (default: 10). Zero or negative disables throttling.
    pub max_frame_rate: f64,

    /// Scale applied to both preview dimensions (default: 0.5). Range (0, 1].
    pub preview_scale: f32,

    /// Base JPEG quality, 1-100 (default: 90). Preview frames use this scaled
    /// by `preview_scale`.
    pub jpeg_quality: u8,

    /// Encoding used for preview frames (default: JPEG).
    pub preview_encoding: ImageEncoding,

    /// Scale applied to still captures before delivery (default: 1.0). Range (0, 4].
    pub picture_scale: f32,

    /// Rotate frames and pictures upright before delivery (default: true).
    pub auto_orient: bool,

    /// Flash mode the controller starts with (default: off).
    pub initial_flash: FlashMode,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_frame_rate.is_nan() {
            return Err("max frame rate must be a number".into());
        }
        if !(self.preview_scale > 0.0 && self.preview_scale <= 1.0) {
            return Err(format!("preview scale must be in (0, 1], got {}", self.preview_scale));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!("unsupported jpeg quality: {}", self.jpeg_quality));
        }
        if !(self.picture_scale > 0.0 && self.picture_scale <= 4.0) {
            return Err(format!("picture scale must be in (0, 4], got {}", self.picture_scale));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CameraError> {
        let config: SessionConfiguration = serde_json::from_str(json)
            .map_err(|e| CameraError::Configuration(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(CameraError::Configuration)?;
        Ok(config)
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            max_frame_rate: 10.0,
            preview_scale: 0.5,
            jpeg_quality: 90,
            preview_encoding: ImageEncoding::Jpeg,
            picture_scale: 1.0,
            auto_orient: true,
            initial_flash: FlashMode::Off,
        }
    }
}
