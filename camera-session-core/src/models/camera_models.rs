use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::CameraError;

/// Flash mode requested from the camera hardware.
///
/// `Off`, `Auto` and `On` form the user-facing cycle. `Torch` and `RedEye`
/// are hardware modes that may be set explicitly but are not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashMode {
    #[default]
    Off,
    Auto,
    On,
    Torch,
    RedEye,
}

impl FlashMode {
    /// Integer code used by camera HALs for this mode.
    pub fn code(self) -> i32 {
        match self {
            Self::Off => 0,
            Self::On => 1,
            Self::Torch => 2,
            Self::Auto => 3,
            Self::RedEye => 4,
        }
    }
}

impl TryFrom<i32> for FlashMode {
    type Error = CameraError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            2 => Ok(Self::Torch),
            3 => Ok(Self::Auto),
            4 => Ok(Self::RedEye),
            other => Err(CameraError::InvalidState(format!("unknown flash mode code: {}", other))),
        }
    }
}

/// Pixel layout of a raw sensor frame. All variants are YUV 4:2:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Y plane, then U plane, then V plane.
    I420,
    /// Y plane, then interleaved V/U plane (Android camera default).
    Nv21,
    /// Y plane, then interleaved U/V plane.
    Nv12,
}

impl PixelFormat {
    /// Number of bytes a `width` x `height` frame occupies in this format.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        let chroma = (width as usize).div_ceil(2) * (height as usize).div_ceil(2);
        luma + chroma * 2
    }
}

/// Encoding of a `CapturedImage` byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Exact conversion; anything other than 0, 90, 180 or 270 is rejected.
    pub fn from_degrees(degrees: u32) -> Result<Self, CameraError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(CameraError::InvalidState(format!(
                "rotation must be 0, 90, 180 or 270 degrees, got {}",
                other
            ))),
        }
    }

    /// Snap a raw device orientation reading to the nearest quadrant.
    ///
    /// Readings more than 10 degrees away from every quadrant are ambiguous
    /// and return `None`.
    pub fn from_sensor_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            350..=359 | 0..=10 => Some(Self::Deg0),
            80..=100 => Some(Self::Deg90),
            170..=190 => Some(Self::Deg180),
            260..=280 => Some(Self::Deg270),
            _ => None,
        }
    }

    fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            0 => Self::Deg0,
            1 => Self::Deg90,
            2 => Self::Deg180,
            _ => Self::Deg270,
        }
    }

    fn quarter_turns(self) -> u32 {
        self.degrees() / 90
    }

    pub fn minus(self, other: Rotation) -> Rotation {
        Self::from_quarter_turns(self.quarter_turns() + 4 - other.quarter_turns())
    }
}

/// Diagnostics for debugging camera sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionDiagnostics {
    pub session_id: Option<String>,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub sessions_opened: u64,
    pub frames_received: u64,
    pub frames_forwarded: u64,
    pub frames_dropped: u64,
    pub transcode_failures: u64,
    pub captures_requested: u64,
    pub pictures_delivered: u64,
    pub capture_failures: u64,
    pub listener_failures: u64,
    pub frame_interval_min_ms: Option<f64>,
    pub frame_interval_max_ms: Option<f64>,
    pub frame_interval_avg_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_codes_round_trip() {
        for mode in [FlashMode::Off, FlashMode::Auto, FlashMode::On, FlashMode::Torch, FlashMode::RedEye] {
            assert_eq!(FlashMode::try_from(mode.code()), Ok(mode));
        }
    }

    #[test]
    fn unknown_flash_code_is_invalid_state() {
        assert!(matches!(FlashMode::try_from(7), Err(CameraError::InvalidState(_))));
    }

    #[test]
    fn i420_buffer_len() {
        assert_eq!(PixelFormat::I420.buffer_len(4, 2), 8 + 2 + 2);
        // Odd dimensions round chroma planes up.
        assert_eq!(PixelFormat::Nv21.buffer_len(3, 3), 9 + 4 * 2);
    }

    #[test]
    fn rotation_arithmetic_wraps() {
        assert_eq!(Rotation::Deg90.minus(Rotation::Deg180), Rotation::Deg270);
        assert_eq!(Rotation::Deg0.minus(Rotation::Deg90), Rotation::Deg270);
        assert_eq!(Rotation::Deg90.minus(Rotation::Deg90), Rotation::Deg0);
    }

    #[test]
    fn rotation_from_degrees_rejects_non_quadrants() {
        assert_eq!(Rotation::from_degrees(180), Ok(Rotation::Deg180));
        assert!(Rotation::from_degrees(45).is_err());
        assert!(Rotation::from_degrees(360).is_err());
    }

    #[test]
    fn sensor_degrees_snap_to_nearest_quadrant() {
        assert_eq!(Rotation::from_sensor_degrees(355), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_sensor_degrees(5), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_sensor_degrees(95), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_sensor_degrees(182), Some(Rotation::Deg180));
        assert_eq!(Rotation::from_sensor_degrees(270), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_sensor_degrees(45), None);
        assert_eq!(Rotation::from_sensor_degrees(-1), None);
    }
}
