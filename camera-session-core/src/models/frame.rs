use std::time::Duration;

use super::camera_models::{PixelFormat, Rotation};

/// One raw preview frame delivered by the camera sensor.
///
/// Owned by whichever pipeline stage is processing it; listeners only ever
/// see the transcoded `CapturedImage`.
#[derive(Clone)]
pub struct Frame {
    data: Vec<u8>,
    format: PixelFormat,
    width: u32,
    height: u32,
    /// Capture time on the sensor's monotonic clock.
    timestamp: Duration,
    /// Rotation the frame needs to be displayed upright.
    rotation: Rotation,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, format: PixelFormat, width: u32, height: u32, timestamp: Duration) -> Self {
        Self {
            data,
            format,
            width,
            height,
            timestamp,
            rotation: Rotation::Deg0,
            sequence: 0,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    #[inline]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Byte length the buffer must have for the declared format and size.
    pub fn expected_len(&self) -> usize {
        self.format.buffer_len(self.width, self.height)
    }

    /// Non-empty geometry and a buffer of exactly the expected length.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .field("rotation", &self.rotation)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_creation() {
        let frame = Frame::new(vec![0u8; 640 * 480 * 3 / 2], PixelFormat::Nv21, 640, 480, Duration::from_millis(33))
            .with_sequence(4)
            .with_rotation(Rotation::Deg90);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 4);
        assert_eq!(frame.rotation(), Rotation::Deg90);
        assert!(frame.is_valid());
    }

    #[test]
    fn frame_invalid_size() {
        let frame = Frame::new(vec![0u8; 100], PixelFormat::I420, 640, 480, Duration::ZERO);
        assert!(!frame.is_valid());
    }

    #[test]
    fn zero_sized_frame_is_invalid() {
        let frame = Frame::new(Vec::new(), PixelFormat::I420, 0, 0, Duration::ZERO);
        assert!(!frame.is_valid());
    }
}
