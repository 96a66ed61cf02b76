use std::sync::Arc;

use image::DynamicImage;

use super::camera_models::{ImageEncoding, Rotation};
use super::error::CameraError;

/// An encoded image ready for display: a preview frame or a still capture.
///
/// Immutable after creation. Cloning shares the encoded buffer, so handing the
/// same picture to several listeners never copies pixel data.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data: Arc<[u8]>,
    encoding: ImageEncoding,
    width: u32,
    height: u32,
    /// Clockwise rotation still needed to display the image upright.
    orientation: Rotation,
}

impl CapturedImage {
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        encoding: ImageEncoding,
        width: u32,
        height: u32,
        orientation: Rotation,
    ) -> Self {
        Self {
            data: data.into(),
            encoding,
            width,
            height,
            orientation,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn orientation(&self) -> Rotation {
        self.orientation
    }

    /// Whether both values are backed by the very same encoded buffer.
    pub fn shares_buffer_with(&self, other: &CapturedImage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Decode the buffer into pixels.
    pub fn decode(&self) -> Result<DynamicImage, CameraError> {
        let decoded = image::load_from_memory_with_format(&self.data, self.encoding.format())?;
        Ok(decoded)
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("encoding", &self.encoding)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("orientation", &self.orientation)
            .field("bytes", &self.data.len())
            .finish()
    }
}
