use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};

use crate::models::camera_models::{ImageEncoding, PixelFormat, Rotation};
use crate::models::captured_image::CapturedImage;
use crate::models::config::SessionConfiguration;
use crate::models::error::CameraError;
use crate::models::frame::Frame;

/// Lowest JPEG quality a preview frame is encoded with.
pub const MIN_PREVIEW_QUALITY: u8 = 10;

/// Stateless frame and picture transcoder.
///
/// Holds only immutable options, so one instance can be shared by every
/// thread that has a frame or picture in flight.
///
/// Pipelines:
/// ```text
/// Frame (YUV 4:2:0) → RGB (BT.601) → scale → JPEG/PNG   (to_preview_image)
/// CapturedImage → decode → scale | rotate → re-encode    (to_display_image, apply_orientation)
/// ```
#[derive(Debug, Clone)]
pub struct ImageTranscoder {
    pub preview_scale: f32,
    pub jpeg_quality: u8,
    pub preview_encoding: ImageEncoding,
}

impl ImageTranscoder {
    pub fn new(preview_scale: f32, jpeg_quality: u8, preview_encoding: ImageEncoding) -> Self {
        Self {
            preview_scale,
            jpeg_quality,
            preview_encoding,
        }
    }

    pub fn from_config(config: &SessionConfiguration) -> Self {
        Self::new(config.preview_scale, config.jpeg_quality, config.preview_encoding)
    }

    /// JPEG quality for preview frames: the base quality scaled like the
    /// preview dimensions.
    pub fn preview_quality(&self) -> u8 {
        let scaled = (self.jpeg_quality as f32 * self.preview_scale).round();
        scaled.clamp(MIN_PREVIEW_QUALITY as f32, 100.0) as u8
    }

    /// Encode a raw sensor frame into a reduced-scale preview image.
    ///
    /// The result keeps the frame's rotation as its orientation; rotating it
    /// upright is a separate step. A malformed buffer yields
    /// `TranscodeFailure` and no image.
    pub fn to_preview_image(&self, frame: &Frame) -> Result<CapturedImage, CameraError> {
        let rgb = yuv420_to_rgb(frame)?;
        let (width, height) = scaled_dimensions(frame.width(), frame.height(), self.preview_scale);

        let image = DynamicImage::ImageRgb8(rgb);
        let image = if (width, height) == (frame.width(), frame.height()) {
            image
        } else {
            image.resize_exact(width, height, FilterType::Triangle)
        };

        encode(&image, self.preview_encoding, self.preview_quality(), frame.rotation())
    }

    /// Rescale an encoded image by `scale` in both dimensions.
    ///
    /// A scale of 1 returns the input unchanged.
    pub fn to_display_image(&self, image: &CapturedImage, scale: f32) -> Result<CapturedImage, CameraError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CameraError::InvalidState(format!("display scale must be positive, got {}", scale)));
        }
        if (scale - 1.0).abs() < f32::EPSILON {
            return Ok(image.clone());
        }

        let decoded = image.decode()?;
        let (width, height) = scaled_dimensions(decoded.width(), decoded.height(), scale);
        let resized = decoded.resize_exact(width, height, FilterType::Triangle);
        encode(&resized, image.encoding(), self.jpeg_quality, image.orientation())
    }

    /// Rotate pixel content clockwise by `rotation`.
    ///
    /// 0° returns the input itself (same buffer). 90° and 270° swap width and
    /// height. The result's orientation is what remains of the input's.
    pub fn apply_orientation(&self, image: &CapturedImage, rotation: Rotation) -> Result<CapturedImage, CameraError> {
        let rotate: fn(&DynamicImage) -> DynamicImage = match rotation {
            Rotation::Deg0 => return Ok(image.clone()),
            Rotation::Deg90 => DynamicImage::rotate90,
            Rotation::Deg180 => DynamicImage::rotate180,
            Rotation::Deg270 => DynamicImage::rotate270,
        };

        let rotated = rotate(&image.decode()?);
        encode(
            &rotated,
            image.encoding(),
            self.jpeg_quality,
            image.orientation().minus(rotation),
        )
    }
}

/// Scale both dimensions, rounding and keeping each side at least 1 pixel.
pub fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let new_width = (width as f32 * scale).round().max(1.0) as u32;
    let new_height = (height as f32 * scale).round().max(1.0) as u32;
    (new_width, new_height)
}

/// Convert a YUV 4:2:0 frame to packed RGB using BT.601 coefficients.
pub fn yuv420_to_rgb(frame: &Frame) -> Result<RgbImage, CameraError> {
    if !frame.is_valid() {
        return Err(CameraError::TranscodeFailure(format!(
            "malformed {:?} frame: {} bytes for {}x{}, expected {}",
            frame.format(),
            frame.data().len(),
            frame.width(),
            frame.height(),
            frame.expected_len()
        )));
    }

    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let chroma_width = width.div_ceil(2);
    let chroma_len = chroma_width * height.div_ceil(2);
    let (luma, chroma) = frame.data().split_at(width * height);

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let y = luma[row * width + col] as f32;
            let c = (row / 2) * chroma_width + col / 2;
            let (u, v) = match frame.format() {
                PixelFormat::I420 => (chroma[c], chroma[chroma_len + c]),
                PixelFormat::Nv12 => (chroma[2 * c], chroma[2 * c + 1]),
                PixelFormat::Nv21 => (chroma[2 * c + 1], chroma[2 * c]),
            };
            let u = u as f32 - 128.0;
            let v = v as f32 - 128.0;

            rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }

    RgbImage::from_raw(frame.width(), frame.height(), rgb)
        .ok_or_else(|| CameraError::TranscodeFailure("rgb buffer does not match frame size".into()))
}

fn encode(
    image: &DynamicImage,
    encoding: ImageEncoding,
    quality: u8,
    orientation: Rotation,
) -> Result<CapturedImage, CameraError> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut buf = Vec::new();

    match encoding {
        ImageEncoding::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode_image(&rgb)?;
        }
        ImageEncoding::Png => {
            PngEncoder::new(&mut buf).write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)?;
        }
    }

    Ok(CapturedImage::new(buf, encoding, width, height, orientation))
}
