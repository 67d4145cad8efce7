use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// Label text is assumed to sit in this centered band of the frame.
pub const CROP_WIDTH_RATIO: f64 = 0.8;
pub const CROP_HEIGHT_RATIO: f64 = 0.4;

pub const DEFAULT_BINARIZE_THRESHOLD: u8 = 100;
pub const DEFAULT_CONTRAST_AMOUNT: f32 = 64.0;

/// Raw RGBA capture from a camera stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ImageFrame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ImageError::BufferMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            data: rgba.into_raw(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        Ok(Self::from_image(&image))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Per-pixel grayscale policy applied after cropping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PixelTransform {
    /// 255 when the luminance is strictly above `threshold`, otherwise 0.
    Binarize { threshold: u8 },
    /// Classic contrast correction around mid-gray.
    ContrastStretch { amount: f32 },
}

impl PixelTransform {
    pub fn apply(&self, luminance: f32) -> u8 {
        match *self {
            PixelTransform::Binarize { threshold } => {
                if luminance > threshold as f32 {
                    255
                } else {
                    0
                }
            }
            PixelTransform::ContrastStretch { amount } => {
                let value = contrast_factor(amount) * (luminance - 128.0) + 128.0;
                value.round().clamp(0.0, 255.0) as u8
            }
        }
    }
}

impl Default for PixelTransform {
    fn default() -> Self {
        PixelTransform::Binarize {
            threshold: DEFAULT_BINARIZE_THRESHOLD,
        }
    }
}

/// F = 259(C + 255) / (255(259 - C)), with C kept inside [-255, 255].
pub fn contrast_factor(amount: f32) -> f32 {
    let c = amount.clamp(-255.0, 255.0);
    259.0 * (c + 255.0) / (255.0 * (259.0 - c))
}

pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 + g as f32 + b as f32) / 3.0
}

/// Cropped grayscale bitmap ready for recognition.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    image: RgbaImage,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageNormalizer {
    transform: PixelTransform,
}

impl ImageNormalizer {
    pub fn new(transform: PixelTransform) -> Self {
        Self { transform }
    }

    pub fn transform(&self) -> PixelTransform {
        self.transform
    }

    pub fn normalize(&self, frame: &ImageFrame) -> Result<NormalizedImage, ImageError> {
        if frame.is_empty() {
            return Err(ImageError::EmptyFrame);
        }

        let source = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
            ImageError::BufferMismatch {
                width: frame.width,
                height: frame.height,
                expected: frame.width as usize * frame.height as usize * 4,
                actual: frame.data.len(),
            },
        )?;

        let (x, y, width, height) = crop_region(frame.width, frame.height);
        let mut image = imageops::crop_imm(&source, x, y, width, height).to_image();

        for pixel in image.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let value = self.transform.apply(luminance(r, g, b));
            pixel.0 = [value, value, value, a];
        }

        Ok(NormalizedImage { image })
    }
}

/// Centered `(x, y, width, height)` covering 80% x 40% of the frame, never
/// smaller than one pixel.
pub fn crop_region(width: u32, height: u32) -> (u32, u32, u32, u32) {
    let crop_width = ((width as f64 * CROP_WIDTH_RATIO).floor() as u32).clamp(1, width);
    let crop_height = ((height as f64 * CROP_HEIGHT_RATIO).floor() as u32).clamp(1, height);
    (
        (width - crop_width) / 2,
        (height - crop_height) / 2,
        crop_width,
        crop_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> ImageFrame {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        ImageFrame::from_rgba(width, height, data).unwrap()
    }

    #[test]
    fn binarize_is_strictly_above_threshold() {
        let t = PixelTransform::Binarize { threshold: 100 };
        assert_eq!(t.apply(100.0), 0);
        assert_eq!(t.apply(100.34), 255);
        assert_eq!(t.apply(0.0), 0);
        assert_eq!(t.apply(255.0), 255);
        for l in 0..=255u16 {
            let out = t.apply(l as f32);
            assert!(out == 0 || out == 255);
            assert_eq!(out == 255, l > 100);
        }
    }

    #[test]
    fn contrast_matches_formula() {
        for amount in [0.0f32, 32.0, 64.0, 128.0, -50.0] {
            let t = PixelTransform::ContrastStretch { amount };
            let f = contrast_factor(amount);
            for l in (0..=255u16).step_by(5) {
                let l = l as f32;
                let expected = (f * (l - 128.0) + 128.0).round().clamp(0.0, 255.0) as u8;
                assert_eq!(t.apply(l), expected);
            }
        }
        // Zero contrast leaves the value in place.
        assert!((contrast_factor(0.0) - 1.0).abs() < 1e-6);
        assert_eq!(PixelTransform::ContrastStretch { amount: 0.0 }.apply(77.0), 77);
    }

    #[test]
    fn crop_is_centered() {
        assert_eq!(crop_region(100, 50), (10, 15, 80, 20));
        assert_eq!(crop_region(1920, 1080), (192, 324, 1536, 432));
        assert_eq!(crop_region(1, 1), (0, 0, 1, 1));
    }

    #[test]
    fn output_is_grayscale_and_keeps_alpha() {
        let frame = solid_frame(10, 10, [200, 40, 90, 77]);
        for transform in [
            PixelTransform::Binarize { threshold: 100 },
            PixelTransform::ContrastStretch { amount: 64.0 },
        ] {
            let normalized = ImageNormalizer::new(transform).normalize(&frame).unwrap();
            assert_eq!((normalized.width(), normalized.height()), (8, 4));
            let expected = transform.apply(luminance(200, 40, 90));
            for pixel in normalized.as_rgba().pixels() {
                assert_eq!(pixel.0, [expected, expected, expected, 77]);
            }
        }
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = ImageFrame::from_rgba(0, 10, Vec::new()).unwrap();
        let err = ImageNormalizer::new(PixelTransform::default())
            .normalize(&frame)
            .unwrap_err();
        assert!(matches!(err, ImageError::EmptyFrame));
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let err = ImageFrame::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, ImageError::BufferMismatch { expected: 16, actual: 15, .. }));
    }

    #[test]
    fn png_encoding_decodes_to_same_size() {
        let frame = solid_frame(20, 20, [255, 255, 255, 255]);
        let normalized = ImageNormalizer::new(PixelTransform::default())
            .normalize(&frame)
            .unwrap();
        let png = normalized.to_png().unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }
}
