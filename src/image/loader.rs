use crate::error::{DtrError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use ndarray::Array4;
use std::path::{Path, PathBuf};

/// Per-channel mean of the backbone's training distribution (ImageNet).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviation of the backbone's training distribution.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// An image handed to the descriptor pipeline.
///
/// The pipeline accepts a file path, a raw interleaved RGB8 buffer, or an
/// already-decoded image object. All three are resolved to the same canonical
/// 3-channel representation before any processing happens.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Path to an image file; decoded and converted to RGB on resolution.
    Path(PathBuf),
    /// Raw interleaved RGB8 pixels, row-major.
    Pixels {
        data: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// An image decoded elsewhere.
    Decoded(DynamicImage),
}

impl ImageSource {
    /// Resolve the source into a 3-channel image buffer.
    pub fn to_rgb(&self) -> Result<RgbImage> {
        match self {
            ImageSource::Path(path) => Ok(image::open(path)?.to_rgb8()),
            ImageSource::Pixels {
                data,
                width,
                height,
            } => {
                let expected = *width as usize * *height as usize * 3;
                if data.len() != expected {
                    return Err(DtrError::InvalidInput(format!(
                        "pixel buffer holds {} bytes, {}x{} RGB needs {}",
                        data.len(),
                        width,
                        height,
                        expected
                    )));
                }
                RgbImage::from_raw(*width, *height, data.clone()).ok_or_else(|| {
                    DtrError::InvalidInput("pixel buffer does not fit its dimensions".to_string())
                })
            }
            ImageSource::Decoded(img) => Ok(img.to_rgb8()),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<String> for ImageSource {
    fn from(path: String) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(img: DynamicImage) -> Self {
        ImageSource::Decoded(img)
    }
}

impl From<RgbImage> for ImageSource {
    fn from(img: RgbImage) -> Self {
        ImageSource::Decoded(DynamicImage::ImageRgb8(img))
    }
}

/// Resize to an explicit square size.
pub fn resize_square(img: &RgbImage, size: u32) -> RgbImage {
    imageops::resize(img, size, size, FilterType::Triangle)
}

/// Rescale proportionally by a ratio on both axes.
pub fn rescale(img: &RgbImage, ratio: f32) -> Result<RgbImage> {
    if !(ratio > 0.0) || !ratio.is_finite() {
        return Err(DtrError::InvalidInput(format!(
            "rescale ratio must be a positive finite number, got {ratio}"
        )));
    }
    let width = ((img.width() as f32 * ratio).round() as u32).max(1);
    let height = ((img.height() as f32 * ratio).round() as u32).max(1);
    Ok(imageops::resize(img, width, height, FilterType::Triangle))
}

/// Rotate by whole degrees about the image centre, keeping the canvas shape.
/// Positive angles rotate counter-clockwise.
pub fn rotate_ccw(img: &RgbImage, degrees: i32) -> RgbImage {
    // rotate_about_center runs clockwise, hence the negation.
    let theta = -(degrees as f32).to_radians();
    rotate_about_center(img, theta, Interpolation::Bilinear, Rgb([0, 0, 0]))
}

/// Standardise pixels with the backbone's training mean/std and lay the image
/// out as an NCHW tensor with a batch dimension of 1.
pub fn to_input_tensor(img: &RgbImage) -> Array4<f32> {
    let (width, height) = img.dimensions();
    Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, channel, y, x)| {
            let value = img.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0;
            (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
        },
    )
}
