use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};
use log::{debug, warn};

use crate::error::InvalidImageError;

/// Decoded image the pipeline works on: 8 bits per channel, RGB, non-empty.
pub type PixelMatrix = RgbImage;

pub const DEFAULT_MAX_BYTES: u64 = 30 * 1024 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 2000;

/// Anything that can be read as an encoded image.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        ImageSource::Bytes(bytes.to_vec())
    }
}

/// Size guards applied before and after decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Encoded inputs larger than this are rejected without decoding.
    pub max_bytes: u64,
    /// Decoded images whose long edge exceeds this are downsampled to it.
    pub max_dimension: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl IngestConfig {
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }
}

impl ImageSource {
    /// Read the encoded bytes, refusing anything over `max_bytes`.
    fn read(self, max_bytes: u64) -> Result<Vec<u8>, InvalidImageError> {
        let bytes = match self {
            ImageSource::Path(path) => {
                let size = fs::metadata(&path)?.len();
                check_size(size, max_bytes)?;
                fs::read(&path)?
            }
            ImageSource::Bytes(bytes) => bytes,
        };
        check_size(bytes.len() as u64, max_bytes)?;
        Ok(bytes)
    }
}

fn check_size(size: u64, limit: u64) -> Result<(), InvalidImageError> {
    if size > limit {
        return Err(InvalidImageError::TooLarge { size, limit });
    }
    Ok(())
}

/// Decode `source` into a validated RGB pixel matrix.
///
/// Alpha is dropped and wider sample types are narrowed to 8 bits, both with a
/// warning. An image larger than `max_dimension` on its long edge is resized
/// once with a Catmull-Rom (bicubic) filter so the long edge equals the limit.
pub fn ingest(
    source: impl Into<ImageSource>,
    config: &IngestConfig,
) -> Result<PixelMatrix, InvalidImageError> {
    let bytes = source.into().read(config.max_bytes)?;
    let img = image::load_from_memory(&bytes)?;
    let rgb = to_rgb8(img)?;
    Ok(limit_dimensions(rgb, config.max_dimension.max(1)))
}

fn to_rgb8(img: DynamicImage) -> Result<RgbImage, InvalidImageError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(InvalidImageError::Empty);
    }

    let color = img.color();
    let channels = color.channel_count();
    if channels != 3 && channels != 4 {
        return Err(InvalidImageError::UnsupportedChannels(channels));
    }
    if color.bytes_per_pixel() != channels {
        warn!("conversion from {color:?} to 8 bits per channel, possible loss of precision");
    }
    if color.has_alpha() {
        warn!("ignoring alpha channel of the image");
    }
    debug!("decoded {width}x{height} {color:?} image");

    Ok(img.to_rgb8())
}

/// Target size when `(width, height)` exceeds `max_dimension` on its long edge.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let long = width.max(height);
    if long <= max_dimension {
        return None;
    }
    let scale = |edge: u32| {
        ((edge as f64) * (max_dimension as f64) / (long as f64))
            .round()
            .max(1.0) as u32
    };
    Some(if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    })
}

fn limit_dimensions(img: RgbImage, max_dimension: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    match fit_within(width, height, max_dimension) {
        Some((w, h)) => {
            warn!("resizing {width}x{height} image to {w}x{h}");
            image::imageops::resize(&img, w, h, FilterType::CatmullRom)
        }
        None => img,
    }
}
