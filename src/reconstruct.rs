use std::collections::HashMap;
use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use palette::Srgb;

use crate::color::Color;
use crate::colorspace::to_rgb8;
use crate::error::{Error, Result};
use crate::ingest::PixelMatrix;

/// Output colors indexed by label.
#[derive(Clone, Copy, Debug)]
pub enum Codebook<'a> {
    /// Entries of a caller-supplied palette.
    Palette(&'a [Color]),
    /// Free cluster centroids with no name attached.
    Centroids(&'a [Srgb<f32>]),
}

impl Codebook<'_> {
    pub fn len(&self) -> usize {
        match self {
            Codebook::Palette(colors) => colors.len(),
            Codebook::Centroids(centroids) => centroids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rgb(&self, label: usize) -> [u8; 3] {
        match self {
            Codebook::Palette(colors) => colors[label].rgb(),
            Codebook::Centroids(centroids) => to_rgb8(centroids[label]),
        }
    }

    fn color(&self, label: usize) -> Color {
        match self {
            Codebook::Palette(colors) => colors[label].clone(),
            Codebook::Centroids(centroids) => Color::unnamed(to_rgb8(centroids[label])),
        }
    }
}

/// One line of a usage report.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "palette-json", derive(serde::Serialize))]
pub struct ColorUsage {
    pub color: Color,
    pub pixels: u64,
    /// Share of the image area, 0 to 100.
    pub percentage: f64,
}

/// A quantized image and how many pixels ended up with each color.
#[derive(Clone, Debug)]
pub struct QuantizedImage {
    image: PixelMatrix,
    color_pixels: HashMap<Color, u64>,
}

impl QuantizedImage {
    pub fn image(&self) -> &PixelMatrix {
        &self.image
    }

    pub fn into_image(self) -> PixelMatrix {
        self.image
    }

    /// Pixel count per output color. Colors no pixel uses are absent.
    pub fn color_pixels(&self) -> &HashMap<Color, u64> {
        &self.color_pixels
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn percentage(&self, color: &Color) -> f64 {
        let pixels = self.color_pixels.get(color).copied().unwrap_or(0);
        pixels as f64 / self.area() as f64 * 100.0
    }

    /// Colors by descending pixel count, ties in color order.
    pub fn usage(&self) -> Vec<ColorUsage> {
        let area = self.area() as f64;
        let mut usage: Vec<ColorUsage> = self
            .color_pixels
            .iter()
            .map(|(color, &pixels)| ColorUsage {
                color: color.clone(),
                pixels,
                percentage: pixels as f64 / area * 100.0,
            })
            .collect();
        usage.sort_by(|a, b| b.pixels.cmp(&a.pixels).then_with(|| a.color.cmp(&b.color)));
        usage
    }

    pub fn encode(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), format)
            .map_err(Error::Encode)?;
        Ok(buf)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.encode(ImageFormat::Png)
    }
}

/// Paint every pixel with its label's codebook color and count the pixels per
/// resulting [`Color`].
///
/// Any label outside the codebook, or a label vector that does not cover the
/// image exactly, is an engine bug and reported as such.
pub fn rebuild(
    labels: &[usize],
    codebook: Codebook<'_>,
    width: u32,
    height: u32,
) -> Result<QuantizedImage> {
    let pixels = width as usize * height as usize;
    if labels.len() != pixels {
        return Err(Error::LabelCount {
            labels: labels.len(),
            pixels,
        });
    }

    let len = codebook.len();
    let table: Vec<[u8; 3]> = (0..len).map(|label| codebook.rgb(label)).collect();
    let mut counts = vec![0u64; len];
    let mut raw = Vec::with_capacity(pixels * 3);

    for &label in labels {
        let rgb = table
            .get(label)
            .ok_or(Error::LabelOutOfBounds { label, len })?;
        raw.extend_from_slice(rgb);
        counts[label] += 1;
    }

    let mut color_pixels: HashMap<Color, u64> = HashMap::new();
    for (label, &count) in counts.iter().enumerate() {
        if count > 0 {
            *color_pixels.entry(codebook.color(label)).or_insert(0) += count;
        }
    }

    let counted: u64 = color_pixels.values().sum();
    if counted != pixels as u64 {
        return Err(Error::HistogramMismatch {
            counted,
            expected: pixels as u64,
        });
    }

    let image = RgbImage::from_raw(width, height, raw).ok_or(Error::LabelCount {
        labels: labels.len(),
        pixels,
    })?;

    Ok(QuantizedImage {
        image,
        color_pixels,
    })
}
