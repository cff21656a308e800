use thiserror::Error;

/// Problems with the image a caller handed in. These are the only errors a
/// front end is expected to turn into a friendly "please resubmit" message.
#[derive(Debug, Error)]
pub enum InvalidImageError {
    #[error("image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("unable to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("3 channel RGB image expected, but given an image with {0} channel(s)")]
    UnsupportedChannels(u8),

    #[error("image has no pixels")]
    Empty,
}

/// A hex color literal that could not be parsed.
#[derive(Debug, Error)]
#[error("expected a 6 digit hexadecimal RGB value, got {0:?}")]
pub struct ParseColorError(pub String);

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),

    /// A codebook label pointing past the codebook. Always an engine bug.
    #[error("label {label} is out of bounds for a codebook of {len} colors")]
    LabelOutOfBounds { label: usize, len: usize },

    /// Label vector and image area disagree. Always an engine bug.
    #[error("{labels} labels for an image of {pixels} pixels")]
    LabelCount { labels: usize, pixels: usize },

    /// Histogram does not add up to the image area. Always an engine bug.
    #[error("histogram counts {counted} pixels, image has {expected}")]
    HistogramMismatch { counted: u64, expected: u64 },

    #[error("unable to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error(transparent)]
    Color(#[from] ParseColorError),

    #[cfg(feature = "palette-json")]
    #[error("invalid palette document: {0}")]
    PaletteFormat(String),
}

impl Error {
    /// True when the failure is the caller's input rather than an engine fault.
    pub fn is_invalid_image(&self) -> bool {
        matches!(self, Error::InvalidImage(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
