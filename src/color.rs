use std::fmt;

use palette::Srgb;

use crate::colorspace::to_normalized;
use crate::error::{ParseColorError, Result};

/// A named paint color.
///
/// Two colors are the same entry only when RGB, name and vendor all match, so a
/// palette may carry several names for one RGB value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "palette-json", derive(serde::Serialize))]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    name: String,
    vendor: String,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            r,
            g,
            b,
            name: name.into(),
            vendor: vendor.into(),
        }
    }

    /// A color with no palette behind it, e.g. a k-means centroid.
    pub fn unnamed(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2], "", "")
    }

    /// Parse `"ff8800"` or `"#FF8800"` into an unnamed color.
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        parse_hex(hex).map(Self::unnamed)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn r(&self) -> u8 {
        self.r
    }

    pub fn g(&self) -> u8 {
        self.g
    }

    pub fn b(&self) -> u8 {
        self.b
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    /// Uppercase hex without a leading `#`.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_srgb(&self) -> Srgb<f32> {
        to_normalized(self.rgb())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.vendor.is_empty()) {
            (true, _) => write!(f, "#{}", self.to_hex()),
            (false, true) => f.write_str(&self.name),
            (false, false) => write!(f, "{} {}", self.name, self.vendor),
        }
    }
}

pub(crate) fn parse_hex(hex: &str) -> Result<[u8; 3], ParseColorError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(ParseColorError(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| ParseColorError(hex.to_string()))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// An ordered set of target colors plus where it came from.
///
/// Order does not influence which color wins a match except for ties, where
/// the earlier entry is kept. An empty palette means "quantize freely".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
    name: Option<String>,
    url: Option<String>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self {
            colors,
            name: None,
            url: None,
        }
    }

    /// Build an anonymous palette from hex strings, as accepted on the command
    /// line and from JavaScript.
    pub fn from_hex_list<S: AsRef<str>>(hex: &[S]) -> Result<Self> {
        let colors = hex
            .iter()
            .map(|s| Color::from_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(colors))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<&Color> {
        self.colors.get(index)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Color> {
        self.colors.iter()
    }

    /// Append the colors of `other`, keeping this palette's name and url.
    pub fn extend(&mut self, other: Palette) {
        if self.name.is_none() {
            self.name = other.name;
        }
        if self.url.is_none() {
            self.url = other.url;
        }
        self.colors.extend(other.colors);
    }
}

impl FromIterator<Color> for Palette {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a Color;
    type IntoIter = std::slice::Iter<'a, Color>;

    fn into_iter(self) -> Self::IntoIter {
        self.colors.iter()
    }
}
