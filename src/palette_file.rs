//! Palette documents on disk.
//!
//! ```json
//! {
//!   "name": "My palette",
//!   "url": "https://example.com/paints",
//!   "palette": [
//!     { "rgb": "ff0000", "name": "Red", "vendor": "ABC Paints" },
//!     { "rgb": [0, 255, 0], "name": "Green", "vendor": "ABC Paints" }
//!   ]
//! }
//! ```
//!
//! `color` is accepted in place of `rgb`, and `colors` in place of `palette`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::color::{Color, Palette, parse_hex};
use crate::error::{Error, Result};

#[derive(Deserialize)]
struct PaletteDocument {
    name: Option<String>,
    url: Option<String>,
    #[serde(alias = "colors")]
    palette: Vec<ColorEntry>,
}

#[derive(Deserialize)]
struct ColorEntry {
    #[serde(alias = "color")]
    rgb: RgbValue,
    #[serde(default)]
    name: String,
    #[serde(default)]
    vendor: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RgbValue {
    Hex(String),
    Triplet([u8; 3]),
}

impl ColorEntry {
    fn into_color(self) -> Result<Color> {
        let [r, g, b] = match self.rgb {
            RgbValue::Hex(hex) => parse_hex(&hex)
                .map_err(|e| Error::PaletteFormat(format!("color {:?}: {e}", self.name)))?,
            RgbValue::Triplet(rgb) => rgb,
        };
        Ok(Color::new(r, g, b, self.name, self.vendor))
    }
}

impl Palette {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: PaletteDocument =
            serde_json::from_str(json).map_err(|e| Error::PaletteFormat(e.to_string()))?;
        let colors = doc
            .palette
            .into_iter()
            .map(ColorEntry::into_color)
            .collect::<Result<Vec<_>>>()?;

        let mut palette = Palette::new(colors);
        if let Some(name) = doc.name {
            palette = palette.with_name(name);
        }
        if let Some(url) = doc.url {
            palette = palette.with_url(url);
        }
        Ok(palette)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::PaletteFormat(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
            .map_err(|e| Error::PaletteFormat(format!("{}: {e}", path.display())))
    }

    /// Concatenate several documents in order. Name and url come from the
    /// first document that has them.
    pub fn from_files<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        let mut merged = Palette::default();
        for path in paths {
            merged.extend(Self::from_file(path)?);
        }
        Ok(merged)
    }
}
