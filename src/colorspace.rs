//! Conversions between 8-bit RGB, normalized RGB and CIELAB, plus the two
//! distances the matcher can rank by.

use std::fmt;
use std::str::FromStr;

use palette::color_difference::Ciede2000;
use palette::{FromColor, Lab, Srgb};

/// How "nearest" is decided. Deliberately has no `Default`: every caller
/// names the metric it ranks by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "palette-json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "palette-json", serde(rename_all = "kebab-case"))]
pub enum Metric {
    /// Squared Euclidean distance in normalized sRGB. Ranking only.
    Euclidean,
    /// CIEDE2000 difference in CIELAB (D65).
    DeltaE,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Euclidean => "euclidean",
            Metric::DeltaE => "delta-e",
        })
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "rgb" => Ok(Metric::Euclidean),
            "delta-e" | "deltae" | "delta_e" | "ciede2000" => Ok(Metric::DeltaE),
            other => Err(format!(
                "unknown metric {other:?}, expected \"euclidean\" or \"delta-e\""
            )),
        }
    }
}

#[inline]
pub fn to_normalized(rgb: [u8; 3]) -> Srgb<f32> {
    Srgb::new(rgb[0], rgb[1], rgb[2]).into_format()
}

/// Inverse of [`to_normalized`]; out of range channels are clamped.
#[inline]
pub fn to_rgb8(color: Srgb<f32>) -> [u8; 3] {
    let c: Srgb<u8> = color.into_format();
    [c.red, c.green, c.blue]
}

#[inline]
pub fn rgb_to_lab(color: Srgb<f32>) -> Lab {
    Lab::from_color(color)
}

#[inline]
pub fn euclidean_sq(u: Srgb<f32>, v: Srgb<f32>) -> f32 {
    let dr = u.red - v.red;
    let dg = u.green - v.green;
    let db = u.blue - v.blue;
    dr * dr + dg * dg + db * db
}

#[inline]
pub fn delta_e(u: Lab, v: Lab) -> f32 {
    u.difference(v)
}

/// Distance between two normalized colors under `metric`.
///
/// Convenient for one-off comparisons. Bulk matching should convert to Lab
/// once per color instead, see [`crate::matcher::PaletteIndex`].
pub fn distance(u: Srgb<f32>, v: Srgb<f32>, metric: Metric) -> f32 {
    match metric {
        Metric::Euclidean => euclidean_sq(u, v),
        Metric::DeltaE => delta_e(rgb_to_lab(u), rgb_to_lab(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_round_trip_is_exact_for_u8() {
        for v in [0u8, 1, 17, 128, 254, 255] {
            let rgb = [v, 255 - v, v / 2];
            assert_eq!(to_rgb8(to_normalized(rgb)), rgb);
        }
    }

    #[test]
    fn to_rgb8_clamps() {
        assert_eq!(to_rgb8(Srgb::new(1.4, -0.2, 0.5)), [255, 0, 128]);
    }

    #[test]
    fn lab_of_white_and_black() {
        let white = rgb_to_lab(to_normalized([255, 255, 255]));
        assert!((white.l - 100.0).abs() < 0.1);
        assert!(white.a.abs() < 0.1 && white.b.abs() < 0.1);

        let black = rgb_to_lab(to_normalized([0, 0, 0]));
        assert!(black.l.abs() < 0.1);
    }

    #[test]
    fn identical_colors_are_zero_apart() {
        let c = to_normalized([12, 200, 77]);
        assert_eq!(distance(c, c, Metric::Euclidean), 0.0);
        assert!(distance(c, c, Metric::DeltaE).abs() < 1e-4);
    }

    #[test]
    fn euclidean_is_squared() {
        let black = to_normalized([0, 0, 0]);
        let red = to_normalized([255, 0, 0]);
        let yellow = to_normalized([255, 255, 0]);
        assert!((distance(black, red, Metric::Euclidean) - 1.0).abs() < 1e-6);
        assert!((distance(black, yellow, Metric::Euclidean) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn metric_parsing() {
        assert_eq!("Euclidean".parse::<Metric>(), Ok(Metric::Euclidean));
        assert_eq!("delta-e".parse::<Metric>(), Ok(Metric::DeltaE));
        assert_eq!("CIEDE2000".parse::<Metric>(), Ok(Metric::DeltaE));
        assert!("manhattan".parse::<Metric>().is_err());
        assert_eq!(Metric::DeltaE.to_string().parse::<Metric>(), Ok(Metric::DeltaE));
    }
}
