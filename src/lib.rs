use wasm_bindgen::prelude::*;
use js_sys::{Array, Object, Reflect, Uint8Array};

pub mod cluster;
pub mod color;
pub mod colorspace;
pub mod error;
pub mod ingest;
pub mod matcher;
#[cfg(feature = "palette-json")]
pub mod palette_file;
pub mod pipeline;
pub mod reconstruct;

pub use cluster::{ClusterConfig, Clustering};
pub use color::{Color, Palette};
pub use colorspace::Metric;
pub use error::{Error, InvalidImageError, ParseColorError, Result};
pub use ingest::{ImageSource, IngestConfig, PixelMatrix, ingest};
pub use matcher::PaletteIndex;
pub use pipeline::{Plan, QuantizeOptions, quantize, quantize_pixels};
pub use reconstruct::{Codebook, ColorUsage, QuantizedImage};

// ------------------------------------------------------------
// JavaScript entry point
// ------------------------------------------------------------

/// Reduce an encoded image to a palette from JavaScript.
///
/// `palette` is an array whose items are either hex strings (`"#FF0000"`) or
/// objects `{ rgb, name, vendor }` with `rgb` as a hex string. Pass `undefined`
/// or an empty array to let k-means pick `n_colors` colors freely.
///
/// `metric` is `"euclidean"` (default) or `"delta-e"`.
///
/// Returns `{ image: Uint8Array /* PNG */, colors: [{ hex, name, vendor,
/// pixels, percentage }] }`, colors sorted by area.
#[wasm_bindgen]
pub fn quantize_image(
    input: Vec<u8>,
    palette: Option<Array>,
    n_colors: usize,
    metric: Option<String>,
) -> std::result::Result<Object, JsValue> {
    let metric = match metric.as_deref() {
        Some(name) => name.parse::<Metric>().map_err(|e| JsValue::from_str(&e))?,
        None => Metric::Euclidean,
    };
    let palette = palette.map(|entries| palette_from_js(&entries)).transpose()?;

    let options = QuantizeOptions::default()
        .with_n_colors(n_colors)
        .with_metric(metric);
    let quantized = quantize(input, palette.as_ref(), &options).map_err(to_js_error)?;
    let png = quantized.encode_png().map_err(to_js_error)?;

    let colors = Array::new();
    for usage in quantized.usage() {
        let entry = Object::new();
        Reflect::set(&entry, &"hex".into(), &usage.color.to_hex().into())?;
        Reflect::set(&entry, &"name".into(), &usage.color.name().into())?;
        Reflect::set(&entry, &"vendor".into(), &usage.color.vendor().into())?;
        Reflect::set(&entry, &"pixels".into(), &JsValue::from_f64(usage.pixels as f64))?;
        Reflect::set(&entry, &"percentage".into(), &JsValue::from_f64(usage.percentage))?;
        colors.push(&entry);
    }

    let result = Object::new();
    Reflect::set(&result, &"image".into(), &Uint8Array::from(png.as_slice()))?;
    Reflect::set(&result, &"colors".into(), &colors)?;
    Ok(result)
}

fn palette_from_js(entries: &Array) -> std::result::Result<Palette, JsValue> {
    let mut colors = Vec::with_capacity(entries.length() as usize);
    for val in entries.iter() {
        let color = if let Some(hex) = val.as_string() {
            Color::from_hex(&hex).map_err(to_js_error)?
        } else {
            let field = |key: &str| -> std::result::Result<Option<String>, JsValue> {
                Ok(Reflect::get(&val, &key.into())?.as_string())
            };
            let hex = field("rgb")?.ok_or_else(|| {
                JsValue::from_str("Palette entries must be hex strings or { rgb, name, vendor } objects")
            })?;
            Color::from_hex(&hex)
                .map_err(to_js_error)?
                .with_name(field("name")?.unwrap_or_default())
                .with_vendor(field("vendor")?.unwrap_or_default())
        };
        colors.push(color);
    }
    Ok(Palette::new(colors))
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
