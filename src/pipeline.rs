//! The pipeline ties the stages together: ingest, optional k-means reduction,
//! palette matching and reconstruction. Each call owns its buffers outright;
//! nothing is shared between calls, so independent requests can run on
//! separate threads without coordination.

use log::info;

use crate::cluster::{ClusterConfig, reduce};
use crate::color::Palette;
use crate::colorspace::Metric;
use crate::error::Result;
use crate::ingest::{ImageSource, IngestConfig, PixelMatrix, ingest};
use crate::matcher::{PaletteIndex, compose};
use crate::reconstruct::{Codebook, QuantizedImage, rebuild};

/// Everything a single quantization run can be tuned with.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizeOptions {
    /// Requested color cap. `0` means "no bound".
    pub n_colors: usize,
    pub metric: Metric,
    pub ingest: IngestConfig,
    pub cluster: ClusterConfig,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            n_colors: 0,
            metric: Metric::Euclidean,
            ingest: IngestConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl QuantizeOptions {
    pub fn with_n_colors(mut self, n_colors: usize) -> Self {
        self.n_colors = n_colors;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }
}

/// Which stages a run goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plan {
    /// No palette: cluster to `k` colors and keep the centroids.
    Free { k: usize },
    /// Cluster to `k` colors, then snap each centroid to the palette.
    ClusterThenMatch { k: usize },
    /// Snap every pixel to the palette directly.
    MatchPixels,
}

impl Plan {
    /// Pick the stages for a palette of `palette_len` entries.
    ///
    /// A bounded request smaller than the palette clusters first. Perceptual
    /// matching without a bound also clusters, to the cap, since CIEDE2000 on
    /// every pixel is too slow for large images.
    pub fn choose(palette_len: usize, n_colors: usize, metric: Metric, config: &ClusterConfig) -> Self {
        if palette_len == 0 {
            let requested = if n_colors == 0 {
                config.default_colors
            } else {
                n_colors
            };
            return Plan::Free {
                k: config.clamp_k(requested),
            };
        }
        if n_colors > 0 && n_colors < palette_len {
            return Plan::ClusterThenMatch {
                k: config.clamp_k(n_colors),
            };
        }
        match metric {
            Metric::DeltaE => Plan::ClusterThenMatch {
                k: config.clamp_k(config.max_clusters),
            },
            Metric::Euclidean => Plan::MatchPixels,
        }
    }

    /// Cluster count, when the plan clusters at all.
    pub fn cluster_k(&self) -> Option<usize> {
        match *self {
            Plan::Free { k } | Plan::ClusterThenMatch { k } => Some(k),
            Plan::MatchPixels => None,
        }
    }
}

/// Decode `source` and reduce it to `palette`, or to freely chosen colors when
/// there is no palette (or it is empty).
pub fn quantize(
    source: impl Into<ImageSource>,
    palette: Option<&Palette>,
    options: &QuantizeOptions,
) -> Result<QuantizedImage> {
    let pixels = ingest(source, &options.ingest)?;
    quantize_pixels(&pixels, palette, options)
}

/// Same as [`quantize`] for an image that is already decoded. No size guards
/// are applied.
pub fn quantize_pixels(
    pixels: &PixelMatrix,
    palette: Option<&Palette>,
    options: &QuantizeOptions,
) -> Result<QuantizedImage> {
    let (width, height) = pixels.dimensions();
    let palette = palette.filter(|p| !p.is_empty());
    let plan = Plan::choose(
        palette.map_or(0, Palette::len),
        options.n_colors,
        options.metric,
        &options.cluster,
    );
    info!("quantizing {width}x{height} image: {plan:?}, metric {}", options.metric);

    let target = palette
        .and_then(|p| PaletteIndex::from_palette(p, options.metric).map(|index| (p, index)));

    match (plan, target) {
        (Plan::MatchPixels, Some((palette, index))) => {
            let labels = index.match_pixels(pixels);
            rebuild(&labels, Codebook::Palette(palette.colors()), width, height)
        }
        (Plan::ClusterThenMatch { k }, Some((palette, index))) => {
            let clustering = reduce(pixels, k, &options.cluster);
            let matches = index.match_points(&clustering.centroids);
            let labels = compose(&clustering.labels, &matches)?;
            rebuild(&labels, Codebook::Palette(palette.colors()), width, height)
        }
        (plan, _) => {
            let k = plan.cluster_k().unwrap_or(options.cluster.default_colors);
            let clustering = reduce(pixels, k, &options.cluster);
            rebuild(
                &clustering.labels,
                Codebook::Centroids(&clustering.centroids),
                width,
                height,
            )
        }
    }
}
