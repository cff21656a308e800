use std::collections::HashMap;

use kmeans_colors::get_kmeans;
use log::{debug, info};
use palette::Srgb;

use crate::colorspace::{Metric, euclidean_sq, to_normalized};
use crate::ingest::PixelMatrix;
use crate::matcher::PaletteIndex;

pub const DEFAULT_MAX_CLUSTERS: usize = 150;
pub const DEFAULT_COLORS: usize = 50;

// kmeans_colors reports assignments as u8.
const KMEANS_LABEL_LIMIT: usize = u8::MAX as usize + 1;

/// Tuning for the k-means reduction step.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterConfig {
    /// Upper bound for `k`, whatever the caller asks for.
    pub max_clusters: usize,
    /// `k` used when there is no palette and the caller did not pick one.
    pub default_colors: usize,
    pub max_iter: usize,
    pub converge: f32,
    /// Training runs on at most `k * max_points_per_centroid` pixels,
    /// sampled evenly. Every pixel is still labelled.
    pub max_points_per_centroid: usize,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_clusters: DEFAULT_MAX_CLUSTERS,
            default_colors: DEFAULT_COLORS,
            max_iter: 20,
            converge: 1e-4,
            max_points_per_centroid: 256,
            seed: 0,
        }
    }
}

impl ClusterConfig {
    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn with_default_colors(mut self, default_colors: usize) -> Self {
        self.default_colors = default_colors;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `k` actually used for a request of `requested` clusters.
    pub fn clamp_k(&self, requested: usize) -> usize {
        let cap = self.max_clusters.clamp(1, KMEANS_LABEL_LIMIT);
        requested.clamp(1, cap)
    }
}

/// Per-pixel cluster labels and the centroid of every cluster, in normalized
/// sRGB. Every centroid owns at least one pixel.
#[derive(Clone, Debug)]
pub struct Clustering {
    pub labels: Vec<usize>,
    pub centroids: Vec<Srgb<f32>>,
}

impl Clustering {
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}

/// Collapse the colors of `pixels` to at most `k` representatives.
///
/// Images with no more than `k` distinct colors are not clustered at all:
/// each distinct color becomes its own centroid. Otherwise k-means picks the
/// centroids, each pixel is labelled with its nearest centroid, and exactly
/// `k` clusters come back.
pub fn reduce(pixels: &PixelMatrix, k: usize, config: &ClusterConfig) -> Clustering {
    let k = config.clamp_k(k);
    let (colors, color_of_pixel) = distinct_colors(pixels);

    if colors.len() <= k {
        debug!("image has {} distinct colors, skipping k-means", colors.len());
        return Clustering {
            labels: color_of_pixel,
            centroids: colors,
        };
    }

    let samples = training_set(pixels, k * config.max_points_per_centroid.max(1));
    info!(
        "running k-means with k = {k} on {} of {} pixels",
        samples.len(),
        pixels.width() as usize * pixels.height() as usize
    );
    let kmeans = get_kmeans(
        k,
        config.max_iter,
        config.converge,
        false,
        &samples,
        config.seed,
    );
    debug!("k-means score {}", kmeans.score);

    let (centroids, color_labels) = fill_clusters(&colors, kmeans.centroids, k);
    Clustering {
        labels: color_of_pixel
            .into_iter()
            .map(|color| color_labels[color])
            .collect(),
        centroids,
    }
}

/// Distinct colors of `pixels` in order of first appearance, and the index of
/// every pixel's color in that list.
fn distinct_colors(pixels: &PixelMatrix) -> (Vec<Srgb<f32>>, Vec<usize>) {
    let mut ids: HashMap<[u8; 3], usize> = HashMap::new();
    let mut colors = Vec::new();
    let mut labels = Vec::with_capacity(pixels.width() as usize * pixels.height() as usize);

    for px in pixels.pixels() {
        let next = ids.len();
        let id = *ids.entry(px.0).or_insert(next);
        if id == next {
            colors.push(to_normalized(px.0));
        }
        labels.push(id);
    }

    (colors, labels)
}

fn training_set(pixels: &PixelMatrix, limit: usize) -> Vec<Srgb<f32>> {
    let total = pixels.width() as usize * pixels.height() as usize;
    let step = total.div_ceil(limit.max(1)).max(1);
    pixels
        .pixels()
        .step_by(step)
        .map(|px| to_normalized(px.0))
        .collect()
}

/// Label every color with its nearest centroid and bring the number of
/// non-empty clusters up to `k`.
///
/// k-means trained on a sample can leave clusters empty, or return fewer
/// usable centroids than asked for. Each missing cluster is reseeded with the
/// color farthest from its current centroid, then all colors are relabelled.
/// Requires `colors.len() > k`.
fn fill_clusters(
    colors: &[Srgb<f32>],
    mut centroids: Vec<Srgb<f32>>,
    k: usize,
) -> (Vec<Srgb<f32>>, Vec<usize>) {
    if centroids.is_empty() {
        centroids.extend(colors.first().copied());
    }
    let mut labels = nearest_centroids(colors, &centroids);
    compact(&mut centroids, &mut labels);

    let mut reseeded = 0;
    while centroids.len() < k {
        let farthest = colors
            .iter()
            .zip(&labels)
            .map(|(color, &label)| euclidean_sq(*color, centroids[label]))
            .enumerate()
            .filter(|&(_, dist)| dist > 0.0)
            .fold(None, |best: Option<(usize, f32)>, (idx, dist)| match best {
                Some((_, best_dist)) if best_dist >= dist => best,
                _ => Some((idx, dist)),
            });
        // Every color sits on a centroid: there are no more colors to split off.
        let Some((idx, _)) = farthest else { break };

        centroids.push(colors[idx]);
        labels = nearest_centroids(colors, &centroids);
        compact(&mut centroids, &mut labels);
        reseeded += 1;
    }
    if reseeded > 0 {
        debug!("reseeded {reseeded} clusters to reach k = {k}");
    }

    (centroids, labels)
}

fn nearest_centroids(colors: &[Srgb<f32>], centroids: &[Srgb<f32>]) -> Vec<usize> {
    match PaletteIndex::new(centroids.to_vec(), Metric::Euclidean) {
        Some(index) => index.match_points(colors),
        // k >= 1 always yields at least one centroid
        None => Vec::new(),
    }
}

/// Drop the centroids no color is labelled with and renumber the rest.
fn compact(centroids: &mut Vec<Srgb<f32>>, labels: &mut [usize]) {
    let mut used = vec![false; centroids.len()];
    for &label in labels.iter() {
        used[label] = true;
    }

    let mut remap = vec![usize::MAX; centroids.len()];
    let mut kept = 0;
    for (old, &is_used) in used.iter().enumerate() {
        if is_used {
            remap[old] = kept;
            kept += 1;
        }
    }
    if kept < centroids.len() {
        debug!("dropped {} empty clusters", centroids.len() - kept);
    }

    let mut old = 0;
    centroids.retain(|_| {
        old += 1;
        used[old - 1]
    });
    for label in labels.iter_mut() {
        *label = remap[*label];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorspace::{euclidean_sq, to_rgb8};
    use image::{Rgb, RgbImage};

    fn four_blocks() -> RgbImage {
        RgbImage::from_fn(40, 40, |x, y| match (x < 20, y < 20) {
            (true, true) => Rgb([255, 0, 0]),
            (false, true) => Rgb([255, 255, 0]),
            (true, false) => Rgb([0, 0, 255]),
            (false, false) => Rgb([0, 255, 0]),
        })
    }

    fn gradient() -> RgbImage {
        RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8]))
    }

    #[test]
    fn k_is_clamped() {
        let config = ClusterConfig::default();
        assert_eq!(config.clamp_k(0), 1);
        assert_eq!(config.clamp_k(10), 10);
        assert_eq!(config.clamp_k(10_000), DEFAULT_MAX_CLUSTERS);
        assert_eq!(config.clone().with_max_clusters(1000).clamp_k(1000), 256);
        assert_eq!(config.with_max_clusters(0).clamp_k(5), 1);
    }

    #[test]
    fn few_distinct_colors_are_kept_exactly() {
        let img = four_blocks();
        let result = reduce(&img, 50, &ClusterConfig::default());

        assert_eq!(result.len(), 4);
        assert_eq!(result.labels.len(), 1600);
        for (px, &label) in img.pixels().zip(&result.labels) {
            assert_eq!(to_rgb8(result.centroids[label]), px.0);
        }
    }

    #[test]
    fn solid_image_is_one_cluster() {
        let img = RgbImage::from_pixel(7, 3, Rgb([12, 34, 56]));
        let result = reduce(&img, 8, &ClusterConfig::default());
        assert_eq!(result.len(), 1);
        assert!(result.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn kmeans_respects_k_and_labels_every_pixel() {
        let img = gradient();
        let result = reduce(&img, 6, &ClusterConfig::default());

        assert_eq!(result.len(), 6);
        assert_eq!(result.labels.len(), 64 * 48);
        assert!(result.labels.iter().all(|&l| l < result.len()));

        let mut seen = vec![false; result.len()];
        for &l in &result.labels {
            seen[l] = true;
        }
        assert!(seen.into_iter().all(|s| s), "every centroid owns a pixel");
    }

    #[test]
    fn labels_point_at_nearest_centroid() {
        let img = gradient();
        let result = reduce(&img, 5, &ClusterConfig::default());

        for (px, &label) in img.pixels().zip(&result.labels) {
            let p = to_normalized(px.0);
            let own = euclidean_sq(p, result.centroids[label]);
            for c in &result.centroids {
                assert!(own <= euclidean_sq(p, *c));
            }
        }
    }

    /// A large flat background with a scattering of rare colors: a strided
    /// sample sees almost none of them, yet `k` clusters must come back.
    fn speckled(rare: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(600, 600, Rgb([10, 10, 10]));
        for x in 0..rare {
            img.put_pixel(x, 599, Rgb([20 + (x % 200) as u8, (x * 7 % 256) as u8, 200]));
        }
        img
    }

    #[test]
    fn rare_colors_still_fill_k_clusters() {
        let img = speckled(200);
        let result = reduce(&img, 150, &ClusterConfig::default());

        assert_eq!(result.len(), 150);
        assert_eq!(result.labels.len(), 600 * 600);
        let mut owned = vec![0usize; result.len()];
        for &l in &result.labels {
            owned[l] += 1;
        }
        assert!(owned.iter().all(|&n| n > 0), "every centroid owns a pixel");

        for (px, &label) in img.pixels().zip(&result.labels) {
            let p = to_normalized(px.0);
            let own = euclidean_sq(p, result.centroids[label]);
            assert!(result.centroids.iter().all(|c| own <= euclidean_sq(p, *c)));
        }
    }

    #[test]
    fn fill_clusters_reseeds_from_the_farthest_color() {
        let colors: Vec<_> = [[0, 0, 0], [10, 0, 0], [200, 200, 200], [255, 255, 255]]
            .into_iter()
            .map(to_normalized)
            .collect();
        // Two identical centroids: the second one never wins a color.
        let start = vec![to_normalized([5, 0, 0]), to_normalized([5, 0, 0])];

        let (centroids, labels) = fill_clusters(&colors, start, 3);
        assert_eq!(centroids.len(), 3);
        assert!(centroids.contains(&to_normalized([255, 255, 255])));
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
        assert_ne!(labels[2], labels[3]);
    }

    #[test]
    fn fill_clusters_stops_when_colors_run_out() {
        let colors = vec![to_normalized([0, 0, 0]), to_normalized([255, 0, 0])];
        let (centroids, labels) = fill_clusters(&colors, Vec::new(), 5);
        assert_eq!(centroids.len(), 2);
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn training_set_is_bounded() {
        let img = gradient();
        assert_eq!(training_set(&img, 1_000_000).len(), 64 * 48);
        assert!(training_set(&img, 100).len() <= 100);
        assert!(!training_set(&img, 1).is_empty());
    }
}
