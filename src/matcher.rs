use std::collections::HashMap;

use palette::{Lab, Srgb};

use crate::color::Palette;
use crate::colorspace::{Metric, delta_e, euclidean_sq, rgb_to_lab, to_normalized};
use crate::error::{Error, Result};
use crate::ingest::PixelMatrix;

/// A non-empty set of target colors prepared for nearest-neighbour search
/// under one metric.
///
/// For [`Metric::DeltaE`] the targets are converted to Lab once here instead
/// of once per comparison.
#[derive(Clone, Debug)]
pub struct PaletteIndex {
    metric: Metric,
    rgb: Vec<Srgb<f32>>,
    lab: Vec<Lab>,
}

impl PaletteIndex {
    /// `None` when `targets` is empty: there is nothing to match against.
    pub fn new(targets: Vec<Srgb<f32>>, metric: Metric) -> Option<Self> {
        if targets.is_empty() {
            return None;
        }
        let lab = match metric {
            Metric::Euclidean => Vec::new(),
            Metric::DeltaE => targets.iter().copied().map(rgb_to_lab).collect(),
        };
        Some(Self {
            metric,
            rgb: targets,
            lab,
        })
    }

    pub fn from_palette(palette: &Palette, metric: Metric) -> Option<Self> {
        Self::new(palette.iter().map(|c| c.to_srgb()).collect(), metric)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.rgb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }

    /// Index of the closest target. Ties go to the earliest target.
    pub fn nearest(&self, point: Srgb<f32>) -> usize {
        match self.metric {
            Metric::Euclidean => argmin(self.rgb.iter().map(|t| euclidean_sq(point, *t))),
            Metric::DeltaE => {
                let lab = rgb_to_lab(point);
                argmin(self.lab.iter().map(|t| delta_e(lab, *t)))
            }
        }
    }

    /// Nearest target for every point, in order.
    pub fn match_points(&self, points: &[Srgb<f32>]) -> Vec<usize> {
        points.iter().map(|p| self.nearest(*p)).collect()
    }

    /// Nearest target for every pixel, row-major.
    ///
    /// Each distinct RGB value is searched once; photos repeat colors heavily.
    pub fn match_pixels(&self, image: &PixelMatrix) -> Vec<usize> {
        let mut cache: HashMap<[u8; 3], usize> = HashMap::new();
        image
            .pixels()
            .map(|px| {
                *cache
                    .entry(px.0)
                    .or_insert_with(|| self.nearest(to_normalized(px.0)))
            })
            .collect()
    }
}

fn argmin(distances: impl Iterator<Item = f32>) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, dist) in distances.enumerate() {
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

/// Label of every point's nearest palette entry under `metric`.
///
/// Returns `None` for an empty palette.
pub fn match_points(points: &[Srgb<f32>], palette: &Palette, metric: Metric) -> Option<Vec<usize>> {
    PaletteIndex::from_palette(palette, metric).map(|index| index.match_points(points))
}

/// Re-express per-pixel cluster labels as per-pixel palette labels, given the
/// palette label each cluster centroid matched.
pub fn compose(cluster_labels: &[usize], centroid_matches: &[usize]) -> Result<Vec<usize>> {
    cluster_labels
        .iter()
        .map(|&cluster| {
            centroid_matches
                .get(cluster)
                .copied()
                .ok_or(Error::LabelOutOfBounds {
                    label: cluster,
                    len: centroid_matches.len(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use image::{Rgb, RgbImage};

    fn primaries() -> Palette {
        Palette::new(vec![
            Color::new(255, 0, 0, "red", "ABC Paints"),
            Color::new(255, 255, 0, "yellow", "ABC Paints"),
            Color::new(0, 255, 0, "green", "ABC Paints"),
            Color::new(0, 0, 255, "blue", "ABC Paints"),
        ])
    }

    #[test]
    fn empty_palette_has_no_index() {
        assert!(PaletteIndex::from_palette(&Palette::default(), Metric::Euclidean).is_none());
        assert!(match_points(&[to_normalized([1, 2, 3])], &Palette::default(), Metric::DeltaE).is_none());
    }

    #[test]
    fn exact_colors_match_themselves() {
        let palette = primaries();
        let points: Vec<_> = palette.iter().map(Color::to_srgb).collect();
        for metric in [Metric::Euclidean, Metric::DeltaE] {
            assert_eq!(match_points(&points, &palette, metric), Some(vec![0, 1, 2, 3]));
        }
    }

    #[test]
    fn ties_go_to_first_entry() {
        let palette = Palette::new(vec![
            Color::new(0, 0, 0, "black", "A"),
            Color::new(0, 0, 0, "black", "B"),
            Color::new(255, 255, 255, "white", "A"),
        ]);
        let index = PaletteIndex::from_palette(&palette, Metric::Euclidean).unwrap();
        assert_eq!(index.nearest(to_normalized([10, 10, 10])), 0);

        let two = Palette::from_hex_list(&["000000", "000002"]).unwrap();
        let index = PaletteIndex::from_palette(&two, Metric::Euclidean).unwrap();
        assert_eq!(index.nearest(to_normalized([0, 0, 1])), 0);
    }

    #[test]
    fn matching_is_repeatable() {
        let palette = primaries();
        let points: Vec<_> = (0..=255u8)
            .step_by(15)
            .map(|v| to_normalized([v, 255 - v, v / 3]))
            .collect();
        for metric in [Metric::Euclidean, Metric::DeltaE] {
            let first = match_points(&points, &palette, metric);
            for _ in 0..3 {
                assert_eq!(match_points(&points, &palette, metric), first);
            }
        }
    }

    #[test]
    fn metrics_can_disagree() {
        // Sage green is closer to the pink in RGB but perceptually to the teal.
        let palette = Palette::new(vec![
            Color::new(205, 140, 150, "pink", "ABC Paints"),
            Color::new(35, 200, 160, "teal", "ABC Paints"),
        ]);
        let sage = [to_normalized([160, 185, 140])];
        assert_eq!(match_points(&sage, &palette, Metric::Euclidean), Some(vec![0]));
        assert_eq!(match_points(&sage, &palette, Metric::DeltaE), Some(vec![1]));
    }

    #[test]
    fn pixel_matching_agrees_with_point_matching() {
        let palette = primaries();
        let img = RgbImage::from_fn(8, 4, |x, y| Rgb([(x * 30) as u8, (y * 60) as u8, 200]));
        let points: Vec<_> = img.pixels().map(|p| to_normalized(p.0)).collect();
        let index = PaletteIndex::from_palette(&palette, Metric::DeltaE).unwrap();
        assert_eq!(index.match_pixels(&img), index.match_points(&points));
    }

    #[test]
    fn compose_substitutes_cluster_ids() {
        let clusters = [0, 1, 2, 1, 0];
        let matches = [3, 0, 3];
        assert_eq!(compose(&clusters, &matches).unwrap(), vec![3, 0, 3, 0, 3]);
    }

    #[test]
    fn compose_rejects_unknown_cluster() {
        let err = compose(&[0, 2], &[1, 1]).unwrap_err();
        assert!(matches!(err, Error::LabelOutOfBounds { label: 2, len: 2 }));
    }
}
