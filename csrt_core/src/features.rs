//! Feature extraction capability and the bundled extractor.
//!
//! Channel order is fixed: orientation histograms, colour names, gray, RGB.
//! The tracker multiplies every returned channel by its feature window.

use crate::{
    patch::resize_bilinear,
    types::{Frame, GridSize, RealMap},
};
use std::f64::consts::PI;
use tracing::warn;

/// Gradient magnitudes below this are treated as flat (interpolation noise).
const MIN_GRADIENT: f64 = 1e-6;

/// Produces an ordered list of real channel maps on `grid` from an image patch.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, patch: &Frame, grid: GridSize) -> Vec<RealMap>;
}

/// Which channels to produce and how.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSettings {
    pub use_hog: bool,
    pub use_color_names: bool,
    pub use_gray: bool,
    pub use_rgb: bool,
    /// Unsigned orientation bins (signed histograms use twice as many)
    pub hog_orientations: usize,
    /// Per-bin ceiling after normalisation
    pub hog_clip: f64,
    /// Leading orientation channels kept
    pub num_hog_channels_used: usize,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            use_hog: true,
            use_color_names: false,
            use_gray: true,
            use_rgb: false,
            hog_orientations: 9,
            hog_clip: 0.15,
            num_hog_channels_used: 18,
        }
    }
}

// ---------------------------------------------------------------------------
// Bundled extractor
// ---------------------------------------------------------------------------

/// Gradient-orientation histograms, gray and RGB channels.
///
/// Colour names need an external lookup table; a request for them is logged
/// once and skipped.
#[derive(Clone, Debug)]
pub struct BasicFeatureExtractor {
    settings: FeatureSettings,
}

impl BasicFeatureExtractor {
    pub fn new(settings: FeatureSettings) -> Self {
        if settings.use_color_names {
            warn!("colour-name features are not bundled; channel group skipped");
        }
        Self { settings }
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }
}

impl FeatureExtractor for BasicFeatureExtractor {
    fn extract(&self, patch: &Frame, grid: GridSize) -> Vec<RealMap> {
        let s = &self.settings;
        let mut out = Vec::new();
        if s.use_hog {
            let hog = orientation_histograms(patch, grid, s.hog_orientations, s.hog_clip);
            let keep = s.num_hog_channels_used.min(hog.len());
            out.extend(hog.into_iter().take(keep));
        }
        if s.use_gray {
            out.push(normalise_intensity(&resize_bilinear(&patch.luma(), grid)));
        }
        if s.use_rgb {
            let color = patch.to_color();
            out.extend(
                color
                    .channels()
                    .iter()
                    .take(3)
                    .map(|c| normalise_intensity(&resize_bilinear(c, grid))),
            );
        }
        out
    }
}

/// Map `[0, 255]` intensities to `[-0.5, 0.5]`.
fn normalise_intensity(map: &RealMap) -> RealMap {
    map.map(|v| v / 255.0 - 0.5)
}

// ---------------------------------------------------------------------------
// Orientation histograms
// ---------------------------------------------------------------------------

/// Cell-pooled gradient-orientation histograms on `grid`.
///
/// Returns `2·orientations` signed bins followed by `orientations` unsigned
/// bins. Each pixel votes its gradient magnitude (strongest colour plane) into
/// the cell containing it. Cells are L2-normalised over all bins and clipped.
pub fn orientation_histograms(patch: &Frame, grid: GridSize, orientations: usize, clip: f64) -> Vec<RealMap> {
    let orientations = orientations.max(1);
    let signed_bins = 2 * orientations;
    let total = signed_bins + orientations;
    let mut hist = vec![RealMap::zeros(grid.rows, grid.cols); total];
    if grid.area() == 0 {
        return hist;
    }

    let (rows, cols) = (patch.height(), patch.width());
    for i in 0..rows {
        let ci = (i * grid.rows / rows).min(grid.rows - 1);
        for j in 0..cols {
            let cj = (j * grid.cols / cols).min(grid.cols - 1);
            let (gx, gy) = strongest_gradient(patch, i, j);
            let mag = (gx * gx + gy * gy).sqrt();
            if mag < MIN_GRADIENT {
                continue;
            }
            let angle = gy.atan2(gx).rem_euclid(2.0 * PI);
            let signed = ((angle / (2.0 * PI) * signed_bins as f64) as usize).min(signed_bins - 1);
            hist[signed][(ci, cj)] += mag;
            hist[signed_bins + signed % orientations][(ci, cj)] += mag;
        }
    }

    for ci in 0..grid.rows {
        for cj in 0..grid.cols {
            let norm = hist.iter().map(|h| h[(ci, cj)].powi(2)).sum::<f64>().sqrt();
            if norm <= f64::EPSILON {
                continue;
            }
            for h in hist.iter_mut() {
                h[(ci, cj)] = (h[(ci, cj)] / norm).min(clip);
            }
        }
    }
    hist
}

/// Central-difference gradient of the colour plane with the largest magnitude.
fn strongest_gradient(patch: &Frame, i: usize, j: usize) -> (f64, f64) {
    let (rows, cols) = (patch.height(), patch.width());
    let (up, down) = (i.saturating_sub(1), (i + 1).min(rows - 1));
    let (left, right) = (j.saturating_sub(1), (j + 1).min(cols - 1));
    patch
        .channels()
        .iter()
        .map(|c| (c[(i, right)] - c[(i, left)], c[(down, j)] - c[(up, j)]))
        .fold((0.0, 0.0), |best, g| {
            if g.0 * g.0 + g.1 * g.1 > best.0 * best.0 + best.1 * best.1 {
                g
            } else {
                best
            }
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn settings(hog: bool, gray: bool, rgb: bool) -> FeatureSettings {
        FeatureSettings {
            use_hog: hog,
            use_color_names: false,
            use_gray: gray,
            use_rgb: rgb,
            ..Default::default()
        }
    }

    #[test]
    fn channel_count_follows_settings() {
        let patch = Frame::uniform(32, 32, 3, 100.0);
        let grid = GridSize::new(8, 8);
        let all = BasicFeatureExtractor::new(settings(true, true, true)).extract(&patch, grid);
        assert_eq!(all.len(), 18 + 1 + 3);
        let gray = BasicFeatureExtractor::new(settings(false, true, false)).extract(&patch, grid);
        assert_eq!(gray.len(), 1);
        assert!(all.iter().all(|c| GridSize::of(c) == grid));
    }

    #[test]
    fn color_names_alone_yield_no_channels() {
        let s = FeatureSettings {
            use_hog: false,
            use_color_names: true,
            use_gray: false,
            use_rgb: false,
            ..Default::default()
        };
        let out = BasicFeatureExtractor::new(s).extract(&Frame::uniform(8, 8, 3, 0.0), GridSize::new(4, 4));
        assert!(out.is_empty());
    }

    #[test]
    fn gray_channel_is_centered_intensity() {
        let patch = Frame::uniform(16, 16, 1, 255.0);
        let out = BasicFeatureExtractor::new(settings(false, true, false)).extract(&patch, GridSize::new(4, 4));
        assert_abs_diff_eq!(out[0][(2, 2)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn flat_patch_has_empty_histograms() {
        let patch = Frame::uniform(16, 16, 3, 42.0);
        let hog = orientation_histograms(&patch, GridSize::new(4, 4), 9, 0.2);
        assert_eq!(hog.len(), 27);
        assert!(hog.iter().all(|h| h.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn horizontal_ramp_votes_into_zero_orientation() {
        let ramp = RealMap::from_fn(16, 16, |_, j| j as f64 * 10.0);
        let patch = Frame::gray(ramp).unwrap();
        let hog = orientation_histograms(&patch, GridSize::new(4, 4), 9, 1.0);
        // Gradient points along +x: signed bin 0 and unsigned bin 0.
        assert!(hog[0][(1, 1)] > 0.0);
        assert!(hog[18][(1, 1)] > 0.0);
        assert_abs_diff_eq!(hog[5][(1, 1)], 0.0);
        assert!(hog.iter().all(|h| h.iter().all(|v| *v <= 1.0)));
    }
}
