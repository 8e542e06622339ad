//! Spatial reliability mask: segmentation posterior thresholded, resized to
//! the feature grid and dilated, with a static rectangle as fallback.

use crate::{
    patch::{dilate_cross, get_subwindow, resize_nearest},
    prior::location_prior,
    segmentation::{RegionHistograms, Segmentation},
    types::{Frame, GridSize, PixelRect, Point2, RealMap, Size2},
};
use tracing::warn;

/// Minimum mask area, as a fraction of the default-mask area.
pub const MIN_MASK_AREA_RATIO: f64 = 0.05;

/// A finished mask on the feature grid.
#[derive(Clone, Debug)]
pub struct MaskOutcome {
    pub mask: RealMap,
    /// The default mask replaced a too-small segmentation mask
    pub fell_back: bool,
}

/// Builds spatial masks for one track; owns the default mask.
#[derive(Clone, Debug)]
pub struct MaskBuilder {
    grid: GridSize,
    default_mask: RealMap,
    default_area: f64,
}

impl MaskBuilder {
    /// `target_cells` is the target size on the feature grid (cols, rows).
    ///
    /// The default mask is exactly that many cells, centred on the grid
    /// (rounded towards the origin when the parities differ).
    pub fn new(grid: GridSize, target_cells: Size2) -> Self {
        let w = (target_cells.width.max(0.0) as usize).min(grid.cols);
        let h = (target_cells.height.max(0.0) as usize).min(grid.rows);
        let x0 = (grid.cols - w) / 2;
        let y0 = (grid.rows - h) / 2;
        let default_mask = RealMap::from_fn(grid.rows, grid.cols, |i, j| {
            if (y0..y0 + h).contains(&i) && (x0..x0 + w).contains(&j) {
                1.0
            } else {
                0.0
            }
        });
        let default_area = default_mask.sum();
        Self {
            grid,
            default_mask,
            default_area,
        }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn default_mask(&self) -> &RealMap {
        &self.default_mask
    }

    pub fn default_area(&self) -> f64 {
        self.default_area
    }

    /// Binary foreground mask over a `patch_w × patch_h` patch around `center`.
    ///
    /// Only the in-bounds part of the patch can be foreground.
    #[allow(clippy::too_many_arguments)]
    pub fn segment_region(
        &self,
        frame: &Frame,
        center: Point2,
        patch_w: usize,
        patch_h: usize,
        scaled_target: Size2,
        segmentation: &dyn Segmentation,
        model: &RegionHistograms,
    ) -> RealMap {
        let (patch, valid) = get_subwindow(frame, center, patch_w, patch_h);
        let size = patch.size();
        let prior = location_prior(
            PixelRect::new(0, 0, size.cols as i64, size.rows as i64),
            scaled_target,
            size,
        );
        let posterior = segmentation.posterior(&patch, &prior.foreground, &prior.background, model);

        let mut mask = RealMap::zeros(size.rows, size.cols);
        for i in 0..size.rows {
            for j in 0..size.cols {
                if valid.contains(j as i64, i as i64) {
                    mask[(i, j)] = posterior[(i, j)];
                }
            }
        }
        threshold_half_max(&mask)
    }

    /// Resize a patch mask to the grid; dilate it, or fall back to the
    /// default mask when it covers too little area.
    pub fn finalize(&self, patch_mask: &RealMap) -> MaskOutcome {
        let resized = resize_nearest(patch_mask, self.grid);
        let area = resized.sum();
        if area < MIN_MASK_AREA_RATIO * self.default_area {
            warn!(area, default_area = self.default_area, "segmentation mask too small, using default mask");
            MaskOutcome {
                mask: self.default_mask.clone(),
                fell_back: true,
            }
        } else {
            MaskOutcome {
                mask: dilate_cross(&resized),
                fell_back: false,
            }
        }
    }
}

/// Binary map: 1 where the value is strictly above half the maximum.
pub fn threshold_half_max(map: &RealMap) -> RealMap {
    let max = map.max();
    if max.is_nan() || max <= 0.0 {
        return RealMap::zeros(map.nrows(), map.ncols());
    }
    let t = max / 2.0;
    map.map(|v| if v > t { 1.0 } else { 0.0 })
}

/// Centre `preset` inside a zero map shaped like `mask` and multiply.
///
/// Returns `None` for an empty preset, which callers skip.
pub fn intersect_preset(mask: &RealMap, preset: &RealMap) -> Option<RealMap> {
    if preset.is_empty() || preset.iter().all(|v| *v == 0.0) {
        return None;
    }
    let (rows, cols) = mask.shape();
    let (pr, pc) = preset.shape();
    let sx = ((cols as f64 / 2.0 - pc as f64 / 2.0).floor() as i64 - 1).max(0) as usize;
    let sy = ((rows as f64 / 2.0 - pr as f64 / 2.0).floor() as i64 - 1).max(0) as usize;
    let padded = RealMap::from_fn(rows, cols, |i, j| {
        if i >= sy && j >= sx && i - sy < pr && j - sx < pc {
            preset[(i - sy, j - sx)]
        } else {
            0.0
        }
    });
    Some(mask.component_mul(&padded))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
