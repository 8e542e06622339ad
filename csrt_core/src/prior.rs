//! Epanechnikov location prior over a search patch.

use crate::types::{GridSize, PixelRect, RealMap, Size2};

/// Lower and upper clamp of the foreground prior.
pub const PRIOR_MIN: f64 = 0.5;
pub const PRIOR_MAX: f64 = 0.9;

/// Foreground prior and its complement.
#[derive(Clone, Debug)]
pub struct LocationPrior {
    pub foreground: RealMap,
    pub background: RealMap,
}

/// Epanechnikov profile `max(0, 1 − u)`.
fn kernel_epan(u: f64) -> f64 {
    (1.0 - u).max(0.0)
}

/// Kernel-weighted prior centred on `roi`, over a patch of size `patch`.
///
/// The kernel radius is `floor(min(target.width, target.height))` on both axes.
/// Values are normalised by the maximum and clamped to
/// `[PRIOR_MIN, PRIOR_MAX]`; pixels outside the clipped `roi` get `PRIOR_MIN`.
pub fn location_prior(roi: PixelRect, target: Size2, patch: GridSize) -> LocationPrior {
    let max_x = patch.cols as i64 - 1;
    let max_y = patch.rows as i64 - 1;
    let x1 = roi.x.clamp(0, max_x);
    let y1 = roi.y.clamp(0, max_y);
    let x2 = (roi.x + roi.width - 1).clamp(0, max_x);
    let y2 = (roi.y + roi.height - 1).clamp(0, max_y);

    let radius = target.width.min(target.height).floor().max(0.0);
    let bandwidth = 1.0 / (0.5 * radius * std::f64::consts::SQRT_2 + 1.0);
    let cx = x1 as f64 + (x2 - x1) as f64 / 2.0;
    let cy = y1 as f64 + (y2 - y1) as f64 / 2.0;

    let mut weights = RealMap::zeros(patch.rows, patch.cols);
    for y in y1..=y2 {
        let dy = ((cy - y as f64) * bandwidth).powi(2);
        for x in x1..=x2 {
            let dx = ((cx - x as f64) * bandwidth).powi(2);
            weights[(y as usize, x as usize)] = kernel_epan(dx + dy);
        }
    }

    let max = weights.max();
    let foreground = weights.map(|w| {
        let v = if max > 0.0 { w / max } else { 0.0 };
        v.clamp(PRIOR_MIN, PRIOR_MAX)
    });
    let background = foreground.map(|v| 1.0 - v);
    LocationPrior { foreground, background }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn prior_is_bounded_and_peaks_at_center() {
        let grid = GridSize::new(40, 50);
        let p = location_prior(PixelRect::new(0, 0, 50, 40), Size2::new(12.0, 10.0), grid);
        assert!(p.foreground.iter().all(|v| (PRIOR_MIN..=PRIOR_MAX).contains(v)));
        assert_abs_diff_eq!(p.foreground[(20, 25)], PRIOR_MAX);
        assert_abs_diff_eq!(p.foreground[(0, 0)], PRIOR_MIN);
        assert_abs_diff_eq!(p.background[(20, 25)], 1.0 - PRIOR_MAX, epsilon = 1e-12);
    }

    #[test]
    fn rectangle_outside_patch_is_clipped() {
        let grid = GridSize::new(10, 10);
        let p = location_prior(PixelRect::new(-5, -5, 100, 100), Size2::new(4.0, 4.0), grid);
        assert_eq!(GridSize::of(&p.foreground), grid);
        assert!(p.foreground.iter().all(|v| (PRIOR_MIN..=PRIOR_MAX).contains(v)));
    }

    #[test]
    fn pixels_outside_roi_take_lower_clamp() {
        let grid = GridSize::new(20, 20);
        let p = location_prior(PixelRect::new(5, 5, 10, 10), Size2::new(30.0, 30.0), grid);
        assert_abs_diff_eq!(p.foreground[(1, 1)], PRIOR_MIN);
        assert!(p.foreground[(10, 10)] > PRIOR_MIN);
    }
}
