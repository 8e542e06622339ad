//! Scale estimation capability.
//!
//! Scale search is a separate estimator the tracker consults once per frame;
//! the bundled [`FixedScale`] keeps the factor it was given.

use crate::types::{BoundingBox, Frame, Point2, Size2};
use serde::{Deserialize, Serialize};

/// Parameters handed to a scale estimator at initialisation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    /// Scale samples per search (odd)
    pub number_of_scales: usize,
    pub scale_sigma_factor: f64,
    pub scale_model_max_area: f64,
    pub scale_lr: f64,
    /// Ratio between neighbouring scale samples
    pub scale_step: f64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            number_of_scales: 33,
            scale_sigma_factor: 0.25,
            scale_model_max_area: 512.0,
            scale_lr: 0.025,
            scale_step: 1.02,
        }
    }
}

/// Independent scale search.
pub trait ScaleEstimator: Send {
    /// Called once from tracker initialisation.
    fn init(&mut self, frame: &Frame, bbox: &BoundingBox, template: Size2, params: &ScaleParams);

    /// Current scale factor relative to the initial target size.
    fn get_scale(&mut self, frame: &Frame, center: Point2) -> f64;

    /// Learn from the frame at the final position.
    fn update(&mut self, frame: &Frame, center: Point2);
}

/// Estimator that never changes the scale.
#[derive(Clone, Debug)]
pub struct FixedScale {
    scale: f64,
    params: ScaleParams,
}

impl FixedScale {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            params: ScaleParams::default(),
        }
    }

    pub fn params(&self) -> &ScaleParams {
        &self.params
    }
}

impl Default for FixedScale {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ScaleEstimator for FixedScale {
    fn init(&mut self, _frame: &Frame, _bbox: &BoundingBox, _template: Size2, params: &ScaleParams) {
        self.params = *params;
    }

    fn get_scale(&mut self, _frame: &Frame, _center: Point2) -> f64 {
        self.scale
    }

    fn update(&mut self, _frame: &Frame, _center: Point2) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_scale_keeps_factor_and_params() {
        let frame = Frame::uniform(10, 10, 3, 0.0);
        let mut est = FixedScale::new(1.25);
        let params = ScaleParams {
            number_of_scales: 17,
            ..Default::default()
        };
        est.init(&frame, &BoundingBox::new(1.0, 1.0, 4.0, 4.0), Size2::new(8.0, 8.0), &params);
        assert_eq!(est.get_scale(&frame, Point2::new(3.0, 3.0)), 1.25);
        est.update(&frame, Point2::new(4.0, 4.0));
        assert_eq!(est.get_scale(&frame, Point2::new(4.0, 4.0)), 1.25);
        assert_eq!(est.params().number_of_scales, 17);
    }
}
