//! Tracking metrics: center error, overlap, precision and success rates.

use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};

/// Center-error threshold of the precision score (pixels).
pub const PRECISION_THRESHOLD_PX: f64 = 20.0;
/// Overlap threshold of the success score.
pub const SUCCESS_IOU: f64 = 0.5;

/// Per-frame comparison of a predicted box with ground truth.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FrameScore {
    pub frame: u64,
    pub center_error: f64,
    pub iou: f64,
}

impl FrameScore {
    pub fn new(frame: u64, predicted: &BoundingBox, truth: &BoundingBox) -> Self {
        Self {
            frame,
            center_error: predicted.center().distance(&truth.center()),
            iou: predicted.iou(truth),
        }
    }
}

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackingMetrics {
    /// Number of frames evaluated
    pub n_frames: u64,
    /// Sum of center errors (for the mean)
    pub sum_center_err: f64,
    /// Sum of squared center errors (for RMSE)
    pub sum_sq_center_err: f64,
    pub sum_iou: f64,
    /// Frames with center error within [`PRECISION_THRESHOLD_PX`]
    pub precise_frames: u64,
    /// Frames with IoU above [`SUCCESS_IOU`]
    pub successful_frames: u64,
    /// Frames on which the detector filter was engaged
    pub drift_frames: u64,
    pub max_center_err: f64,
}

impl TrackingMetrics {
    /// Accumulate one frame's comparison.
    pub fn accumulate(&mut self, predicted: &BoundingBox, truth: &BoundingBox, drift: bool) -> FrameScore {
        let score = FrameScore::new(self.n_frames, predicted, truth);
        self.n_frames += 1;
        self.sum_center_err += score.center_error;
        self.sum_sq_center_err += score.center_error * score.center_error;
        self.sum_iou += score.iou;
        self.max_center_err = self.max_center_err.max(score.center_error);
        if score.center_error <= PRECISION_THRESHOLD_PX {
            self.precise_frames += 1;
        }
        if score.iou > SUCCESS_IOU {
            self.successful_frames += 1;
        }
        if drift {
            self.drift_frames += 1;
        }
        score
    }

    pub fn mean_center_error(&self) -> f64 {
        if self.n_frames == 0 {
            return 0.0;
        }
        self.sum_center_err / self.n_frames as f64
    }

    /// Root-mean-square center error (pixels).
    pub fn rmse_center(&self) -> f64 {
        if self.n_frames == 0 {
            return 0.0;
        }
        (self.sum_sq_center_err / self.n_frames as f64).sqrt()
    }

    pub fn mean_iou(&self) -> f64 {
        if self.n_frames == 0 {
            return 0.0;
        }
        self.sum_iou / self.n_frames as f64
    }

    /// Fraction of frames within 20 px of the true center.
    pub fn precision(&self) -> f64 {
        if self.n_frames == 0 { 1.0 } else { self.precise_frames as f64 / self.n_frames as f64 }
    }

    /// Fraction of frames with IoU above 0.5.
    pub fn success_rate(&self) -> f64 {
        if self.n_frames == 0 { 1.0 } else { self.successful_frames as f64 / self.n_frames as f64 }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
