//! Confidence-gated tracker/detector arbitration.
//!
//! Every frame the tracking response is scored by a peak-sharpness measure.
//! The score times the peak height is compared with a rolling baseline; a
//! ratio at or above the threshold suspends filter adaptation and instead
//! blends a detector filter from the initial snapshot and the current
//! tracking filter.

use crate::{
    spectral::blend,
    types::{RealMap, Spectrum},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Index;

/// Ceiling of the sharpness score on the tracking response.
pub const TRACKING_SHARPNESS_CEILING: f64 = 1000.0;
/// Ceiling of the sharpness score on the detector response.
pub const DETECTOR_SHARPNESS_CEILING: f64 = 10_000.0;

/// Below this magnitude the sharpness score is replaced by the
/// peak-to-mean ratio.
const DEGENERATE_SCORE: f64 = 1e-6;

/// Thresholds and shape constants of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceParams {
    /// Ratio at which drift is suspected
    pub threshold: f64,
    /// Distance penalty κ
    pub kappa: f64,
    /// Exponent bias
    pub bias: f64,
    /// Rolling baseline length
    pub history_len: usize,
    /// Decay αD of the detector blend factor
    pub detector_decay: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            threshold: 3.006125,
            kappa: 11.01,
            bias: 0.3625,
            history_len: 100,
            detector_decay: 0.1,
        }
    }
}

/// Per-frame decision of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    /// Retrain and adapt the tracking filter
    Adapting,
    /// Freeze adaptation and consult the detector filter
    DriftSuspected,
}

// ---------------------------------------------------------------------------
// Sharpness
// ---------------------------------------------------------------------------

/// Circular shift by half the dimensions (`out(i, j) = map(i + r/2, j + c/2)`).
///
/// An involution for even-sized maps.
pub fn recenter(map: &RealMap) -> RealMap {
    let (rows, cols) = map.shape();
    RealMap::from_fn(rows, cols, |i, j| map[((i + rows / 2) % rows, (j + cols / 2) % cols)])
}

/// Peak-sharpness score of a response.
///
/// The peak position and height come from `response` itself; pixel values are
/// read from its re-centred copy. Every pixel other than the peak position, at
/// squared distance `d²` from it, gives
/// `exp(bias + peak − v) / (1 − exp(−κ/√area · d²))`; the score is the smallest
/// candidate, at most `ceiling`. A score that vanishes falls back to
/// `(peak − mean)/(std + 1e-5)`.
pub fn sharpness(response: &RealMap, box_area: f64, kappa: f64, bias: f64, ceiling: f64) -> f64 {
    let (rows, cols) = response.shape();
    let (mut pr, mut pc, mut peak) = (0, 0, f64::NEG_INFINITY);
    for i in 0..rows {
        for j in 0..cols {
            if response[(i, j)] > peak {
                (pr, pc, peak) = (i, j, response[(i, j)]);
            }
        }
    }

    let centred = recenter(response);
    let rate = kappa / box_area.max(f64::MIN_POSITIVE).sqrt();
    let mut score = ceiling;
    for i in 0..rows {
        for j in 0..cols {
            if (i, j) == (pr, pc) {
                continue;
            }
            let di = i as f64 - pr as f64;
            let dj = j as f64 - pc as f64;
            let candidate = (bias + (peak - centred[(i, j)])).exp() / (1.0 - (-rate * (di * di + dj * dj)).exp());
            if candidate < score {
                score = candidate;
            }
        }
    }

    if score.abs() < DEGENERATE_SCORE {
        let n = (rows * cols).max(1) as f64;
        let mean = response.sum() / n;
        let var = response.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        score = (peak - mean) / (var.sqrt() + 1e-5);
    }
    score
}

// ---------------------------------------------------------------------------
// Confidence history
// ---------------------------------------------------------------------------

/// Outcome of feeding one statistic to the monitor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assessment {
    pub statistic: f64,
    /// Rolling mean including this frame's statistic
    pub baseline: f64,
    pub ratio: f64,
    pub state: TrackState,
}

/// Rolling baseline of the confidence statistic plus the drift counter.
#[derive(Clone, Debug)]
pub struct ConfidenceMonitor {
    params: ConfidenceParams,
    history: VecDeque<f64>,
    updates: u64,
    drift_count: u32,
    blend: f64,
}

impl ConfidenceMonitor {
    pub fn new(params: ConfidenceParams) -> Self {
        Self {
            params,
            history: VecDeque::with_capacity(params.history_len + 1),
            updates: 0,
            drift_count: 0,
            blend: 1.0,
        }
    }

    pub fn params(&self) -> &ConfidenceParams {
        &self.params
    }

    /// Record a statistic and decide the state for this frame.
    ///
    /// The very first update never suspects drift. On drift the statistic is
    /// removed from the history again.
    pub fn observe(&mut self, statistic: f64) -> Assessment {
        self.updates += 1;
        self.history.push_back(statistic);
        while self.history.len() > self.params.history_len.max(1) {
            self.history.pop_front();
        }
        let baseline = self.history.iter().sum::<f64>() / self.history.len() as f64;
        let ratio = statistic / baseline;

        let drift = self.updates > 1 && ratio.is_finite() && ratio >= self.params.threshold;
        if drift {
            self.history.pop_back();
        }
        Assessment {
            statistic,
            baseline,
            ratio,
            state: if drift {
                TrackState::DriftSuspected
            } else {
                TrackState::Adapting
            },
        }
    }

    /// Count one more drift frame and return the detector blend factor
    /// `exp(−αD · count)`.
    pub fn register_drift(&mut self) -> f64 {
        self.drift_count += 1;
        self.blend = (-self.params.detector_decay * self.drift_count as f64).exp();
        self.blend
    }

    pub fn drift_count(&self) -> u32 {
        self.drift_count
    }

    pub fn blend_factor(&self) -> f64 {
        self.blend
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }
}

// ---------------------------------------------------------------------------
// Role-indexed filter banks
// ---------------------------------------------------------------------------

/// Role of a filter bank within a [`FilterSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterRole {
    /// Continuously adapted
    Tracking,
    /// Rebuilt only while drift is suspected
    Detector,
    /// Frozen initial filter
    Snapshot,
}

impl FilterRole {
    fn slot(self) -> usize {
        match self {
            FilterRole::Tracking => 0,
            FilterRole::Detector => 1,
            FilterRole::Snapshot => 2,
        }
    }
}

/// The three filter banks of a track. All share channel count and shape.
#[derive(Clone, Debug)]
pub struct FilterSet {
    banks: [Vec<Spectrum>; 3],
}

impl FilterSet {
    /// Every role starts as a copy of the initial bank.
    pub fn new(initial: Vec<Spectrum>) -> Self {
        Self {
            banks: [initial.clone(), initial.clone(), initial],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.banks[0].len()
    }

    /// `Tracking ← (1 − lr)·Tracking + lr·fresh`.
    pub fn adapt_tracking(&mut self, fresh: &[Spectrum], lr: f64) {
        let tracking = &mut self.banks[FilterRole::Tracking.slot()];
        for (h, new) in tracking.iter_mut().zip(fresh) {
            *h = blend(h, 1.0 - lr, new, lr);
        }
    }

    /// `Detector ← (1 − b)·Snapshot + b·Tracking`.
    pub fn blend_detector(&mut self, b: f64) {
        let detector: Vec<Spectrum> = self[FilterRole::Snapshot]
            .iter()
            .zip(&self[FilterRole::Tracking])
            .map(|(s, t)| blend(s, 1.0 - b, t, b))
            .collect();
        self.banks[FilterRole::Detector.slot()] = detector;
    }
}

impl Index<FilterRole> for FilterSet {
    type Output = [Spectrum];

    fn index(&self, role: FilterRole) -> &Self::Output {
        &self.banks[role.slot()]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::{types::GridSize, window::gaussian_labels};
    use nalgebra::Complex;

    #[test]
    fn recenter_is_an_involution_for_even_sizes() {
        let m = RealMap::from_fn(6, 8, |i, j| (i * 8 + j) as f64);
        let back = recenter(&recenter(&m));
        assert_eq!(back, m);
        let c = recenter(&m);
        assert_eq!(c[(0, 0)], m[(3, 4)]);
        assert_eq!(c[(3, 4)], m[(0, 0)]);
    }

    #[test]
    fn on_target_response_scores_exp_bias() {
        // Filter on target: raw peak at the circular origin. The re-centred
        // copy carries the peak value half a grid away, where the distance
        // term vanishes, so the minimum is exp(bias).
        let grid = GridSize::new(50, 50);
        let response = gaussian_labels(2.0, grid) * 0.6;
        let score = sharpness(&response, 2500.0, 11.01, 0.3625, TRACKING_SHARPNESS_CEILING);
        assert_abs_diff_eq!(score, 0.3625_f64.exp(), epsilon = 1e-9);
    }

    #[test]
    fn sharpness_candidate_formula() {
        // Raw peak 1 at (0, 0) with a 0.5 neighbour. In the re-centred copy the
        // peak value sits at (4, 4), d² = 32 from the raw peak.
        let mut m = RealMap::zeros(8, 8);
        m[(0, 0)] = 1.0;
        m[(0, 1)] = 0.5;
        let area = 100.0;
        let rate: f64 = 11.01 / 10.0;
        let expected = 0.3625_f64.exp() / (1.0 - (-rate * 32.0).exp());
        assert_abs_diff_eq!(
            sharpness(&m, area, 11.01, 0.3625, TRACKING_SHARPNESS_CEILING),
            expected,
            epsilon = 1e-9
        );
    }

    #[test]
    fn single_cell_response_returns_the_ceiling() {
        let m = RealMap::from_element(1, 1, 0.7);
        assert_eq!(sharpness(&m, 100.0, 11.01, 0.3625, TRACKING_SHARPNESS_CEILING), 1000.0);
        assert_eq!(sharpness(&m, 100.0, 11.01, 0.3625, DETECTOR_SHARPNESS_CEILING), 10_000.0);
    }

    #[test]
    fn steady_statistics_keep_adapting() {
        let mut mon = ConfidenceMonitor::new(ConfidenceParams::default());
        for _ in 0..10 {
            assert_eq!(mon.observe(12.0).state, TrackState::Adapting);
        }
        let mut sharp = RealMap::zeros(16, 16);
        sharp[(0, 0)] = 1.0;
        let stat = sharpness(&sharp, 2500.0, 11.01, 0.3625, TRACKING_SHARPNESS_CEILING);
        let mut mon = ConfidenceMonitor::new(ConfidenceParams::default());
        for _ in 0..5 {
            let a = mon.observe(stat);
            assert_eq!(a.state, TrackState::Adapting);
            assert_abs_diff_eq!(a.ratio, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn outlier_suspects_drift_and_is_dropped() {
        let mut mon = ConfidenceMonitor::new(ConfidenceParams::default());
        for _ in 0..4 {
            mon.observe(1.0);
        }
        let a = mon.observe(1000.0);
        assert_eq!(a.state, TrackState::DriftSuspected);
        assert_abs_diff_eq!(a.baseline, 200.8, epsilon = 1e-9);
        assert_eq!(mon.history().len(), 4);
    }

    #[test]
    fn first_update_never_suspects_drift() {
        let mut mon = ConfidenceMonitor::new(ConfidenceParams {
            threshold: 0.5,
            ..Default::default()
        });
        assert_eq!(mon.observe(5.0).state, TrackState::Adapting);
        assert_eq!(mon.observe(5.0).state, TrackState::DriftSuspected);
    }

    #[test]
    fn history_is_a_rolling_window() {
        let mut mon = ConfidenceMonitor::new(ConfidenceParams {
            history_len: 3,
            ..Default::default()
        });
        for v in [1.0, 1.0, 1.0, 2.0, 2.0] {
            mon.observe(v);
        }
        assert_eq!(mon.history().len(), 3);
        let a = mon.observe(2.0);
        assert_abs_diff_eq!(a.baseline, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn detector_blend_follows_decay() {
        let mut mon = ConfidenceMonitor::new(ConfidenceParams {
            detector_decay: 0.5,
            ..Default::default()
        });
        assert_abs_diff_eq!(mon.register_drift(), (-0.5f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(mon.register_drift(), (-1.0f64).exp(), epsilon = 1e-12);
        assert_eq!(mon.drift_count(), 2);
    }

    #[test]
    fn filter_set_blends_by_role() {
        let one = Spectrum::from_element(2, 2, Complex::new(1.0, 0.0));
        let mut set = FilterSet::new(vec![one.clone()]);
        set.adapt_tracking(&[Spectrum::from_element(2, 2, Complex::new(3.0, 0.0))], 0.5);
        assert_abs_diff_eq!(set[FilterRole::Tracking][0][(0, 0)].re, 2.0);
        assert_abs_diff_eq!(set[FilterRole::Snapshot][0][(0, 0)].re, 1.0);

        set.blend_detector(0.25);
        // 0.75·1 + 0.25·2
        assert_abs_diff_eq!(set[FilterRole::Detector][0][(1, 1)].re, 1.25, epsilon = 1e-12);
        assert_eq!(set.channel_count(), 1);
    }
}
