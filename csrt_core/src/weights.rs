//! Channel-reliability weights.

use crate::{
    spectral::{mul_conj, SpectralTransform},
    types::Spectrum,
};
use tracing::warn;

/// Raw reliability of each channel: the peak of `F ⊙ conj(H)` in space.
pub fn channel_scores(features: &[Spectrum], filters: &[Spectrum], fft: &dyn SpectralTransform) -> Vec<f64> {
    features
        .iter()
        .zip(filters)
        .map(|(f, h)| fft.inverse(&mul_conj(f, h)).max())
        .collect()
}

/// Non-negative per-channel fusion weights summing to one.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelWeights {
    values: Vec<f64>,
}

impl ChannelWeights {
    pub fn uniform(n: usize) -> Self {
        let n = n.max(1);
        Self {
            values: vec![1.0 / n as f64; n],
        }
    }

    /// Normalised raw scores; uniform when the scores carry no information.
    pub fn from_scores(scores: &[f64]) -> Self {
        match normalise(scores) {
            Some(values) => Self { values },
            None => {
                warn!(channels = scores.len(), "degenerate channel scores, using uniform weights");
                Self::uniform(scores.len())
            }
        }
    }

    /// EMA towards the normalised `scores`, then renormalise.
    ///
    /// Degenerate scores leave the weights untouched; returns whether the
    /// weights changed.
    pub fn update(&mut self, scores: &[f64], lr: f64) -> bool {
        let Some(fresh) = normalise(scores).filter(|v| v.len() == self.values.len()) else {
            warn!(channels = scores.len(), "degenerate channel scores, weights left unchanged");
            return false;
        };
        for (w, s) in self.values.iter_mut().zip(fresh) {
            *w = (1.0 - lr) * *w + lr * s;
        }
        let total: f64 = self.values.iter().sum();
        if total > 0.0 {
            self.values.iter_mut().for_each(|w| *w /= total);
        }
        true
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Clamp negatives to zero and divide by the sum; `None` if the sum is not
/// a usable positive number.
fn normalise(scores: &[f64]) -> Option<Vec<f64>> {
    if scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let clamped: Vec<f64> = scores.iter().map(|s| s.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if scores.is_empty() || !total.is_finite() || total <= f64::EPSILON {
        return None;
    }
    Some(clamped.into_iter().map(|s| s / total).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
