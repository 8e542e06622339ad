//! Correlation response of a filter bank and peak localisation.

use crate::{
    spectral::{mul_conj, scale, SpectralTransform},
    types::{RealMap, Spectrum},
    weights::ChannelWeights,
};
use nalgebra::Complex;

/// Fused spatial response `Σ wᵢ·(Fᵢ ⊙ conj(Hᵢ))`, back in space.
///
/// Without weights every channel contributes with weight one.
pub fn evaluate_response(
    features: &[Spectrum],
    filters: &[Spectrum],
    weights: Option<&ChannelWeights>,
    fft: &dyn SpectralTransform,
) -> RealMap {
    let (rows, cols) = features.first().map(|f| f.shape()).unwrap_or((0, 0));
    let mut acc = Spectrum::from_element(rows, cols, Complex::new(0.0, 0.0));
    for (k, (f, h)) in features.iter().zip(filters).enumerate() {
        let w = weights.and_then(|w| w.as_slice().get(k).copied()).unwrap_or(1.0);
        acc += scale(&mul_conj(f, h), w);
    }
    fft.inverse(&acc)
}

/// Response maximum with sub-pixel refinement and wrap correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Integer location of the maximum `(row, col)`
    pub row: usize,
    pub col: usize,
    pub value: f64,
    /// Signed displacement in cells, after refinement and wrapping
    pub dy: f64,
    pub dx: f64,
}

/// First location of the maximum, scanning row by row.
pub fn find_peak(map: &RealMap) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for i in 0..map.nrows() {
        for j in 0..map.ncols() {
            let v = map[(i, j)];
            if v > best.2 {
                best = (i, j, v);
            }
        }
    }
    best
}

/// Parabolic offset through `left`, `center`, `right`; zero when undefined.
pub fn parabolic_offset(left: f64, center: f64, right: f64) -> f64 {
    let delta = 0.5 * (right - left) / (2.0 * center - right - left);
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

/// Locate the peak of a circular response.
///
/// Neighbours for the parabolic fit wrap around the map edges. A refined
/// coordinate `p` with `p + 1 > n/2` is mapped to `p − n`.
pub fn locate_peak(map: &RealMap) -> Peak {
    let (rows, cols) = map.shape();
    let (row, col, value) = find_peak(map);

    let up = map[((row + rows - 1) % rows, col)];
    let down = map[((row + 1) % rows, col)];
    let left = map[(row, (col + cols - 1) % cols)];
    let right = map[(row, (col + 1) % cols)];

    let mut dy = row as f64 + parabolic_offset(up, value, down);
    let mut dx = col as f64 + parabolic_offset(left, value, right);
    if dy + 1.0 > rows as f64 / 2.0 {
        dy -= rows as f64;
    }
    if dx + 1.0 > cols as f64 / 2.0 {
        dx -= cols as f64;
    }
    Peak {
        row,
        col,
        value,
        dy,
        dx,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
