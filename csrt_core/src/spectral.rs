//! Spectral transform capability and elementwise complex arithmetic.
//!
//! The tracker only ever talks to [`SpectralTransform`]; [`RustFftTransform`]
//! is the bundled implementation. The 2-D transform runs a 1-D FFT over every
//! column (contiguous in nalgebra's column-major storage) and then over every
//! row.
//!
//! Conventions match a circular cross-correlation:
//! `inverse(forward(f) ⊙ conj(forward(h)))[τ] = Σₓ f(x + τ)·h(x)`.

use crate::types::{RealMap, Spectrum};
use nalgebra::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Forward/inverse 2-D discrete Fourier transform.
pub trait SpectralTransform: Send + Sync {
    /// Forward transform of a real map (full complex output).
    fn forward(&self, map: &RealMap) -> Spectrum;

    /// Inverse transform scaled by `1/(rows·cols)`; only the real part is kept.
    fn inverse(&self, spectrum: &Spectrum) -> RealMap;
}

// ---------------------------------------------------------------------------
// rustfft implementation
// ---------------------------------------------------------------------------

/// [`SpectralTransform`] backed by `rustfft`, with plans cached per length.
#[derive(Default)]
pub struct RustFftTransform {
    plans: Mutex<HashMap<(usize, bool), Arc<dyn Fft<f64>>>>,
}

impl RustFftTransform {
    pub fn new() -> Self {
        Self::default()
    }

    fn plan(&self, len: usize, inverse: bool) -> Arc<dyn Fft<f64>> {
        let mut plans = self.plans.lock().unwrap_or_else(PoisonError::into_inner);
        plans
            .entry((len, inverse))
            .or_insert_with(|| {
                let mut planner = FftPlanner::new();
                if inverse {
                    planner.plan_fft_inverse(len)
                } else {
                    planner.plan_fft_forward(len)
                }
            })
            .clone()
    }

    fn transform_2d(&self, data: &mut Spectrum, inverse: bool) {
        let (rows, cols) = data.shape();
        if rows == 0 || cols == 0 {
            return;
        }

        let col_fft = self.plan(rows, inverse);
        for column in data.as_mut_slice().chunks_mut(rows) {
            col_fft.process(column);
        }

        let row_fft = self.plan(cols, inverse);
        let mut buf = vec![Complex::new(0.0, 0.0); cols];
        for i in 0..rows {
            for (j, b) in buf.iter_mut().enumerate() {
                *b = data[(i, j)];
            }
            row_fft.process(&mut buf);
            for (j, b) in buf.iter().enumerate() {
                data[(i, j)] = *b;
            }
        }
    }
}

impl SpectralTransform for RustFftTransform {
    fn forward(&self, map: &RealMap) -> Spectrum {
        let mut data = map.map(|v| Complex::new(v, 0.0));
        self.transform_2d(&mut data, false);
        data
    }

    fn inverse(&self, spectrum: &Spectrum) -> RealMap {
        let mut data = spectrum.clone();
        self.transform_2d(&mut data, true);
        let n = (data.nrows() * data.ncols()).max(1) as f64;
        data.map(|c| c.re / n)
    }
}

// ---------------------------------------------------------------------------
// Elementwise complex arithmetic
// ---------------------------------------------------------------------------

/// `a ⊙ conj(b)`.
pub fn mul_conj(a: &Spectrum, b: &Spectrum) -> Spectrum {
    a.zip_map(b, |x, y| x * y.conj())
}

/// Elementwise complex division `num / den`; zero where `|den|² == 0`.
pub fn divide(num: &Spectrum, den: &Spectrum) -> Spectrum {
    num.zip_map(den, |n, d| {
        let mag2 = d.norm_sqr();
        if mag2 == 0.0 {
            Complex::new(0.0, 0.0)
        } else {
            n * d.conj() / mag2
        }
    })
}

/// Add a real constant to every element (real part only).
pub fn add_real(s: &Spectrum, value: f64) -> Spectrum {
    s.map(|c| c + value)
}

/// Multiply every element by a real factor.
pub fn scale(s: &Spectrum, factor: f64) -> Spectrum {
    s.map(|c| c * factor)
}

/// `wa·a + wb·b`.
pub fn blend(a: &Spectrum, wa: f64, b: &Spectrum, wb: f64) -> Spectrum {
    a.zip_map(b, |x, y| x * wa + y * wb)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(rows: usize, cols: usize) -> RealMap {
        RealMap::from_fn(rows, cols, |i, j| (i * 7 + j * 3) as f64 % 5.0 - 1.5)
    }

    #[test]
    fn forward_inverse_round_trip() {
        let fft = RustFftTransform::new();
        let map = ramp(6, 9);
        let back = fft.inverse(&fft.forward(&map));
        for (a, b) in map.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn dc_component_is_sum() {
        let fft = RustFftTransform::new();
        let map = ramp(4, 5);
        let spec = fft.forward(&map);
        assert_abs_diff_eq!(spec[(0, 0)].re, map.sum(), epsilon = 1e-10);
        assert_abs_diff_eq!(spec[(0, 0)].im, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn conj_product_is_circular_cross_correlation() {
        let fft = RustFftTransform::new();
        let f = ramp(5, 4);
        let mut h = RealMap::zeros(5, 4);
        h[(1, 2)] = 1.0;
        let corr = fft.inverse(&mul_conj(&fft.forward(&f), &fft.forward(&h)));
        // Σₓ f(x+τ)·δ(x − (1,2)) = f((1,2) + τ)
        for ti in 0..5 {
            for tj in 0..4 {
                let expected = f[((1 + ti) % 5, (2 + tj) % 4)];
                assert_abs_diff_eq!(corr[(ti, tj)], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn complex_division_matches_definition() {
        let a = Spectrum::from_element(1, 1, Complex::new(3.0, -2.0));
        let b = Spectrum::from_element(1, 1, Complex::new(1.0, 4.0));
        let q = divide(&a, &b)[(0, 0)];
        // (3 − 2i)/(1 + 4i) = (3 − 2i)(1 − 4i)/17 = (−5 − 14i)/17
        assert_abs_diff_eq!(q.re, -5.0 / 17.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.im, -14.0 / 17.0, epsilon = 1e-12);
    }

    #[test]
    fn division_by_zero_yields_zero() {
        let a = Spectrum::from_element(2, 2, Complex::new(1.0, 1.0));
        let z = Spectrum::zeros(2, 2);
        assert!(divide(&a, &z).iter().all(|c| c.norm() == 0.0));
    }
}
