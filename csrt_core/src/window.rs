//! Feature windows and the Gaussian desired response.
//!
//! All 2-D windows are separable: the outer product of a column window
//! (rows) and a row window (cols).

use crate::{
    error::ConfigError,
    types::{GridSize, RealMap},
};
use nalgebra::DVector;
use std::f64::consts::PI;
use std::str::FromStr;

/// Named window function selectable from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    Hann,
    Chebyshev,
    Kaiser,
}

impl FromStr for WindowKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hann" => Ok(Self::Hann),
            "cheb" => Ok(Self::Chebyshev),
            "kaiser" => Ok(Self::Kaiser),
            other => Err(ConfigError::UnknownWindow(other.to_string())),
        }
    }
}

/// Build the 2-D window of the requested kind over `grid`.
pub fn build_window(kind: WindowKind, grid: GridSize, cheb_attenuation: f64, kaiser_alpha: f64) -> RealMap {
    let one_d = |n: usize| match kind {
        WindowKind::Hann => hann(n),
        WindowKind::Chebyshev => chebyshev(n, cheb_attenuation),
        WindowKind::Kaiser => kaiser(n, kaiser_alpha),
    };
    let rows = one_d(grid.rows);
    let cols = one_d(grid.cols);
    &rows * cols.transpose()
}

/// Hann window `½(1 − cos(2πi/(n−1)))`.
pub fn hann(n: usize) -> DVector<f64> {
    if n <= 1 {
        return DVector::from_element(n, 1.0);
    }
    let nn = (n - 1) as f64;
    DVector::from_fn(n, |i, _| 0.5 * (1.0 - (2.0 * PI * i as f64 / nn).cos()))
}

/// Dolph–Chebyshev window with `attenuation` dB side lobes, peak-normalised.
pub fn chebyshev(n: usize, attenuation: f64) -> DVector<f64> {
    if n <= 1 {
        return DVector::from_element(n, 1.0);
    }
    let tg = 10f64.powf(attenuation / 20.0);
    let x0 = ((1.0 / (n - 1) as f64) * tg.acosh()).cosh();
    let mut m = ((n - 1) / 2) as f64;
    if n % 2 == 0 {
        m += 0.5;
    }

    let mut out = DVector::zeros(n);
    for nn in 0..(n / 2 + 1) {
        let offset = nn as f64 - m;
        let mut sum = 0.0;
        let mut i = 1.0;
        while i <= m {
            sum += cheb_poly(n - 1, x0 * (PI * i / n as f64).cos())
                * (2.0 * offset * PI * i / n as f64).cos();
            i += 1.0;
        }
        out[nn] = tg + 2.0 * sum;
        out[n - nn - 1] = out[nn];
    }
    let max = out.max();
    if max > 0.0 {
        out /= max;
    }
    out
}

/// Kaiser window with shape `alpha`.
pub fn kaiser(n: usize, alpha: f64) -> DVector<f64> {
    if n <= 1 {
        return DVector::from_element(n, 1.0);
    }
    let nn = (n - 1) as f64;
    let den = 1.0 / bessel_i0(alpha);
    DVector::from_fn(n, |i, _| {
        let k = 2.0 * i as f64 / nn - 1.0;
        let x = (1.0 - k * k).max(0.0).sqrt();
        bessel_i0(alpha * x) * den
    })
}

/// Chebyshev polynomial of the first kind, valid outside [-1, 1].
fn cheb_poly(order: usize, x: f64) -> f64 {
    let n = order as f64;
    if x.abs() <= 1.0 {
        (n * x.acos()).cos()
    } else if x > 1.0 {
        (n * x.acosh()).cosh()
    } else {
        let sign = if order % 2 == 0 { 1.0 } else { -1.0 };
        sign * (n * (-x).acosh()).cosh()
    }
}

/// Modified Bessel function of the first kind, order zero (power series).
fn bessel_i0(x: f64) -> f64 {
    let mut result = 0.0;
    let mut term = 1.0;
    let mut m = 0.0;
    while term > 1e-13 * result {
        result += term;
        m += 1.0;
        term *= (x * x) / (4.0 * m * m);
    }
    result
}

/// Gaussian desired response with its peak at the circular origin `(0, 0)`.
///
/// Distances wrap around the grid so the label is even under `(i, j) → (−i, −j)`.
pub fn gaussian_labels(sigma: f64, grid: GridSize) -> RealMap {
    let inv = -0.5 / (sigma * sigma);
    RealMap::from_fn(grid.rows, grid.cols, |i, j| {
        let di = i.min(grid.rows - i) as f64;
        let dj = j.min(grid.cols - j) as f64;
        (inv * (di * di + dj * dj)).exp()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn window_names_parse() {
        assert_eq!("hann".parse::<WindowKind>().unwrap(), WindowKind::Hann);
        assert_eq!("cheb".parse::<WindowKind>().unwrap(), WindowKind::Chebyshev);
        assert_eq!("kaiser".parse::<WindowKind>().unwrap(), WindowKind::Kaiser);
        assert!("hamming".parse::<WindowKind>().is_err());
    }

    #[test]
    fn hann_is_symmetric_with_zero_ends() {
        let w = hann(11);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[10], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[5], 1.0, epsilon = 1e-12);
        for i in 0..11 {
            assert_abs_diff_eq!(w[i], w[10 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn chebyshev_peaks_at_one_and_is_symmetric() {
        for n in [8, 9, 16] {
            let w = chebyshev(n, 45.0);
            assert_abs_diff_eq!(w.max(), 1.0, epsilon = 1e-9);
            for i in 0..n {
                assert_abs_diff_eq!(w[i], w[n - 1 - i], epsilon = 1e-9);
            }
            assert!(w[0] < w[n / 2]);
        }
    }

    #[test]
    fn kaiser_center_is_one() {
        let w = kaiser(9, 3.72);
        assert_abs_diff_eq!(w[4], 1.0, epsilon = 1e-12);
        assert!(w[0] < 1.0 && w[0] > 0.0);
    }

    #[test]
    fn build_window_is_outer_product() {
        let grid = GridSize::new(6, 9);
        let w = build_window(WindowKind::Hann, grid, 45.0, 3.72);
        assert_eq!(GridSize::of(&w), grid);
        let (r, c) = (hann(6), hann(9));
        assert_abs_diff_eq!(w[(2, 4)], r[2] * c[4], epsilon = 1e-12);
    }

    #[test]
    fn labels_peak_at_origin_and_wrap() {
        let y = gaussian_labels(1.0, GridSize::new(8, 10));
        assert_abs_diff_eq!(y[(0, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[(1, 0)], y[(7, 0)], epsilon = 1e-12);
        assert_abs_diff_eq!(y[(0, 1)], y[(0, 9)], epsilon = 1e-12);
        assert!(y[(4, 5)] < 1e-6);
    }
}
