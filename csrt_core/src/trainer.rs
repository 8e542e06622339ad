//! Constrained correlation-filter trainer (ADMM).
//!
//! Per channel, solves
//! `min_h ‖f ⋆ h − y‖² + λ‖h‖²` subject to `h = m ⊙ h` (spatial support `m`)
//! with an augmented Lagrangian. Channels are independent and trained in
//! parallel on the trainer's own worker pool.
//!
//! # Iteration (per channel)
//! 1. `Sxy = F ⊙ conj(Y)`, `Sxx = F ⊙ conj(F)`
//! 2. `H = P(Sxy / (Sxx + λ))` where `P` projects onto the mask in space
//! 3. repeat: `G = (Sxy + μH − L)/(Sxx + μ)`, `H = P((μG + L)/(λ + μ))`,
//!    `L += μ(G − H)`, `μ = min(μ_max, βμ)`

use crate::{
    error::TrackerError,
    spectral::{add_real, blend, divide, mul_conj, scale, SpectralTransform},
    types::{RealMap, Spectrum},
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Augmented-Lagrangian constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdmmParams {
    /// Initial penalty μ
    pub mu: f64,
    /// Penalty growth factor β
    pub beta: f64,
    pub mu_max: f64,
    /// Ridge weight λ
    pub lambda: f64,
    pub iterations: usize,
}

impl Default for AdmmParams {
    fn default() -> Self {
        Self {
            mu: 5.0,
            beta: 3.0,
            mu_max: 20.0,
            lambda: 5.0 / 100.0,
            iterations: 4,
        }
    }
}

impl AdmmParams {
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations,
            ..Default::default()
        }
    }
}

/// Trains one spectral filter per feature channel.
pub struct FilterTrainer {
    params: AdmmParams,
    pool: ThreadPool,
}

impl FilterTrainer {
    /// `worker_threads == 0` lets rayon pick the thread count.
    pub fn new(params: AdmmParams, worker_threads: usize) -> Result<Self, TrackerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("csrt-train-{i}"))
            .build()?;
        Ok(Self { params, pool })
    }

    pub fn params(&self) -> &AdmmParams {
        &self.params
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Train filters for `features` against `labels` under `mask`.
    ///
    /// The output has one filter per input channel, in input order.
    pub fn train(
        &self,
        features: &[Spectrum],
        labels: &Spectrum,
        mask: &RealMap,
        fft: &dyn SpectralTransform,
    ) -> Vec<Spectrum> {
        let params = self.params;
        self.pool.install(|| {
            features
                .par_iter()
                .map(|f| train_channel(&params, f, labels, mask, fft))
                .collect()
        })
    }
}

/// Project a spectral filter onto the spatial support `mask`, scaled by `factor`.
fn project(h: &Spectrum, mask: &RealMap, factor: f64, fft: &dyn SpectralTransform) -> Spectrum {
    let spatial = fft.inverse(h).component_mul(mask) * factor;
    fft.forward(&spatial)
}

/// ADMM for a single channel.
pub fn train_channel(
    params: &AdmmParams,
    f: &Spectrum,
    labels: &Spectrum,
    mask: &RealMap,
    fft: &dyn SpectralTransform,
) -> Spectrum {
    let lambda = params.lambda;
    let mut mu = params.mu;

    let sxy = mul_conj(f, labels);
    let sxx = mul_conj(f, f);

    let mut h = project(&divide(&sxy, &add_real(&sxx, lambda)), mask, 1.0, fft);
    let mut l = Spectrum::zeros(h.nrows(), h.ncols());

    for _ in 0..params.iterations {
        let num = &sxy + scale(&h, mu) - &l;
        let g = divide(&num, &add_real(&sxx, mu));
        h = project(&blend(&g, mu, &l, 1.0), mask, 1.0 / (lambda + mu), fft);
        l += scale(&(&g - &h), mu);
        mu = params.mu_max.min(params.beta * mu);
    }
    h
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
