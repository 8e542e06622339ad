//! Frame renderer.
//!
//! Produces frames with:
//! - a fixed low-frequency textured background (drawn once from the seed)
//! - textured target bodies painted over it
//! - uniform per-pixel sensor noise, redrawn every frame

use crate::target::Target;
use csrt_core::{Frame, RealMap, TrackerError};
use nalgebra::DMatrix;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Rendering parameters for one scene.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderParams {
    pub width: usize,
    pub height: usize,
    /// Single-channel output instead of RGB
    pub gray: bool,
    /// Peak amplitude of the uniform sensor noise
    pub noise: f64,
    /// Mean background level (0..255)
    pub background_level: f64,
    /// Number of sinusoids summed into the background texture
    pub background_waves: usize,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            gray: false,
            noise: 6.0,
            background_level: 60.0,
            background_waves: 6,
        }
    }
}

/// Deterministic renderer: the same seed yields the same sequence.
pub struct FrameRenderer {
    pub params: RenderParams,
    background: Vec<RealMap>,
    rng: ChaCha8Rng,
}

impl FrameRenderer {
    pub fn new(params: RenderParams, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let planes = if params.gray { 1 } else { 3 };
        let background = (0..planes)
            .map(|_| background_plane(&params, &mut rng))
            .collect();
        Self {
            params,
            background,
            rng,
        }
    }

    /// Render the next frame with `targets` painted in list order.
    pub fn render(&mut self, targets: &[Target]) -> Result<Frame, TrackerError> {
        let noise = self.params.noise;
        let mut planes = self.background.clone();
        for (c, plane) in planes.iter_mut().enumerate() {
            for target in targets {
                paint_target(plane, target, c);
            }
            for v in plane.iter_mut() {
                let n = (self.rng.gen::<f64>() * 2.0 - 1.0) * noise;
                *v = (*v + n).clamp(0.0, 255.0);
            }
        }
        Frame::from_channels(planes)
    }
}

fn background_plane(params: &RenderParams, rng: &mut ChaCha8Rng) -> RealMap {
    let waves: Vec<(f64, f64, f64, f64)> = (0..params.background_waves)
        .map(|_| {
            let fx = rng.gen_range(0.005..0.05) * TAU;
            let fy = rng.gen_range(0.005..0.05) * TAU;
            let phase = rng.gen::<f64>() * TAU;
            let amp = rng.gen_range(4.0..14.0);
            (fx, fy, phase, amp)
        })
        .collect();
    DMatrix::from_fn(params.height, params.width, |i, j| {
        let texture: f64 = waves
            .iter()
            .map(|(fx, fy, phase, amp)| amp * (fx * j as f64 + fy * i as f64 + phase).sin())
            .sum();
        (params.background_level + texture).clamp(0.0, 255.0)
    })
}

/// Checkered body with a per-channel tint, so colour and gradient features
/// both see structure.
fn paint_target(plane: &mut RealMap, target: &Target, channel: usize) {
    let bbox = target.bbox();
    let (rows, cols) = plane.shape();
    let x0 = bbox.x.round().max(0.0) as usize;
    let y0 = bbox.y.round().max(0.0) as usize;
    let x1 = ((bbox.x + bbox.width).round().max(0.0) as usize).min(cols);
    let y1 = ((bbox.y + bbox.height).round().max(0.0) as usize).min(rows);
    let tint = [1.0, 0.7, 0.4][channel % 3];
    let cell = (bbox.width.min(bbox.height) / 4.0).max(2.0) as usize;
    for i in y0..y1 {
        for j in x0..x1 {
            let local = ((i - y0) / cell + (j - x0) / cell) % 2;
            let level = if local == 0 { target.intensity } else { target.intensity * 0.75 };
            plane[(i, j)] = level * tint;
        }
    }
}
