//! Scene definitions.
//!
//! Each scene is a named configuration of a renderer and targets; the first
//! target is the one being tracked. All scenes are deterministic given the
//! same seed.

use crate::{
    render::{FrameRenderer, RenderParams},
    target::{MotionSpec, Target},
};
use csrt_core::{BoundingBox, Frame, Point2, Size2, TrackerError};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Which pre-defined scene to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum SceneKind {
    /// Motionless target on a textured background
    Stationary,
    /// Target drifting at constant velocity
    Linear,
    /// Target on a circular path passing a static distractor
    Orbit,
    /// Single-channel linear scene
    Gray,
}

/// A fully configured scene.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub seed: u64,
    pub frames: usize,
    pub render: RenderParams,
    pub targets: Vec<Target>,
}

impl Scene {
    /// Build the named scene. Uses `seed` for repeatability.
    pub fn build(kind: SceneKind, seed: u64) -> Self {
        match kind {
            SceneKind::Stationary => Self::stationary(seed),
            SceneKind::Linear => Self::linear(seed, false),
            SceneKind::Orbit => Self::orbit(seed),
            SceneKind::Gray => Self::linear(seed, true),
        }
    }

    fn stationary(seed: u64) -> Self {
        Self {
            name: "stationary".into(),
            seed,
            frames: 60,
            render: RenderParams::default(),
            targets: vec![Target::new(
                Point2::new(160.0, 120.0),
                Size2::new(40.0, 32.0),
                MotionSpec::Stationary,
                220.0,
            )],
        }
    }

    fn linear(seed: u64, gray: bool) -> Self {
        // Heading varies with the seed; speed stays under two pixels per frame.
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let heading = rng.gen::<f64>() * std::f64::consts::TAU;
        let speed = rng.gen_range(0.5..1.5);
        Self {
            name: if gray { "gray".into() } else { "linear".into() },
            seed,
            frames: 60,
            render: RenderParams {
                gray,
                ..Default::default()
            },
            targets: vec![Target::new(
                Point2::new(160.0, 120.0),
                Size2::new(36.0, 36.0),
                MotionSpec::ConstantVelocity {
                    vx: speed * heading.cos(),
                    vy: speed * heading.sin(),
                },
                220.0,
            )],
        }
    }

    fn orbit(seed: u64) -> Self {
        let (cx, cy, radius) = (160.0, 120.0, 60.0);
        Self {
            name: "orbit".into(),
            seed,
            frames: 120,
            render: RenderParams::default(),
            targets: vec![
                Target::new(
                    Point2::new(cx + radius, cy),
                    Size2::new(32.0, 32.0),
                    MotionSpec::Orbit {
                        cx,
                        cy,
                        radius,
                        omega: 0.02,
                    },
                    230.0,
                ),
                Target::new(Point2::new(cx, cy + radius + 40.0), Size2::new(24.0, 24.0), MotionSpec::Stationary, 150.0),
            ],
        }
    }

    /// Start a playback of this scene from its first frame.
    pub fn play(&self) -> Playback {
        Playback {
            renderer: FrameRenderer::new(self.render.clone(), self.seed),
            targets: self.targets.clone(),
            remaining: self.frames,
            k: 0,
        }
    }
}

/// Frame-by-frame rendering of a scene.
pub struct Playback {
    renderer: FrameRenderer,
    targets: Vec<Target>,
    remaining: usize,
    k: u64,
}

impl Playback {
    /// Render the next frame and the tracked target's true box, or `None`
    /// once the scene is exhausted.
    pub fn next_frame(&mut self) -> Option<Result<(Frame, BoundingBox), TrackerError>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let truth = self.targets.first().map(Target::bbox).unwrap_or_default();
        let frame = self.renderer.render(&self.targets);
        for target in &mut self.targets {
            target.step(self.k);
        }
        self.k += 1;
        Some(frame.map(|f| (f, truth)))
    }
}

impl Iterator for Playback {
    type Item = Result<(Frame, BoundingBox), TrackerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}
