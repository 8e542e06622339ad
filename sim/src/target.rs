//! Target trajectory models and state propagation.
//!
//! A target is an axis-aligned box moving in image coordinates. Each target
//! carries a `MotionSpec`; the scene steps it once per frame.

use csrt_core::{BoundingBox, Point2, Size2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How the target center moves between frames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    Stationary,
    /// Constant velocity in pixels per frame.
    ConstantVelocity { vx: f64, vy: f64 },
    /// Circular path around (`cx`, `cy`). `omega` = radians per frame.
    Orbit {
        cx: f64,
        cy: f64,
        radius: f64,
        omega: f64,
    },
}

/// A simulated target with ground-truth geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    pub center: Point2,
    pub size: Size2,
    pub motion: MotionSpec,
    /// Bright level of the target body (0..255)
    pub intensity: f64,
    /// Past centers, newest first
    #[serde(skip)]
    pub history: VecDeque<Point2>,
}

impl Target {
    pub fn new(center: Point2, size: Size2, motion: MotionSpec, intensity: f64) -> Self {
        Self {
            center,
            size,
            motion,
            intensity,
            history: VecDeque::new(),
        }
    }

    /// Ground-truth box at the current center.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_center(self.center, self.size)
    }

    /// Advance the target to frame `k + 1`.
    pub fn step(&mut self, k: u64) {
        self.history.push_front(self.center);
        if self.history.len() > 500 {
            self.history.pop_back();
        }

        match &self.motion {
            MotionSpec::Stationary => {}
            MotionSpec::ConstantVelocity { vx, vy } => {
                self.center.x += vx;
                self.center.y += vy;
            }
            MotionSpec::Orbit { cx, cy, radius, omega } => {
                let phase = omega * (k + 1) as f64;
                self.center = Point2::new(cx + radius * phase.cos(), cy + radius * phase.sin());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constant_velocity_accumulates() {
        let mut t = Target::new(
            Point2::new(10.0, 20.0),
            Size2::new(8.0, 8.0),
            MotionSpec::ConstantVelocity { vx: 1.5, vy: -0.5 },
            200.0,
        );
        for k in 0..4 {
            t.step(k);
        }
        assert_abs_diff_eq!(t.center.x, 16.0);
        assert_abs_diff_eq!(t.center.y, 18.0);
        assert_eq!(t.history.len(), 4);
        assert_abs_diff_eq!(t.history[0].x, 14.5);
    }

    #[test]
    fn orbit_stays_on_circle() {
        let mut t = Target::new(
            Point2::new(60.0, 50.0),
            Size2::new(8.0, 8.0),
            MotionSpec::Orbit {
                cx: 50.0,
                cy: 50.0,
                radius: 10.0,
                omega: 0.1,
            },
            200.0,
        );
        for k in 0..30 {
            t.step(k);
            assert_abs_diff_eq!(t.center.distance(&Point2::new(50.0, 50.0)), 10.0, epsilon = 1e-9);
        }
    }
}
