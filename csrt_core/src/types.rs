//! Fundamental types used across the entire workspace.

use crate::error::TrackerError;
use nalgebra::{Complex, DMatrix};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar type: use f64 throughout, spectra are complex f64.
// ---------------------------------------------------------------------------

/// Real-valued 2-D map (feature channel, response surface, mask, window).
/// Indexed `(row, col)`.
pub type RealMap = DMatrix<f64>;

/// Complex frequency-domain array with the same shape as its spatial map.
pub type Spectrum = DMatrix<Complex<f64>>;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Integer grid dimensions (rows × cols).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    pub fn of(map: &RealMap) -> Self {
        Self::new(map.nrows(), map.ncols())
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// 2-D point in image pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Real-valued width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size2 {
    pub width: f64,
    pub height: f64,
}

impl Size2 {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

/// Axis-aligned box: top-left corner plus size, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Box of `size` centred on `center`.
    pub fn from_center(center: Point2, size: Size2) -> Self {
        Self {
            x: center.x - size.width / 2.0,
            y: center.y - size.height / 2.0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn size(&self) -> Size2 {
        Size2::new(self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Intersection-over-union with another box (0 when disjoint).
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Integer pixel rectangle (used for valid-pixel regions inside patches).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A video frame stored as planar channels with intensities in `[0, 255]`.
///
/// Three-channel frames are interpreted as RGB.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    channels: Vec<RealMap>,
}

impl Frame {
    /// Build a frame from planar channels; all planes must share one shape.
    pub fn from_channels(channels: Vec<RealMap>) -> Result<Self, TrackerError> {
        let first = channels.first().ok_or(TrackerError::EmptyFrame)?;
        let shape = GridSize::of(first);
        if shape.area() == 0 {
            return Err(TrackerError::EmptyFrame);
        }
        if let Some(bad) = channels.iter().find(|c| GridSize::of(c) != shape) {
            return Err(TrackerError::FrameShape {
                expected: shape,
                got: GridSize::of(bad),
            });
        }
        Ok(Self { channels })
    }

    /// Planes already known to share one non-empty shape.
    pub(crate) fn from_planes(channels: Vec<RealMap>) -> Self {
        debug_assert!(!channels.is_empty());
        Self { channels }
    }

    /// Single-channel frame.
    pub fn gray(plane: RealMap) -> Result<Self, TrackerError> {
        Self::from_channels(vec![plane])
    }

    /// Three-channel frame from R, G and B planes.
    pub fn rgb(r: RealMap, g: RealMap, b: RealMap) -> Result<Self, TrackerError> {
        Self::from_channels(vec![r, g, b])
    }

    /// Frame where every channel holds `value`; at least 1×1 with one channel.
    pub fn uniform(width: usize, height: usize, channels: usize, value: f64) -> Self {
        Self {
            channels: vec![RealMap::from_element(height.max(1), width.max(1), value); channels.max(1)],
        }
    }

    pub fn width(&self) -> usize {
        self.channels[0].ncols()
    }

    pub fn height(&self) -> usize {
        self.channels[0].nrows()
    }

    pub fn size(&self) -> GridSize {
        GridSize::new(self.height(), self.width())
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, idx: usize) -> &RealMap {
        &self.channels[idx]
    }

    pub fn channels(&self) -> &[RealMap] {
        &self.channels
    }

    /// Colour view of the frame: with fewer than three channels the luma
    /// plane is broadcast to three identical planes, otherwise the frame is
    /// returned unchanged.
    pub fn to_color(&self) -> Frame {
        if self.channels.len() < 3 {
            Frame {
                channels: vec![self.luma(); 3],
            }
        } else {
            self.clone()
        }
    }

    /// Luma plane (Rec. 601 weights for RGB, identity for one channel).
    pub fn luma(&self) -> RealMap {
        match self.channels.len() {
            1 | 2 => self.channels[0].clone(),
            _ => {
                let (r, g, b) = (&self.channels[0], &self.channels[1], &self.channels[2]);
                RealMap::from_fn(self.height(), self.width(), |i, j| {
                    0.299 * r[(i, j)] + 0.587 * g[(i, j)] + 0.114 * b[(i, j)]
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
