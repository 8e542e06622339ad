//! Colour-histogram foreground/background model and Bayesian posterior.
//!
//! The tracker keeps one [`RegionHistograms`] per track, refreshed with an EMA
//! every frame, and asks a [`Segmentation`] implementation for the
//! per-pixel foreground posterior of a search patch.

use crate::types::{BoundingBox, Frame, RealMap};

/// Normalised joint colour histogram with `bins` levels per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    bins: usize,
    data: Vec<f64>,
}

impl Histogram {
    pub fn new(bins: usize) -> Self {
        let bins = bins.max(1);
        Self {
            bins,
            data: vec![0.0; bins * bins * bins],
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Bin index of a colour whose components lie in `[0, 255]`.
    fn index(&self, c0: f64, c1: f64, c2: f64) -> usize {
        let q = |v: f64| ((v.clamp(0.0, 255.0) * self.bins as f64 / 256.0) as usize).min(self.bins - 1);
        (q(c0) * self.bins + q(c1)) * self.bins + q(c2)
    }

    fn add(&mut self, c: [f64; 3]) {
        let idx = self.index(c[0], c[1], c[2]);
        self.data[idx] += 1.0;
    }

    fn normalise(&mut self) {
        let total: f64 = self.data.iter().sum();
        if total > 0.0 {
            self.data.iter_mut().for_each(|v| *v /= total);
        }
    }

    /// Likelihood of a colour under this histogram.
    pub fn likelihood(&self, c: [f64; 3]) -> f64 {
        self.data[self.index(c[0], c[1], c[2])]
    }

    /// `self ← (1 − lr)·self + lr·newer`.
    pub fn blend(&mut self, newer: &Histogram, lr: f64) {
        for (a, b) in self.data.iter_mut().zip(newer.data.iter()) {
            *a = (1.0 - lr) * *a + lr * b;
        }
    }
}

/// Foreground and background histograms plus the background prior `p_b`.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionHistograms {
    pub foreground: Histogram,
    pub background: Histogram,
    /// Share of the outer region not covered by the target
    pub background_prob: f64,
}

impl RegionHistograms {
    /// EMA both histograms towards `newer`; `p_b` takes the newest value.
    pub fn blend(&mut self, newer: &RegionHistograms, lr: f64) {
        self.foreground.blend(&newer.foreground, lr);
        self.background.blend(&newer.background, lr);
        self.background_prob = newer.background_prob;
    }
}

/// Histogram modelling and posterior evaluation.
pub trait Segmentation: Send + Sync {
    /// Histograms of the box interior and of the surrounding ring.
    fn extract_histograms(&self, frame: &Frame, region: &BoundingBox) -> RegionHistograms;

    /// Per-pixel foreground posterior over `patch`.
    fn posterior(&self, patch: &Frame, fg_prior: &RealMap, bg_prior: &RealMap, model: &RegionHistograms) -> RealMap;
}

// ---------------------------------------------------------------------------
// HSV histogram implementation
// ---------------------------------------------------------------------------

/// Joint HSV histograms; frames are RGB in `[0, 255]`.
#[derive(Clone, Debug)]
pub struct HistogramSegmentation {
    bins: usize,
    background_ratio: usize,
}

impl HistogramSegmentation {
    pub fn new(bins: usize, background_ratio: usize) -> Self {
        Self {
            bins: bins.max(1),
            background_ratio: background_ratio.max(1),
        }
    }
}

impl Segmentation for HistogramSegmentation {
    fn extract_histograms(&self, frame: &Frame, region: &BoundingBox) -> RegionHistograms {
        let hsv = hsv_planes(frame);
        let (rows, cols) = (frame.height() as i64, frame.width() as i64);

        let rx = region.x.round() as i64;
        let ry = region.y.round() as i64;
        let x1 = rx.clamp(0, cols - 1);
        let y1 = ry.clamp(0, rows - 1);
        let x2 = (rx + region.width.round() as i64).clamp(0, cols - 1);
        let y2 = (ry + region.height.round() as i64).clamp(0, rows - 1);

        let ratio = self.background_ratio as i64;
        let off_x = (x2 - x1 + 1) / ratio;
        let off_y = (y2 - y1 + 1) / ratio;
        let ox1 = (x1 - off_x).max(0);
        let oy1 = (y1 - off_y).max(0);
        let ox2 = (x2 + off_x + 1).min(cols);
        let oy2 = (y2 + off_y + 1).min(rows);

        let inner = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f64;
        let outer = ((ox2 - ox1 + 1) * (oy2 - oy1 + 1)) as f64;
        let background_prob = 1.0 - inner / outer;

        let mut foreground = Histogram::new(self.bins);
        let mut background = Histogram::new(self.bins);
        for y in oy1..oy2 {
            for x in ox1..ox2 {
                let c = pixel(&hsv, y as usize, x as usize);
                if (x1..=x2).contains(&x) && (y1..=y2).contains(&y) {
                    foreground.add(c);
                } else {
                    background.add(c);
                }
            }
        }
        foreground.normalise();
        background.normalise();

        RegionHistograms {
            foreground,
            background,
            background_prob,
        }
    }

    fn posterior(&self, patch: &Frame, fg_prior: &RealMap, bg_prior: &RealMap, model: &RegionHistograms) -> RealMap {
        let hsv = hsv_planes(patch);
        let p_b = model.background_prob;
        RealMap::from_fn(patch.height(), patch.width(), |i, j| {
            let c = pixel(&hsv, i, j);
            let fg = fg_prior[(i, j)] * (1.0 - p_b) * model.foreground.likelihood(c);
            let bg = bg_prior[(i, j)] * p_b * model.background.likelihood(c);
            let den = fg + bg;
            if den > 0.0 {
                fg / den
            } else {
                0.0
            }
        })
    }
}

fn pixel(planes: &[RealMap; 3], i: usize, j: usize) -> [f64; 3] {
    [planes[0][(i, j)], planes[1][(i, j)], planes[2][(i, j)]]
}

/// RGB → HSV with every component rescaled to `[0, 255]`.
pub fn hsv_planes(frame: &Frame) -> [RealMap; 3] {
    let color = frame.to_color();
    let (r, g, b) = (color.channel(0), color.channel(1), color.channel(2));
    let (rows, cols) = (frame.height(), frame.width());
    let mut h = RealMap::zeros(rows, cols);
    let mut s = RealMap::zeros(rows, cols);
    let mut v = RealMap::zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            let (rr, gg, bb) = (r[(i, j)], g[(i, j)], b[(i, j)]);
            let max = rr.max(gg).max(bb);
            let min = rr.min(gg).min(bb);
            let delta = max - min;
            let hue = if delta <= 0.0 {
                0.0
            } else if max == rr {
                60.0 * ((gg - bb) / delta)
            } else if max == gg {
                60.0 * ((bb - rr) / delta) + 120.0
            } else {
                60.0 * ((rr - gg) / delta) + 240.0
            };
            h[(i, j)] = hue.rem_euclid(360.0) / 360.0 * 255.0;
            s[(i, j)] = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
            v[(i, j)] = max;
        }
    }
    [h, s, v]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
