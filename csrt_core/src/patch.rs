//! Patch extraction and small raster utilities.

use crate::types::{Frame, GridSize, PixelRect, Point2, RealMap};

/// Extract a `width × height` patch centred on `center`, replicating border
/// pixels where the window leaves the frame.
///
/// Also returns the region of the patch that maps to real image pixels.
pub fn get_subwindow(frame: &Frame, center: Point2, width: usize, height: usize) -> (Frame, PixelRect) {
    let width = width.max(1);
    let height = height.max(1);
    let start_x = center.x.floor() as i64 - (width / 2) as i64;
    let start_y = center.y.floor() as i64 - (height / 2) as i64;
    let max_x = frame.width() as i64 - 1;
    let max_y = frame.height() as i64 - 1;

    let channels = frame
        .channels()
        .iter()
        .map(|plane| {
            RealMap::from_fn(height, width, |i, j| {
                let y = (start_y + i as i64).clamp(0, max_y) as usize;
                let x = (start_x + j as i64).clamp(0, max_x) as usize;
                plane[(y, x)]
            })
        })
        .collect();

    let left = (-start_x).max(0);
    let top = (-start_y).max(0);
    let right = (width as i64).min(max_x + 1 - start_x);
    let bottom = (height as i64).min(max_y + 1 - start_y);
    let valid = PixelRect::new(left, top, (right - left).max(0), (bottom - top).max(0));

    (Frame::from_planes(channels), valid)
}

/// Bilinear resize with pixel-centre alignment.
pub fn resize_bilinear(map: &RealMap, size: GridSize) -> RealMap {
    let (in_rows, in_cols) = map.shape();
    if (in_rows, in_cols) == (size.rows, size.cols) {
        return map.clone();
    }
    let sy = in_rows as f64 / size.rows as f64;
    let sx = in_cols as f64 / size.cols as f64;
    let sample = |coord: f64, len: usize| -> (usize, usize, f64) {
        let c = coord.clamp(0.0, (len - 1) as f64);
        let lo = c.floor() as usize;
        let hi = (lo + 1).min(len - 1);
        (lo, hi, c - lo as f64)
    };
    RealMap::from_fn(size.rows, size.cols, |i, j| {
        let (y0, y1, fy) = sample((i as f64 + 0.5) * sy - 0.5, in_rows);
        let (x0, x1, fx) = sample((j as f64 + 0.5) * sx - 0.5, in_cols);
        let top = map[(y0, x0)] * (1.0 - fx) + map[(y0, x1)] * fx;
        let bottom = map[(y1, x0)] * (1.0 - fx) + map[(y1, x1)] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}

/// Nearest-neighbour resize (keeps binary masks binary).
///
/// The second half of each axis samples the mirror of the first, so the
/// resize commutes with reflection.
pub fn resize_nearest(map: &RealMap, size: GridSize) -> RealMap {
    let (in_rows, in_cols) = map.shape();
    if (in_rows, in_cols) == (size.rows, size.cols) {
        return map.clone();
    }
    let rows: Vec<usize> = (0..size.rows).map(|i| nearest_source(i, size.rows, in_rows)).collect();
    let cols: Vec<usize> = (0..size.cols).map(|j| nearest_source(j, size.cols, in_cols)).collect();
    RealMap::from_fn(size.rows, size.cols, |i, j| map[(rows[i], cols[j])])
}

fn nearest_source(i: usize, out_len: usize, in_len: usize) -> usize {
    let s = in_len as f64 / out_len as f64;
    let pick = |k: usize| (((k as f64 + 0.5) * s) as usize).min(in_len - 1);
    if 2 * i < out_len {
        pick(i)
    } else {
        in_len - 1 - pick(out_len - 1 - i)
    }
}

/// Resize every channel of a frame.
pub fn resize_frame(frame: &Frame, size: GridSize) -> Frame {
    let channels = frame
        .channels()
        .iter()
        .map(|c| resize_bilinear(c, size))
        .collect();
    Frame::from_planes(channels)
}

/// Grey-level dilation with the 3×3 elliptical element (a plus shape).
pub fn dilate_cross(map: &RealMap) -> RealMap {
    let (rows, cols) = map.shape();
    RealMap::from_fn(rows, cols, |i, j| {
        let mut v = map[(i, j)];
        if i > 0 {
            v = v.max(map[(i - 1, j)]);
        }
        if i + 1 < rows {
            v = v.max(map[(i + 1, j)]);
        }
        if j > 0 {
            v = v.max(map[(i, j - 1)]);
        }
        if j + 1 < cols {
            v = v.max(map[(i, j + 1)]);
        }
        v
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn indexed_frame(w: usize, h: usize) -> Frame {
        Frame::gray(RealMap::from_fn(h, w, |i, j| (i * 100 + j) as f64)).unwrap()
    }

    #[test]
    fn interior_subwindow_copies_pixels() {
        let frame = indexed_frame(20, 20);
        let (patch, valid) = get_subwindow(&frame, Point2::new(10.0, 10.0), 4, 4);
        // start = 10 - 2 = 8
        assert_eq!(patch.channel(0)[(0, 0)], 808.0);
        assert_eq!(patch.channel(0)[(3, 3)], 1111.0);
        assert_eq!(valid, PixelRect::new(0, 0, 4, 4));
    }

    #[test]
    fn border_subwindow_replicates_and_reports_valid_region() {
        let frame = indexed_frame(10, 10);
        let (patch, valid) = get_subwindow(&frame, Point2::new(1.0, 1.0), 6, 6);
        // start = 1 - 3 = -2 in both axes
        assert_eq!(patch.channel(0)[(0, 0)], 0.0);
        assert_eq!(patch.channel(0)[(2, 2)], 0.0);
        assert_eq!(patch.channel(0)[(3, 3)], 101.0);
        assert_eq!(valid, PixelRect::new(2, 2, 4, 4));
    }

    #[test]
    fn bilinear_resize_of_constant_is_constant() {
        let map = RealMap::from_element(7, 5, 3.25);
        let out = resize_bilinear(&map, GridSize::new(13, 4));
        assert!(out.iter().all(|v| (v - 3.25).abs() < 1e-12));
    }

    #[test]
    fn nearest_resize_keeps_binary_values() {
        let map = RealMap::from_fn(8, 8, |i, _| if i < 4 { 1.0 } else { 0.0 });
        let out = resize_nearest(&map, GridSize::new(4, 4));
        assert!(out.iter().all(|v| *v == 0.0 || *v == 1.0));
        assert_abs_diff_eq!(out.sum(), 8.0);
    }

    #[test]
    fn dilation_grows_a_single_pixel_into_a_cross() {
        let mut map = RealMap::zeros(5, 5);
        map[(2, 2)] = 1.0;
        let out = dilate_cross(&map);
        assert_abs_diff_eq!(out.sum(), 5.0);
        assert_eq!(out[(1, 2)], 1.0);
        assert_eq!(out[(1, 1)], 0.0);
    }
}
