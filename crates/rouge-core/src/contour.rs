//! Mouth contour construction from detector landmarks.
//!
//! The landmark detector hands back an ordered polygon of mouth-boundary
//! points (~20 for a typical detector). Connecting them with straight edges
//! gives a faceted, artificial outline, so the closed path is built as a
//! quadratic B-spline: one curve per landmark, running between the midpoints
//! of its two adjacent edges with the landmark itself as control point. The
//! result is closed, tangent to every edge, and free of self-intersections
//! for a convex-ish mouth shape.

use thiserror::Error;

/// Line segments per quadratic curve when flattening to a polyline.
const CURVE_SEGMENTS: usize = 12;

#[derive(Error, Debug)]
pub enum ContourError {
    #[error("boundary polygon has {0} point(s) — need at least 3 to build a contour")]
    Degenerate(usize),
}

/// A landmark point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Build a smooth closed contour through the ordered boundary points,
/// flattened to a dense polyline whose last point equals its first.
pub fn smooth_closed_contour(boundary: &[Point]) -> Result<Vec<Point>, ContourError> {
    let n = boundary.len();
    if n < 3 {
        return Err(ContourError::Degenerate(n));
    }

    let mut path = Vec::with_capacity(n * CURVE_SEGMENTS + 1);
    path.push(boundary[n - 1].midpoint(boundary[0]));

    for i in 0..n {
        let control = boundary[i];
        let end = control.midpoint(boundary[(i + 1) % n]);
        let start = *path.last().unwrap_or(&control);
        flatten_quadratic(start, control, end, &mut path);
    }

    Ok(path)
}

/// Append the interior samples and endpoint of a quadratic curve from `p0`
/// through control `c` to `p1` (excludes `p0`, which the caller already has).
fn flatten_quadratic(p0: Point, c: Point, p1: Point, out: &mut Vec<Point>) {
    for step in 1..=CURVE_SEGMENTS {
        let t = step as f32 / CURVE_SEGMENTS as f32;
        let u = 1.0 - t;
        let x = u * u * p0.x + 2.0 * u * t * c.x + t * t * p1.x;
        let y = u * u * p0.y + 2.0 * u * t * c.y + t * t * p1.y;
        out.push(Point::new(x, y));
    }
}

/// Rasterize the closed polyline into a per-pixel membership mask using
/// even-odd scanline filling. `mask[y * width + x]` is true inside.
pub fn fill_mask(polyline: &[Point], width: u32, height: u32) -> Vec<bool> {
    let mut mask = vec![false; width as usize * height as usize];
    if polyline.len() < 2 {
        return mask;
    }

    for y in 0..height {
        let scan_y = y as f32 + 0.5;

        // Collect x coordinates where edges cross this scanline.
        let mut crossings: Vec<f32> = Vec::new();
        for pair in polyline.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if (a.y <= scan_y && b.y > scan_y) || (b.y <= scan_y && a.y > scan_y) {
                let t = (scan_y - a.y) / (b.y - a.y);
                crossings.push(a.x + t * (b.x - a.x));
            }
        }
        crossings.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));

        // Even-odd: fill between alternating pairs.
        for span in crossings.chunks_exact(2) {
            let x0 = span[0].max(0.0).ceil() as i64;
            let x1 = span[1].min(width as f32 - 1.0).floor() as i64;
            for x in x0..=x1 {
                if x >= 0 && (x as u32) < width {
                    mask[y as usize * width as usize + x as usize] = true;
                }
            }
        }
    }

    mask
}

/// Pixels along the polyline, clipped to the image, for the thin definition
/// stroke. Adjacent duplicates are collapsed; pixels may still repeat where
/// the path revisits a cell.
pub fn stroke_pixels(polyline: &[Point], width: u32, height: u32) -> Vec<(u32, u32)> {
    let mut pixels = Vec::new();
    let mut last: Option<(u32, u32)> = None;

    for pair in polyline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let steps = ((b.x - a.x).abs().max((b.y - a.y).abs()).ceil() as usize).max(1);
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let x = a.x + t * (b.x - a.x);
            let y = a.y + t * (b.y - a.y);
            if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
                continue;
            }
            let px = (x as u32, y as u32);
            if last != Some(px) {
                pixels.push(px);
                last = Some(px);
            }
        }
    }

    pixels
}
