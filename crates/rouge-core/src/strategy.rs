//! Lip overlay strategies.
//!
//! Three interchangeable algorithms derive a lip region and blend the target
//! shade into it, ordered from least to most precise:
//!
//! 1. [`GeometricEstimate`] — fixed-fraction ellipse, never fails.
//! 2. [`HeuristicClassifier`] — per-pixel red-dominance classification with
//!    a positional prior; delegates to the geometric estimate when nothing
//!    classifies.
//! 3. [`LandmarkGuided`] — precise contour fill from detector landmarks;
//!    fails explicitly instead of degrading.
//!
//! All three are pure: same buffer + shade + hint in, same buffer out.

use crate::color::{blend_rgb, BlendMode, Rgb};
use crate::contour::{self, ContourError, Point};
use crate::mask::EllipseMask;
use image::{Rgba, RgbaImage};
use thiserror::Error;

// --- Heuristic classification thresholds ---
const RED_OVER_GREEN: u16 = 20;
const RED_OVER_BLUE: u16 = 10;
/// Vertical band (fractions of height) where lips are plausible.
const BAND_TOP_FRAC: f32 = 0.5;
const BAND_BOTTOM_FRAC: f32 = 0.85;
/// Horizontal band (fractions of width).
const BAND_LEFT_FRAC: f32 = 0.2;
const BAND_RIGHT_FRAC: f32 = 0.8;

// --- Default blend parameters, one per historical variant ---
const GEOMETRIC_DEFAULT_FACTOR: f32 = 0.7;
const HEURISTIC_DEFAULT_FACTOR: f32 = 0.6;
const LANDMARK_DEFAULT_FACTOR: f32 = 0.7;
/// Definition stroke: shade brightness scale and blend strength.
const STROKE_BRIGHTNESS: f32 = 0.7;
const STROKE_FACTOR: f32 = 0.5;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("landmark-guided overlay requires a mouth boundary hint")]
    MissingBoundary,
    #[error(transparent)]
    Contour(#[from] ContourError),
}

/// Region knowledge handed to a strategy.
///
/// The geometric and heuristic strategies derive their own region and ignore
/// the hint; the landmark-guided strategy requires a boundary.
#[derive(Debug, Clone, Default)]
pub enum LipHint {
    #[default]
    None,
    /// Ordered mouth-boundary points from the external detector.
    Boundary(Vec<Point>),
}

/// Tunable blend parameters. The historical variants disagreed on both the
/// factor (0.6 / 0.7 / 0.75) and the mode, so both are configuration; each
/// strategy carries the default matching the variant it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayParams {
    /// Fraction of target shade mixed into each masked pixel, in [0, 1].
    pub blend_factor: f32,
    pub blend_mode: BlendMode,
}

/// One self-contained lip mask + color application algorithm.
pub trait LipOverlay {
    fn name(&self) -> &'static str;

    /// Apply `shade` to the lip region of `image`, returning a new buffer.
    /// Alpha is preserved everywhere.
    fn apply(&self, image: &RgbaImage, shade: Rgb, hint: &LipHint)
        -> Result<RgbaImage, OverlayError>;
}

/// Fixed-proportion ellipse overlay (tuned for front-facing, tightly
/// cropped portraits). The guaranteed-success tail of the fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct GeometricEstimate {
    pub params: OverlayParams,
}

impl Default for GeometricEstimate {
    fn default() -> Self {
        Self {
            params: OverlayParams {
                blend_factor: GEOMETRIC_DEFAULT_FACTOR,
                blend_mode: BlendMode::Linear,
            },
        }
    }
}

impl LipOverlay for GeometricEstimate {
    fn name(&self) -> &'static str {
        "geometric-estimate"
    }

    fn apply(
        &self,
        image: &RgbaImage,
        shade: Rgb,
        _hint: &LipHint,
    ) -> Result<RgbaImage, OverlayError> {
        let mask = EllipseMask::for_dimensions(image.width(), image.height());
        let mut out = image.clone();

        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let weight = mask.weight_at(x, y);
            if weight <= 0.0 {
                continue;
            }
            let Rgba([r, g, b, a]) = *pixel;
            let factor = self.params.blend_factor * weight;
            let [nr, ng, nb] = blend_rgb(self.params.blend_mode, [r, g, b], shade, factor);
            *pixel = Rgba([nr, ng, nb, a]);
        }

        Ok(out)
    }
}

/// Per-pixel red-dominance classifier with a positional prior.
///
/// A zero-match result is a failure of this strategy, not a valid outcome:
/// it delegates to the embedded [`GeometricEstimate`] so the caller always
/// receives a modified image.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier {
    pub params_override: Option<OverlayParams>,
    pub fallback: GeometricEstimate,
}

impl HeuristicClassifier {
    fn params(&self) -> OverlayParams {
        self.params_override.unwrap_or(OverlayParams {
            blend_factor: HEURISTIC_DEFAULT_FACTOR,
            blend_mode: BlendMode::Linear,
        })
    }

    /// The classification predicate, per pixel and order-independent:
    /// red-dominant, inside the positional bands, and not blown out.
    pub fn is_lip_like(pixel: &Rgba<u8>, x: u32, y: u32, width: u32, height: u32) -> bool {
        let Rgba([r, g, b, _]) = *pixel;
        let red_dominant =
            (r as u16) > (g as u16) + RED_OVER_GREEN && (r as u16) > (b as u16) + RED_OVER_BLUE;
        let fx = x as f32;
        let fy = y as f32;
        let in_vertical_band =
            fy > height as f32 * BAND_TOP_FRAC && fy < height as f32 * BAND_BOTTOM_FRAC;
        let in_horizontal_band =
            fx > width as f32 * BAND_LEFT_FRAC && fx < width as f32 * BAND_RIGHT_FRAC;
        let not_blown_out = r < 255;

        red_dominant && in_vertical_band && in_horizontal_band && not_blown_out
    }

    /// Count classified pixels without blending (diagnostics).
    pub fn classified_count(image: &RgbaImage) -> usize {
        let (w, h) = (image.width(), image.height());
        image
            .enumerate_pixels()
            .filter(|&(x, y, px)| Self::is_lip_like(px, x, y, w, h))
            .count()
    }
}

impl LipOverlay for HeuristicClassifier {
    fn name(&self) -> &'static str {
        "heuristic-classifier"
    }

    fn apply(
        &self,
        image: &RgbaImage,
        shade: Rgb,
        hint: &LipHint,
    ) -> Result<RgbaImage, OverlayError> {
        let (width, height) = (image.width(), image.height());
        let params = self.params();
        let mut out = image.clone();
        let mut classified = 0usize;

        for (x, y, pixel) in out.enumerate_pixels_mut() {
            if !Self::is_lip_like(pixel, x, y, width, height) {
                continue;
            }
            let Rgba([r, g, b, a]) = *pixel;
            let [nr, ng, nb] =
                blend_rgb(params.blend_mode, [r, g, b], shade, params.blend_factor);
            *pixel = Rgba([nr, ng, nb, a]);
            classified += 1;
        }

        if classified == 0 {
            // Expected, frequent, non-error path: no lip-like pixels means
            // this strategy has nothing to say about the photo.
            tracing::debug!(width, height, "no pixels classified; using geometric estimate");
            return self.fallback.apply(image, shade, hint);
        }

        tracing::debug!(width, height, classified, "heuristic overlay applied");
        Ok(out)
    }
}

/// Contour fill from an externally detected mouth boundary.
///
/// No silent fallback: a missing or degenerate boundary is an error the
/// caller must handle, because in the landmark deployment the caller has no
/// other strategy available.
#[derive(Debug, Clone, Copy)]
pub struct LandmarkGuided {
    pub params: OverlayParams,
}

impl Default for LandmarkGuided {
    fn default() -> Self {
        Self {
            params: OverlayParams {
                blend_factor: LANDMARK_DEFAULT_FACTOR,
                blend_mode: BlendMode::Multiply,
            },
        }
    }
}

impl LipOverlay for LandmarkGuided {
    fn name(&self) -> &'static str {
        "landmark-guided"
    }

    fn apply(
        &self,
        image: &RgbaImage,
        shade: Rgb,
        hint: &LipHint,
    ) -> Result<RgbaImage, OverlayError> {
        let boundary = match hint {
            LipHint::Boundary(points) if !points.is_empty() => points.as_slice(),
            _ => return Err(OverlayError::MissingBoundary),
        };

        let (width, height) = (image.width(), image.height());
        let path = contour::smooth_closed_contour(boundary)?;
        let mask = contour::fill_mask(&path, width, height);
        let mut out = image.clone();

        for (x, y, pixel) in out.enumerate_pixels_mut() {
            if !mask[y as usize * width as usize + x as usize] {
                continue;
            }
            let Rgba([r, g, b, a]) = *pixel;
            let [nr, ng, nb] =
                blend_rgb(self.params.blend_mode, [r, g, b], shade, self.params.blend_factor);
            *pixel = Rgba([nr, ng, nb, a]);
        }

        // Thin interior stroke at reduced brightness for lip-line definition.
        let stroke_shade = shade.scaled(STROKE_BRIGHTNESS);
        for (x, y) in contour::stroke_pixels(&path, width, height) {
            let Rgba([r, g, b, a]) = *out.get_pixel(x, y);
            let [nr, ng, nb] =
                blend_rgb(self.params.blend_mode, [r, g, b], stroke_shade, STROKE_FACTOR);
            out.put_pixel(x, y, Rgba([nr, ng, nb, a]));
        }

        tracing::debug!(
            width,
            height,
            landmarks = boundary.len(),
            "landmark-guided overlay applied"
        );
        Ok(out)
    }
}
