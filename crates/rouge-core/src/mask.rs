//! Geometric lip mask.
//!
//! A front-facing, tightly-cropped portrait tends to place the mouth in the
//! lower-middle of the frame. The geometric estimate exploits that: a
//! soft-edged ellipse at a fixed fractional position, independent of pixel
//! content. The fractions are tuned for portrait framing; arbitrary aspect
//! ratios or multi-subject photos are outside what this mask can represent.

// --- Lip region fractions (of image width/height) ---
const CENTER_X_FRAC: f32 = 0.5;
/// Lower third of the frame.
const CENTER_Y_FRAC: f32 = 2.0 / 3.0;
/// Semi-axis: ~25% of image width spanned by the ellipse.
const SEMI_X_FRAC: f32 = 0.125;
/// Semi-axis: ~10% of image height spanned by the ellipse.
const SEMI_Y_FRAC: f32 = 0.05;
/// Mask weight at the ellipse boundary; center weight is 1.0.
const EDGE_OPACITY: f32 = 0.3;

/// Soft-edged elliptical lip mask at a fixed fractional position.
///
/// Weights fall radially from 1.0 at the center to [`EDGE_OPACITY`] at the
/// boundary, and 0.0 outside, so a blended overlay fades instead of
/// hard-edging.
#[derive(Debug, Clone, Copy)]
pub struct EllipseMask {
    center_x: f32,
    center_y: f32,
    semi_x: f32,
    semi_y: f32,
}

impl EllipseMask {
    /// Build the mask for an image of the given dimensions.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        Self {
            center_x: width as f32 * CENTER_X_FRAC,
            center_y: height as f32 * CENTER_Y_FRAC,
            semi_x: (width as f32 * SEMI_X_FRAC).max(1.0),
            semi_y: (height as f32 * SEMI_Y_FRAC).max(1.0),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.center_x, self.center_y)
    }

    pub fn semi_axes(&self) -> (f32, f32) {
        (self.semi_x, self.semi_y)
    }

    /// Mask weight at pixel `(x, y)` in [0, 1].
    pub fn weight_at(&self, x: u32, y: u32) -> f32 {
        // Normalized radius: 0 at center, 1 on the ellipse boundary.
        let dx = (x as f32 + 0.5 - self.center_x) / self.semi_x;
        let dy = (y as f32 + 0.5 - self.center_y) / self.semi_y;
        let radius = (dx * dx + dy * dy).sqrt();
        if radius >= 1.0 {
            0.0
        } else {
            1.0 - radius * (1.0 - EDGE_OPACITY)
        }
    }
}
