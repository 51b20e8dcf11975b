//! Color codec and blend math.
//!
//! Product shades arrive as `#RRGGBB` strings; everything downstream works
//! on exact 8-bit RGB triples. Blending is per-channel and never touches
//! alpha.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ColorError {
    #[error("invalid color format: {0:?} — expected #RRGGBB")]
    InvalidFormat(String),
}

/// An 8-bit RGB triple decoded from a `#RRGGBB` shade string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a strict `#RRGGBB` string. Hex digit pairs map 1:1 to byte
    /// values, so the conversion is exact in both directions.
    pub fn from_hex(s: &str) -> Result<Self, ColorError> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| ColorError::InvalidFormat(s.to_string()))?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidFormat(s.to_string()));
        }

        let byte_at = |i: usize| -> u8 {
            // Validated above: always two ASCII hex digits.
            u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0)
        };

        Ok(Self {
            r: byte_at(0),
            g: byte_at(2),
            b: byte_at(4),
        })
    }

    /// Format as uppercase `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Scale all channels by `factor` (clamped to [0, 1]).
    ///
    /// Used for the landmark definition stroke, drawn at ~70% of the shade's
    /// brightness.
    pub fn scaled(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * f).round() as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

/// How the target shade is composited over the original pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Straight interpolation toward the target: `orig×(1−f) + target×f`.
    #[default]
    Linear,
    /// Pigment-style composite: the target is first multiplied against the
    /// original channel, then interpolated in. Result tends darker than
    /// linear for the same factor, approximating pigment over skin tone.
    Multiply,
}

/// Blend a single channel of the target shade into the original channel.
///
/// `factor` is the blend factor in [0, 1]: 0 leaves the original untouched,
/// 1 fully applies the (mode-composited) target.
pub fn blend_channel(mode: BlendMode, original: u8, target: u8, factor: f32) -> u8 {
    let f = factor.clamp(0.0, 1.0);
    let orig = original as f32;
    let composited = match mode {
        BlendMode::Linear => target as f32,
        BlendMode::Multiply => orig * target as f32 / 255.0,
    };
    (orig * (1.0 - f) + composited * f).round().clamp(0.0, 255.0) as u8
}

/// Blend an RGB triple into `(r, g, b)` channels, leaving alpha to the caller.
pub fn blend_rgb(mode: BlendMode, original: [u8; 3], target: Rgb, factor: f32) -> [u8; 3] {
    [
        blend_channel(mode, original[0], target.r, factor),
        blend_channel(mode, original[1], target.g, factor),
        blend_channel(mode, original[2], target.b, factor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_exact() {
        let c = Rgb::from_hex("#D4486B").unwrap();
        assert_eq!(c, Rgb::new(0xD4, 0x48, 0x6B));
    }

    #[test]
    fn test_from_hex_lowercase() {
        let c = Rgb::from_hex("#ff00aa").unwrap();
        assert_eq!(c, Rgb::new(255, 0, 170));
    }

    #[test]
    fn test_hex_roundtrip_case_normalized() {
        for s in ["#FF0000", "#00ff7f", "#Abc123", "#000000", "#FFFFFF"] {
            let c = Rgb::from_hex(s).unwrap();
            assert_eq!(c.to_hex(), s.to_uppercase());
        }
    }

    #[test]
    fn test_from_hex_rejects_malformed() {
        for s in [
            "", "#", "FF0000", "#FF000", "#FF00000", "#GG0000", "#FF 000",
            "##F0000", "#ff00zz", "red",
        ] {
            assert!(
                matches!(Rgb::from_hex(s), Err(ColorError::InvalidFormat(_))),
                "expected rejection for {s:?}"
            );
        }
    }

    #[test]
    fn test_scaled_brightness() {
        let c = Rgb::new(200, 100, 50).scaled(0.7);
        assert_eq!(c, Rgb::new(140, 70, 35));
    }

    #[test]
    fn test_scaled_clamps_factor() {
        assert_eq!(Rgb::new(10, 20, 30).scaled(2.0), Rgb::new(10, 20, 30));
        assert_eq!(Rgb::new(10, 20, 30).scaled(-1.0), Rgb::new(0, 0, 0));
    }

    #[test]
    fn test_linear_blend_endpoints() {
        assert_eq!(blend_channel(BlendMode::Linear, 40, 200, 0.0), 40);
        assert_eq!(blend_channel(BlendMode::Linear, 40, 200, 1.0), 200);
    }

    #[test]
    fn test_linear_blend_sixty_percent() {
        // round(100×0.4 + 200×0.6) = round(160) = 160
        assert_eq!(blend_channel(BlendMode::Linear, 100, 200, 0.6), 160);
    }

    #[test]
    fn test_multiply_never_lighter_than_linear() {
        for orig in [0u8, 30, 128, 200, 255] {
            for target in [0u8, 64, 180, 255] {
                let lin = blend_channel(BlendMode::Linear, orig, target, 0.7);
                let mul = blend_channel(BlendMode::Multiply, orig, target, 0.7);
                assert!(mul <= lin, "multiply lighter than linear: orig={orig} target={target}");
            }
        }
    }

    #[test]
    fn test_multiply_white_target_is_identity() {
        // target=255 makes the composite equal the original channel
        for orig in [0u8, 17, 128, 254, 255] {
            assert_eq!(blend_channel(BlendMode::Multiply, orig, 255, 0.7), orig);
        }
    }

    #[test]
    fn test_blend_rgb_per_channel_independence() {
        let out = blend_rgb(BlendMode::Linear, [0, 128, 255], Rgb::new(255, 128, 0), 0.5);
        assert_eq!(out, [128, 128, 128]);
    }
}
