//! Top-level try-on orchestration.
//!
//! One pipeline per deployment, one invocation per request. Control flow is
//! validate → normalize → select strategy → apply color → encode, with
//! fail-fast validation: the color string and payload presence are checked
//! before any pixel work begins.
//!
//! Two deployment shapes exist (never combined in one call):
//! - **Heuristic**: runs the pixel classifier, which internally falls back
//!   to the geometric estimate on zero classified pixels. Never needs a
//!   detector and never reports detection errors.
//! - **Landmark-guided**: consults the external detector and surfaces
//!   `NoFaceDetected` / `NoLipLandmarks` to the caller — no silent
//!   downgrade, because this deployment has no other strategy.

use crate::color::{ColorError, Rgb};
use crate::contour::ContourError;
use crate::detect::{DetectorError, LandmarkDetector};
use crate::raster::{self, RasterError};
use crate::strategy::{
    GeometricEstimate, HeuristicClassifier, LandmarkGuided, LipHint, LipOverlay, OverlayError,
    OverlayParams,
};
use std::sync::Arc;
use thiserror::Error;

/// Minimum usable mouth boundary (a closed contour needs 3 points).
const MIN_BOUNDARY_POINTS: usize = 3;

/// Per-request processing stages, logged at each transition. Failure is the
/// `Err` arm of [`TryOnPipeline::try_on`], reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Normalizing,
    Detecting,
    Blending,
    Encoding,
    Done,
}

/// Failure taxonomy surfaced to the storefront. `kind()` is the stable
/// machine-readable discriminant; the `Display` text is the human message.
#[derive(Error, Debug)]
pub enum TryOnError {
    #[error("target color must be a 6-hex-digit string like #C4485B, got {0:?}")]
    InvalidColorFormat(String),
    #[error("uploaded bytes are not a decodable image: {0}")]
    DecodeError(String),
    #[error("no image payload supplied")]
    EmptyOrMissingImage,
    #[error("no face visible — try another photo")]
    NoFaceDetected,
    #[error("a face was found but its mouth landmarks are unusable — try another photo")]
    NoLipLandmarks,
    #[error("unexpected processing failure: {0}")]
    ProcessingFailure(String),
}

impl TryOnError {
    /// Stable machine-readable discriminant for wire responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidColorFormat(_) => "invalid_color_format",
            Self::DecodeError(_) => "decode_error",
            Self::EmptyOrMissingImage => "empty_or_missing_image",
            Self::NoFaceDetected => "no_face_detected",
            Self::NoLipLandmarks => "no_lip_landmarks",
            Self::ProcessingFailure(_) => "processing_failure",
        }
    }

    /// Whether retrying the same request could ever succeed. Everything but
    /// `ProcessingFailure` requires different input.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ProcessingFailure(_))
    }
}

impl From<ColorError> for TryOnError {
    fn from(err: ColorError) -> Self {
        let ColorError::InvalidFormat(s) = err;
        Self::InvalidColorFormat(s)
    }
}

impl From<RasterError> for TryOnError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::Empty => Self::EmptyOrMissingImage,
            RasterError::Decode(e) => Self::DecodeError(e.to_string()),
            RasterError::Encode(e) => Self::ProcessingFailure(e.to_string()),
        }
    }
}

impl From<OverlayError> for TryOnError {
    fn from(err: OverlayError) -> Self {
        match err {
            OverlayError::MissingBoundary => Self::NoFaceDetected,
            OverlayError::Contour(ContourError::Degenerate(_)) => Self::NoLipLandmarks,
        }
    }
}

impl From<DetectorError> for TryOnError {
    fn from(err: DetectorError) -> Self {
        Self::ProcessingFailure(err.to_string())
    }
}

/// Which deployment shape this pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Heuristic,
    LandmarkGuided,
}

/// Pipeline construction knobs. Blend parameters default per strategy; an
/// override applies to whichever strategy the mode selects.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub params_override: Option<OverlayParams>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_width: raster::MAX_WORKING_DIM,
            max_height: raster::MAX_WORKING_DIM,
            params_override: None,
        }
    }
}

enum Selected {
    Heuristic(HeuristicClassifier),
    Landmark {
        strategy: LandmarkGuided,
        detector: Arc<dyn LandmarkDetector>,
    },
}

/// Successful try-on result. Both images are PNG; per-request state ends
/// here — nothing is cached or persisted.
#[derive(Debug)]
pub struct TryOnOutput {
    /// Normalized (resized) original, before any overlay.
    pub original_png: Vec<u8>,
    pub processed_png: Vec<u8>,
    pub color: Rgb,
}

impl TryOnOutput {
    pub fn original_data_uri(&self) -> String {
        raster::png_data_uri(&self.original_png)
    }

    pub fn processed_data_uri(&self) -> String {
        raster::png_data_uri(&self.processed_png)
    }

    pub fn applied_color_hex(&self) -> String {
        self.color.to_hex()
    }
}

/// Stateless try-on pipeline; safe to share across concurrent requests.
pub struct TryOnPipeline {
    config: PipelineConfig,
    selected: Selected,
}

impl TryOnPipeline {
    /// Server-side fixed pipeline: heuristic classifier with internal
    /// geometric fallback. Guaranteed to produce an image for valid input.
    pub fn heuristic(config: PipelineConfig) -> Self {
        let strategy = HeuristicClassifier {
            params_override: config.params_override,
            fallback: GeometricEstimate::default(),
        };
        Self { config, selected: Selected::Heuristic(strategy) }
    }

    /// Detector-guided pipeline: precise contour fill, explicit failures.
    pub fn landmark_guided(config: PipelineConfig, detector: Arc<dyn LandmarkDetector>) -> Self {
        let mut strategy = LandmarkGuided::default();
        if let Some(params) = config.params_override {
            strategy.params = params;
        }
        Self { config, selected: Selected::Landmark { strategy, detector } }
    }

    pub fn mode(&self) -> PipelineMode {
        match self.selected {
            Selected::Heuristic(_) => PipelineMode::Heuristic,
            Selected::Landmark { .. } => PipelineMode::LandmarkGuided,
        }
    }

    /// Run one try-on request to completion.
    pub fn try_on(&self, image_bytes: &[u8], color_hex: &str) -> Result<TryOnOutput, TryOnError> {
        tracing::debug!(stage = ?Stage::Received, bytes = image_bytes.len(), color = color_hex, "try-on request");

        // Fail fast: reject bad input before any pixel work.
        tracing::debug!(stage = ?Stage::Validating, "validating request");
        let shade = Rgb::from_hex(color_hex)?;
        if image_bytes.is_empty() {
            return Err(TryOnError::EmptyOrMissingImage);
        }

        tracing::debug!(stage = ?Stage::Normalizing, "normalizing image");
        let working =
            raster::resize_to_working(image_bytes, self.config.max_width, self.config.max_height)?;

        let processed = match &self.selected {
            Selected::Heuristic(strategy) => {
                tracing::debug!(stage = ?Stage::Blending, strategy = strategy.name(), "applying overlay");
                strategy.apply(&working, shade, &LipHint::None)?
            }
            Selected::Landmark { strategy, detector } => {
                tracing::debug!(stage = ?Stage::Detecting, "invoking landmark detector");
                let detection = detector.detect(&working)?;
                let boundary = detection
                    .usable_boundary()
                    .ok_or(TryOnError::NoFaceDetected)?;
                if boundary.len() < MIN_BOUNDARY_POINTS {
                    return Err(TryOnError::NoLipLandmarks);
                }
                let hint = LipHint::Boundary(boundary.to_vec());

                tracing::debug!(stage = ?Stage::Blending, strategy = strategy.name(), landmarks = boundary.len(), "applying overlay");
                strategy.apply(&working, shade, &hint)?
            }
        };

        tracing::debug!(stage = ?Stage::Encoding, "encoding output");
        let original_png = raster::encode_png(&working)?;
        let processed_png = raster::encode_png(&processed)?;

        tracing::debug!(stage = ?Stage::Done, "try-on complete");
        Ok(TryOnOutput { original_png, processed_png, color: shade })
    }
}
