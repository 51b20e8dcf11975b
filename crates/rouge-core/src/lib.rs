//! rouge-core — lip-region color-overlay pipeline.
//!
//! Takes an uploaded photo and a target `#RRGGBB` shade and produces a new
//! image with the color applied to the lips. Three strategies cover the
//! precision spectrum: a fixed-geometry ellipse, a per-pixel red-dominance
//! classifier, and a contour fill guided by an external landmark detector.

pub mod color;
pub mod contour;
pub mod detect;
pub mod mask;
pub mod pipeline;
pub mod raster;
pub mod strategy;

pub use color::{BlendMode, ColorError, Rgb};
pub use contour::{ContourError, Point};
pub use detect::{Detection, DetectorError, LandmarkDetector};
pub use pipeline::{
    PipelineConfig, PipelineMode, Stage, TryOnError, TryOnOutput, TryOnPipeline,
};
pub use strategy::{
    GeometricEstimate, HeuristicClassifier, LandmarkGuided, LipHint, LipOverlay, OverlayError,
    OverlayParams,
};
