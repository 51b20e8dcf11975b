//! Landmark detector contract.
//!
//! The face/landmark model is an external collaborator — a black-box
//! capability that, given an image, returns zero-or-one face region with an
//! ordered polygon of mouth-boundary points, or reports no detection. This
//! crate only defines the seam; deployments plug in a backend and tests use
//! mocks.

use crate::contour::Point;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector backend unavailable: {0}")]
    Unavailable(String),
    #[error("detector inference failed: {0}")]
    Inference(String),
}

/// Single best-effort detection result (the pipeline is single-face).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub face_found: bool,
    /// Ordered outer mouth contour, typically ~20 points. `None` or empty
    /// is treated identically to `face_found == false`.
    pub mouth_boundary: Option<Vec<Point>>,
}

impl Detection {
    pub fn none() -> Self {
        Self { face_found: false, mouth_boundary: None }
    }

    /// The usable boundary, if any. Normalizes the contract: a face with a
    /// null or empty boundary counts as no detection at all.
    pub fn usable_boundary(&self) -> Option<&[Point]> {
        if !self.face_found {
            return None;
        }
        match self.mouth_boundary.as_deref() {
            Some(points) if !points.is_empty() => Some(points),
            _ => None,
        }
    }
}

/// External face/landmark detector seam.
pub trait LandmarkDetector: Send + Sync {
    fn detect(&self, image: &RgbaImage) -> Result<Detection, DetectorError>;
}

impl std::fmt::Debug for dyn LandmarkDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn LandmarkDetector")
    }
}
