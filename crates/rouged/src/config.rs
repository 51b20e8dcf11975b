use rouge_core::{BlendMode, OverlayParams, PipelineConfig, PipelineMode};

/// Default per-request wall-clock bound covering decode + process + encode.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default upload cap (10 MiB).
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Which deployment shape to run (`heuristic` or `landmark`).
    pub pipeline: PipelineMode,
    /// Working-buffer bounds; uploads are downscaled to fit.
    pub max_width: u32,
    pub max_height: u32,
    /// Optional blend override applied to the selected strategy.
    pub blend_factor: Option<f32>,
    pub blend_mode: Option<BlendMode>,
    /// Wall-clock bound per request; timed-out work is abandoned.
    pub request_timeout_secs: u64,
    /// Maximum accepted upload size in bytes.
    pub max_image_bytes: usize,
}

impl Config {
    /// Load configuration from `ROUGE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            pipeline: std::env::var("ROUGE_PIPELINE")
                .ok()
                .and_then(|v| parse_mode(&v))
                .unwrap_or(PipelineMode::Heuristic),
            max_width: env_u32("ROUGE_MAX_WIDTH", rouge_core::raster::MAX_WORKING_DIM),
            max_height: env_u32("ROUGE_MAX_HEIGHT", rouge_core::raster::MAX_WORKING_DIM),
            blend_factor: std::env::var("ROUGE_BLEND_FACTOR")
                .ok()
                .and_then(|v| v.parse().ok()),
            blend_mode: std::env::var("ROUGE_BLEND_MODE")
                .ok()
                .and_then(|v| parse_blend_mode(&v)),
            request_timeout_secs: env_u64("ROUGE_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            max_image_bytes: env_usize("ROUGE_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
        }
    }

    /// Assemble the core pipeline configuration. The blend override replaces
    /// the selected strategy's defaults wholesale: an unset factor falls
    /// back to 0.7, an unset mode to linear.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let params_override = match (self.blend_factor, self.blend_mode) {
            (None, None) => None,
            (factor, mode) => Some(OverlayParams {
                blend_factor: factor.unwrap_or(0.7).clamp(0.0, 1.0),
                blend_mode: mode.unwrap_or(BlendMode::Linear),
            }),
        };
        PipelineConfig {
            max_width: self.max_width,
            max_height: self.max_height,
            params_override,
        }
    }
}

fn parse_mode(value: &str) -> Option<PipelineMode> {
    match value.to_ascii_lowercase().as_str() {
        "heuristic" => Some(PipelineMode::Heuristic),
        "landmark" | "landmark-guided" => Some(PipelineMode::LandmarkGuided),
        _ => None,
    }
}

fn parse_blend_mode(value: &str) -> Option<BlendMode> {
    match value.to_ascii_lowercase().as_str() {
        "linear" => Some(BlendMode::Linear),
        "multiply" => Some(BlendMode::Multiply),
        _ => None,
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
