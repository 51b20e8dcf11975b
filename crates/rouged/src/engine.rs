//! Try-on engine: request intake, per-request tasks, timeouts.
//!
//! Every request is an independent, stateless unit of work: the handle
//! forwards it over a channel, the dispatcher runs the CPU-bound pipeline on
//! the blocking pool, and a wall-clock timeout abandons work that overruns.
//! No state is shared between requests beyond the immutable pipeline
//! configuration and the detector slot.

use crate::detector::{DetectorFactory, DetectorSlot};
use rouge_core::{PipelineConfig, PipelineMode, TryOnError, TryOnPipeline};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Queue depth between handles and the dispatcher.
const REQUEST_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    TryOn(#[from] TryOnError),
    #[error("image payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("landmark pipeline requested but no detector backend registered")]
    NoDetectorBackend,
    #[error("engine dispatcher exited")]
    ChannelClosed,
}

/// Transport-agnostic try-on request (original JSON field names).
/// `productId` is a catalog-correlation field owned by the storefront CRUD
/// layer; it is accepted and ignored here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnRequest {
    pub image: Vec<u8>,
    pub color_hex: String,
    #[serde(default)]
    pub product_id: Option<String>,
}

/// Successful wire reply: both images as `data:image/png;base64,` URIs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnReply {
    pub original_image: String,
    pub processed_image: String,
    pub applied_color: String,
}

/// Failure wire reply: machine-readable kind plus human-readable message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&EngineError> for ErrorReply {
    fn from(err: &EngineError) -> Self {
        let (kind, retryable) = match err {
            EngineError::TryOn(e) => (e.kind(), e.retryable()),
            EngineError::PayloadTooLarge { .. } => ("payload_too_large", false),
            EngineError::Timeout(_) => ("timeout", true),
            EngineError::NoDetectorBackend => ("processing_failure", false),
            EngineError::ChannelClosed => ("processing_failure", true),
        };
        Self {
            kind: kind.to_string(),
            message: err.to_string(),
            retryable,
        }
    }
}

/// Engine tuning taken from daemon configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub mode: PipelineMode,
    pub pipeline: PipelineConfig,
    pub request_timeout_secs: u64,
    pub max_image_bytes: usize,
}

struct EngineRequest {
    request: TryOnRequest,
    reply: oneshot::Sender<Result<TryOnReply, EngineError>>,
}

/// Clone-safe handle to the engine dispatcher.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Submit one try-on request and await its reply.
    pub async fn try_on(&self, request: TryOnRequest) -> Result<TryOnReply, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest { request, reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

enum Runner {
    /// Pipeline built once; shared read-only across requests.
    Heuristic(Arc<TryOnPipeline>),
    /// Pipeline built per request after the detector slot reports ready.
    Landmark {
        pipeline: PipelineConfig,
        slot: Arc<DetectorSlot>,
    },
}

/// Spawn the engine dispatcher.
///
/// Heuristic mode needs no detector; landmark mode requires a backend
/// factory and fails fast without one.
pub fn spawn_engine(
    config: EngineConfig,
    backend: Option<DetectorFactory>,
) -> Result<EngineHandle, EngineError> {
    let runner = match config.mode {
        PipelineMode::Heuristic => {
            Runner::Heuristic(Arc::new(TryOnPipeline::heuristic(config.pipeline)))
        }
        PipelineMode::LandmarkGuided => {
            let factory = backend.ok_or(EngineError::NoDetectorBackend)?;
            Runner::Landmark {
                pipeline: config.pipeline,
                slot: Arc::new(DetectorSlot::new(factory)),
            }
        }
    };
    let runner = Arc::new(runner);

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(REQUEST_QUEUE_DEPTH);

    tokio::spawn(async move {
        tracing::info!(mode = ?config.mode, "engine dispatcher started");
        while let Some(EngineRequest { request, reply }) = rx.recv().await {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                let result = handle_request(&runner, &config, request).await;
                if let Err(err) = &result {
                    tracing::warn!(error = %err, "try-on request failed");
                }
                // Caller may have disconnected; dropping the reply is fine.
                let _ = reply.send(result);
            });
        }
        tracing::info!("engine dispatcher exiting");
    });

    Ok(EngineHandle { tx })
}

async fn handle_request(
    runner: &Runner,
    config: &EngineConfig,
    request: TryOnRequest,
) -> Result<TryOnReply, EngineError> {
    if request.image.len() > config.max_image_bytes {
        return Err(EngineError::PayloadTooLarge {
            size: request.image.len(),
            limit: config.max_image_bytes,
        });
    }
    if let Some(product_id) = &request.product_id {
        tracing::debug!(product_id, "catalog correlation field present (ignored)");
    }

    let pipeline = match runner {
        Runner::Heuristic(pipeline) => Arc::clone(pipeline),
        Runner::Landmark { pipeline, slot } => {
            let detector = slot.ready().await.map_err(TryOnError::from)?;
            Arc::new(TryOnPipeline::landmark_guided(*pipeline, detector))
        }
    };

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let work = tokio::task::spawn_blocking(move || {
        pipeline
            .try_on(&request.image, &request.color_hex)
            .map(|output| TryOnReply {
                original_image: output.original_data_uri(),
                processed_image: output.processed_data_uri(),
                applied_color: output.applied_color_hex(),
            })
    });

    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_err)) => Err(EngineError::TryOn(TryOnError::ProcessingFailure(
            join_err.to_string(),
        ))),
        // Abandon the in-flight buffer work; no partial image is returned.
        Err(_) => Err(EngineError::Timeout(config.request_timeout_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rouge_core::{Detection, DetectorError, LandmarkDetector, Point};

    fn portrait_png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([180, 165, 160, 255]));
        rouge_core::raster::encode_png(&img).unwrap()
    }

    fn engine_config(mode: PipelineMode) -> EngineConfig {
        EngineConfig {
            mode,
            pipeline: PipelineConfig::default(),
            request_timeout_secs: 30,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }

    struct MouthDetector;

    impl LandmarkDetector for MouthDetector {
        fn detect(&self, image: &RgbaImage) -> Result<Detection, DetectorError> {
            let (cx, cy) = (image.width() as f32 / 2.0, image.height() as f32 * 0.66);
            let boundary = (0..16)
                .map(|i| {
                    let theta = i as f32 / 16.0 * std::f32::consts::TAU;
                    Point::new(cx + 40.0 * theta.cos(), cy + 15.0 * theta.sin())
                })
                .collect();
            Ok(Detection { face_found: true, mouth_boundary: Some(boundary) })
        }
    }

    #[tokio::test]
    async fn test_heuristic_request_roundtrip() {
        let handle = spawn_engine(engine_config(PipelineMode::Heuristic), None).unwrap();
        let reply = handle
            .try_on(TryOnRequest {
                image: portrait_png(200, 200),
                color_hex: "#C4485B".into(),
                product_id: Some("lipstick-042".into()),
            })
            .await
            .unwrap();

        assert!(reply.original_image.starts_with("data:image/png;base64,"));
        assert!(reply.processed_image.starts_with("data:image/png;base64,"));
        assert_eq!(reply.applied_color, "#C4485B");
    }

    #[tokio::test]
    async fn test_invalid_color_maps_to_error_reply() {
        let handle = spawn_engine(engine_config(PipelineMode::Heuristic), None).unwrap();
        let err = handle
            .try_on(TryOnRequest {
                image: portrait_png(50, 50),
                color_hex: "crimson".into(),
                product_id: None,
            })
            .await
            .unwrap_err();

        let reply = ErrorReply::from(&err);
        assert_eq!(reply.kind, "invalid_color_format");
        assert!(!reply.retryable);
    }

    #[tokio::test]
    async fn test_payload_cap_enforced() {
        let mut config = engine_config(PipelineMode::Heuristic);
        config.max_image_bytes = 64;
        let handle = spawn_engine(config, None).unwrap();
        let err = handle
            .try_on(TryOnRequest {
                image: portrait_png(100, 100),
                color_hex: "#FF0000".into(),
                product_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PayloadTooLarge { .. }));
        assert_eq!(ErrorReply::from(&err).kind, "payload_too_large");
    }

    #[tokio::test]
    async fn test_landmark_mode_requires_backend() {
        let err = spawn_engine(engine_config(PipelineMode::LandmarkGuided), None).unwrap_err();
        assert!(matches!(err, EngineError::NoDetectorBackend));
    }

    #[tokio::test]
    async fn test_landmark_request_roundtrip() {
        let backend: DetectorFactory =
            Arc::new(|| Ok(Arc::new(MouthDetector) as Arc<dyn LandmarkDetector>));
        let handle =
            spawn_engine(engine_config(PipelineMode::LandmarkGuided), Some(backend)).unwrap();

        let reply = handle
            .try_on(TryOnRequest {
                image: portrait_png(300, 300),
                color_hex: "#AA2244".into(),
                product_id: None,
            })
            .await
            .unwrap();
        assert_eq!(reply.applied_color, "#AA2244");
        assert_ne!(reply.original_image, reply.processed_image);
    }

    #[tokio::test]
    async fn test_failed_backend_surfaces_as_processing_failure() {
        let backend: DetectorFactory =
            Arc::new(|| Err(DetectorError::Unavailable("weights missing".into())));
        let handle =
            spawn_engine(engine_config(PipelineMode::LandmarkGuided), Some(backend)).unwrap();

        let err = handle
            .try_on(TryOnRequest {
                image: portrait_png(100, 100),
                color_hex: "#FF0000".into(),
                product_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(ErrorReply::from(&err).kind, "processing_failure");
    }

    #[test]
    fn test_wire_field_names_match_storefront_api() {
        let request: TryOnRequest = serde_json::from_value(serde_json::json!({
            "image": [1, 2, 3],
            "colorHex": "#FF0000",
            "productId": "lipstick-042",
        }))
        .unwrap();
        assert_eq!(request.color_hex, "#FF0000");
        assert_eq!(request.product_id.as_deref(), Some("lipstick-042"));

        let reply = TryOnReply {
            original_image: "data:image/png;base64,AA==".into(),
            processed_image: "data:image/png;base64,BB==".into(),
            applied_color: "#FF0000".into(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert!(json.get("originalImage").is_some());
        assert!(json.get("processedImage").is_some());
        assert!(json.get("appliedColor").is_some());

        let error = ErrorReply {
            kind: "no_face_detected".into(),
            message: "no face visible — try another photo".into(),
            retryable: false,
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "no_face_detected");
    }

    #[tokio::test]
    async fn test_request_timeout_abandons_work() {
        let mut config = engine_config(PipelineMode::Heuristic);
        config.request_timeout_secs = 0;
        let handle = spawn_engine(config, None).unwrap();

        let err = handle
            .try_on(TryOnRequest {
                image: portrait_png(800, 800),
                color_hex: "#FF0000".into(),
                product_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Timeout(0)));
        let reply = ErrorReply::from(&err);
        assert_eq!(reply.kind, "timeout");
        assert!(reply.retryable, "a timed-out request is safe to retry");
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let handle = spawn_engine(engine_config(PipelineMode::Heuristic), None).unwrap();
        let a = handle.try_on(TryOnRequest {
            image: portrait_png(150, 150),
            color_hex: "#FF0000".into(),
            product_id: None,
        });
        let b = handle.try_on(TryOnRequest {
            image: portrait_png(150, 150),
            color_hex: "#0000FF".into(),
            product_id: None,
        });

        let (ra, rb) = tokio::join!(a, b);
        assert_eq!(ra.unwrap().applied_color, "#FF0000");
        assert_eq!(rb.unwrap().applied_color, "#0000FF");
    }
}
