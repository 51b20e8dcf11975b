use anyhow::Result;
use rouge_core::PipelineMode;
use tracing_subscriber::EnvFilter;

mod config;
mod detector;
mod engine;

use config::Config;
use engine::EngineConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rouged starting");

    let config = Config::from_env();
    tracing::info!(
        mode = ?config.pipeline,
        max_width = config.max_width,
        max_height = config.max_height,
        timeout_secs = config.request_timeout_secs,
        "configuration loaded"
    );

    // The landmark detector is an external collaborator; a backend is
    // registered per deployment. This build ships none, so landmark mode
    // cannot start.
    if config.pipeline == PipelineMode::LandmarkGuided {
        anyhow::bail!(
            "no landmark detector backend registered in this build; \
             set ROUGE_PIPELINE=heuristic or link a detector backend"
        );
    }

    let engine_config = EngineConfig {
        mode: config.pipeline,
        pipeline: config.pipeline_config(),
        request_timeout_secs: config.request_timeout_secs,
        max_image_bytes: config.max_image_bytes,
    };
    let _handle = engine::spawn_engine(engine_config, None)
        .map_err(|e| anyhow::anyhow!("engine startup failed: {e}"))?;

    // Transport wiring (HTTP upload intake) is owned by the storefront
    // deployment; the engine handle is the embedding surface.
    tracing::info!("rouged ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("rouged shutting down");

    Ok(())
}
