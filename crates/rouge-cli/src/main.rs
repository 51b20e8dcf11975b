use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rouge_core::{
    raster, BlendMode, GeometricEstimate, HeuristicClassifier, LipHint, LipOverlay,
    OverlayParams, Rgb,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rouge", about = "Rouge virtual lipstick try-on CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Fixed-proportion ellipse overlay (content-independent).
    Geometric,
    /// Red-dominance pixel classifier with geometric fallback.
    Heuristic,
}

#[derive(Clone, Copy, ValueEnum)]
enum BlendModeArg {
    Linear,
    Multiply,
}

impl From<BlendModeArg> for BlendMode {
    fn from(arg: BlendModeArg) -> Self {
        match arg {
            BlendModeArg::Linear => BlendMode::Linear,
            BlendModeArg::Multiply => BlendMode::Multiply,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a lipstick shade to a photo
    Apply {
        /// Input photo (PNG or JPEG)
        #[arg(short, long)]
        image: PathBuf,
        /// Target shade as #RRGGBB
        #[arg(short, long)]
        color: String,
        /// Overlay strategy
        #[arg(short, long, value_enum, default_value_t = StrategyArg::Heuristic)]
        strategy: StrategyArg,
        /// Blend factor override (0.0-1.0)
        #[arg(long)]
        blend_factor: Option<f32>,
        /// Blend mode override
        #[arg(long, value_enum)]
        blend_mode: Option<BlendModeArg>,
        /// Working-buffer bound for both dimensions
        #[arg(long, default_value_t = raster::MAX_WORKING_DIM)]
        max_dim: u32,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Check whether a file decodes to a usable image
    Validate {
        image: PathBuf,
    },
    /// Report dimensions and heuristic classification stats
    Inspect {
        image: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            image,
            color,
            strategy,
            blend_factor,
            blend_mode,
            max_dim,
            output,
        } => {
            let shade = Rgb::from_hex(&color)?;
            let bytes =
                std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let working = raster::resize_to_working(&bytes, max_dim, max_dim)?;
            println!(
                "Working buffer: {}x{} ({} strategy)",
                working.width(),
                working.height(),
                match strategy {
                    StrategyArg::Geometric => "geometric",
                    StrategyArg::Heuristic => "heuristic",
                }
            );

            let params_override = blend_factor.map(|factor| OverlayParams {
                blend_factor: factor.clamp(0.0, 1.0),
                blend_mode: blend_mode.map(Into::into).unwrap_or_default(),
            });

            let processed = match strategy {
                StrategyArg::Geometric => {
                    let mut overlay = GeometricEstimate::default();
                    if let Some(params) = params_override {
                        overlay.params = params;
                    }
                    overlay.apply(&working, shade, &LipHint::None)?
                }
                StrategyArg::Heuristic => {
                    let overlay = HeuristicClassifier {
                        params_override,
                        fallback: GeometricEstimate::default(),
                    };
                    overlay.apply(&working, shade, &LipHint::None)?
                }
            };

            let png = raster::encode_png(&processed)?;
            std::fs::write(&output, png)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Applied {} -> {}", shade.to_hex(), output.display());
        }
        Commands::Validate { image } => {
            let bytes =
                std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            if raster::validate(&bytes) {
                println!("{}: valid image", image.display());
            } else {
                bail!("{}: not a decodable image", image.display());
            }
        }
        Commands::Inspect { image } => {
            let bytes =
                std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let working =
                raster::resize_to_working(&bytes, raster::MAX_WORKING_DIM, raster::MAX_WORKING_DIM)?;
            let classified = HeuristicClassifier::classified_count(&working);
            let total = (working.width() * working.height()) as usize;
            println!("Dimensions:  {}x{}", working.width(), working.height());
            println!("Lip-like:    {classified} of {total} pixels");
            if classified == 0 {
                println!("Heuristic strategy would fall back to the geometric estimate.");
            }
        }
    }

    Ok(())
}
