//! Vegloss CLI - vegetation-loss assessment from satellite imagery

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vegloss_catalog::{
    lookup_region, BlockingCatalogClient, Catalog, CatalogClientOptions, CatalogSceneSource,
    HttpBandReader,
};
use vegloss_core::{GridSpec, Region};
use vegloss_pipeline::scene::Epoch;
use vegloss_pipeline::{run, PipelineParams};
use vegloss_render::{render_figure, write_png, FigureParams};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vegloss")]
#[command(author, version, about = "Vegetation-loss assessment from satellite imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a two-epoch loss assessment over a region
    Assess {
        /// Region name to resolve against the boundary service
        region: String,

        /// Override the boundary lookup with an explicit bounding box:
        /// west south east north (degrees)
        #[arg(long, num_args = 4, value_names = ["WEST", "SOUTH", "EAST", "NORTH"])]
        bbox: Option<Vec<f64>>,

        /// Early epoch years: start end
        #[arg(long, num_args = 2, default_values_t = [2015u16, 2016], value_names = ["START", "END"])]
        early: Vec<u16>,

        /// Recent epoch years: start end
        #[arg(long, num_args = 2, default_values_t = [2022u16, 2023], value_names = ["START", "END"])]
        recent: Vec<u16>,

        /// Scene-level cloud cover ceiling, percent
        #[arg(long, default_value_t = 20.0)]
        cloud_cover: f64,

        /// Analysis grid resolution in meters
        #[arg(long, default_value_t = 1000.0)]
        resolution: f64,

        /// NDVI delta below which a pixel counts as loss
        #[arg(long, default_value_t = -0.15, allow_negative_numbers = true)]
        threshold: f64,

        /// Imagery catalog: pc, es, or a STAC API URL
        #[arg(long, default_value = "pc")]
        catalog: String,

        /// Output directory for the figure and statistics
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Integer upscaling factor for the figure panels
        #[arg(long, default_value_t = 4)]
        scale: u32,
    },
    /// Resolve a region name and print its bounding box
    Boundary {
        /// Region name
        region: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn resolve_region(name: &str, bbox: Option<&[f64]>) -> Result<Region> {
    if let Some(b) = bbox {
        return Region::from_bbox(name, b[0], b[1], b[2], b[3])
            .context("Invalid bounding box");
    }

    let pb = spinner("Resolving region boundary...");
    let region = lookup_region(name)
        .with_context(|| format!("Failed to resolve region '{}'", name))?;
    pb.finish_and_clear();
    Ok(region)
}

fn epoch_from_pair(years: &[u16], which: &str) -> Result<Epoch> {
    Epoch::new(years[0], years[1]).with_context(|| format!("Invalid {} epoch", which))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Assess {
            region,
            bbox,
            early,
            recent,
            cloud_cover,
            resolution,
            threshold,
            catalog,
            out,
            scale,
        } => {
            let start = Instant::now();

            let params = PipelineParams {
                early_epoch: epoch_from_pair(&early, "early")?,
                recent_epoch: epoch_from_pair(&recent, "recent")?,
                cloud_cover_max: cloud_cover,
                resolution_m: resolution,
                threshold,
            };
            params.validate().context("Invalid parameters")?;

            let region = resolve_region(&region, bbox.as_deref())?;
            let grid = GridSpec::from_region(&region, resolution)?;
            info!(
                "Region '{}': {} x {} grid at {} m",
                region.name(),
                grid.cols,
                grid.rows,
                resolution
            );

            let client = BlockingCatalogClient::new(
                Catalog::from_str_or_url(&catalog),
                CatalogClientOptions::default(),
            )
            .context("Failed to create catalog client")?;
            let reader = HttpBandReader::new().context("Failed to create band reader")?;
            let source = CatalogSceneSource::new(client, reader, grid);

            let pb = spinner("Running assessment...");
            let assessment = run(&source, &region, &params)?;
            pb.finish_and_clear();

            std::fs::create_dir_all(&out)
                .with_context(|| format!("Cannot create output directory {}", out.display()))?;

            let figure_path = out.join(format!("{}_loss.png", region.slug()));
            let stats_path = out.join(format!("{}_stats.json", region.slug()));

            let figure_params = FigureParams {
                scale,
                ..FigureParams::default()
            };
            let figure = render_figure(&assessment, resolution, &figure_params)?;
            write_png(&figure, &figure_path).context("Failed to write figure")?;

            let stats_file = File::create(&stats_path)
                .with_context(|| format!("Cannot create {}", stats_path.display()))?;
            serde_json::to_writer_pretty(stats_file, &assessment.stats)
                .context("Failed to write statistics")?;

            let stats = &assessment.stats;
            println!("Assessment for '{}':", region.name());
            println!(
                "  Epochs: {} vs {}",
                params.early_epoch, params.recent_epoch
            );
            println!(
                "  Loss: {} of {} valid pixels ({:.2}%)",
                stats.loss_pixels, stats.valid_pixels, stats.loss_fraction_percent
            );
            println!("  Figure: {}", figure_path.display());
            println!("  Statistics: {}", stats_path.display());
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Boundary { region } => {
            let resolved = resolve_region(&region, None)?;
            let (west, south, east, north) = resolved.bbox();
            println!("Region: {}", resolved.name());
            println!("  Rings: {}", resolved.rings().len());
            println!("  Bounding box: {west:.4} {south:.4} {east:.4} {north:.4}");
        }
    }

    Ok(())
}
