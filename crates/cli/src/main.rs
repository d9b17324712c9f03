//! Brisk CLI - brownfield contamination-risk mapping

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use brisk_algorithms::distance::{distance_to_mask, EmptySourcePolicy, RasterDistanceParams};
use brisk_algorithms::pipeline::{LayerSource, Pipeline, RiskProduct};
use brisk_algorithms::risk::{RiskConfig, Weights};
use brisk_algorithms::terrain::{slope, SlopeParams, SlopeUnits};
use brisk_core::io::{read_feature_set, read_geotiff, write_geotiff, GeoTiffOptions};
use brisk_core::{FeatureSet, GridTemplate, Raster, RasterElement, Region};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "brisk")]
#[command(author, version, about = "Brownfield contamination-risk mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full risk model and write indicators and score
    Run {
        /// Land-cover raster (class codes, 50 = built-up, 60 = bare)
        #[arg(long)]
        land_cover: PathBuf,
        /// Soil texture raster (classes 1-12)
        #[arg(long)]
        soil: PathBuf,
        /// Elevation raster in meters
        #[arg(long)]
        dem: PathBuf,
        /// Watercourses as GeoJSON
        #[arg(long)]
        rivers: PathBuf,
        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Study area as minx,miny,maxx,maxy (default: land-cover extent)
        #[arg(long)]
        region: Option<String>,
        /// Cell size in meters (default: land-cover cell size)
        #[arg(long)]
        cell_size: Option<f64>,
        /// Risk model configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Indicator weights as water,soil,slope,land_cover
        #[arg(short, long)]
        weights: Option<String>,
        /// Also write distance and slope intermediates
        #[arg(long)]
        keep_intermediates: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Calculate slope from DEM
    Slope {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output units: degrees, percent, radians
        #[arg(short, long, default_value = "degrees")]
        units: String,
        /// Z-factor for unit conversion
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
    },
    /// Distance to the nearest cell of a land-cover class
    Distance {
        /// Categorical input raster
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Class code to measure distance to
        #[arg(short, long, default_value = "50")]
        class: u8,
        /// Saturate distances at this value
        #[arg(short, long)]
        max_distance: Option<f64>,
    },
    /// Print the default risk model configuration as JSON
    Config,
}

// ─── Layer source ───────────────────────────────────────────────────────

/// Layers read from local files. Land cover is decoded up front because it
/// also defines the study area.
struct FileSource {
    land_cover: Raster<u8>,
    soil: PathBuf,
    dem: PathBuf,
    rivers: PathBuf,
}

impl FileSource {
    fn raster<T: RasterElement>(&self, layer: &str, path: &Path) -> brisk_core::Result<Raster<T>> {
        let pb = spinner(&format!("Reading {}...", layer));
        let raster = read_geotiff(path).map_err(|e| brisk_core::Error::source_unavailable(layer, e));
        pb.finish_and_clear();
        let raster = raster?;
        debug!("{}: {} x {} from {}", layer, raster.cols(), raster.rows(), path.display());
        Ok(raster)
    }
}

impl LayerSource for FileSource {
    fn land_cover(&self, _template: &GridTemplate) -> brisk_core::Result<Raster<u8>> {
        Ok(self.land_cover.clone())
    }

    fn watercourses(&self, region: &Region) -> brisk_core::Result<FeatureSet> {
        let features = read_feature_set(&self.rivers)
            .map_err(|e| brisk_core::Error::source_unavailable("watercourses", e))?;
        let inside = features.filter_region(region);
        debug!(
            "watercourses: {} of {} features within search window",
            inside.len(),
            features.len()
        );
        Ok(inside)
    }

    fn soil_texture(&self, _template: &GridTemplate) -> brisk_core::Result<Raster<u8>> {
        self.raster("soil_texture", &self.soil)
    }

    fn elevation(&self, _template: &GridTemplate) -> brisk_core::Result<Raster<f64>> {
        self.raster("elevation", &self.dem)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner("Reading raster...");
    let raster = read_geotiff(path).with_context(|| format!("Failed to read {}", path.display()));
    pb.finish_and_clear();
    let raster: Raster<T> = raster?;
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    let written = write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()));
    pb.finish_and_clear();
    written
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_numbers<const N: usize>(s: &str, what: &str) -> Result<[f64; N]> {
    let values = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid {}: {}", what, s))?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| anyhow::anyhow!("{} needs {} values, got {}", what, N, v.len()))
}

fn parse_region(s: &str) -> Result<Region> {
    let [min_x, min_y, max_x, max_y] = parse_numbers::<4>(s, "region")?;
    Region::new(min_x, min_y, max_x, max_y).context("Invalid region")
}

fn parse_weights(s: &str) -> Result<Weights> {
    let [water, soil, slope, land_cover] = parse_numbers::<4>(s, "weights")?;
    Weights::new(water, soil, slope, land_cover).context("Invalid weights")
}

fn load_config(path: Option<&Path>) -> Result<RiskConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            RiskConfig::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Ok(RiskConfig::default()),
    }
}

/// The study-area lattice: the land-cover grid, or `region` at `cell_size`
/// (defaulting to the land-cover cell size) in the land-cover CRS.
fn study_template(
    reference: &Raster<u8>,
    region: Option<&str>,
    cell_size: Option<f64>,
) -> Result<GridTemplate> {
    let template = match region {
        Some(region) => {
            let region = parse_region(region)?;
            let cell_size = cell_size.unwrap_or_else(|| reference.cell_size());
            GridTemplate::from_region(&region, cell_size)
                .context("Invalid study area")?
                .with_crs(reference.crs().cloned())
        }
        None => reference.template(),
    };
    info!("Study area: {}", template);
    Ok(template)
}

fn write_product(product: &RiskProduct, out_dir: &Path, keep_intermediates: bool) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut outputs: Vec<(&str, &Raster<f64>)> = vec![
        ("water_risk", product.water.raster()),
        ("soil_risk", product.soil.raster()),
        ("slope_risk", product.slope.raster()),
        ("land_cover_risk", product.land_cover.raster()),
        ("risk_score", product.score.raster()),
    ];
    if keep_intermediates {
        outputs.extend([
            ("water_distance", &product.derived.water_distance),
            ("slope_degrees", &product.derived.slope_degrees),
            ("built_up_distance", &product.derived.built_up_distance),
        ]);
    }

    for (name, raster) in outputs {
        let path = out_dir.join(format!("{}.tif", name));
        write_result(raster, &path)?;
        debug!("wrote {}", path.display());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Run ──────────────────────────────────────────────────────
        Commands::Run {
            land_cover,
            soil,
            dem,
            rivers,
            out_dir,
            region,
            cell_size,
            config,
            weights,
            keep_intermediates,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(weights) = weights {
                config.weights = parse_weights(&weights)?;
            }
            debug!("Risk config: {:?}", config);

            let land_cover: Raster<u8> = read_raster(&land_cover)?;
            let template = study_template(&land_cover, region.as_deref(), cell_size)?;
            let source = FileSource {
                land_cover,
                soil,
                dem,
                rivers,
            };

            let start = Instant::now();
            let pipeline = Pipeline::new(config);
            let layers = pipeline.load(&source, &template).context("Failed to load layers")?;
            info!("Loaded {} watercourse features", layers.watercourses.len());

            let pb = spinner("Deriving indicators...");
            let product = pipeline.run_on_layers(&layers, &template);
            pb.finish_and_clear();
            let product = product.context("Risk pipeline failed")?;
            let elapsed = start.elapsed();

            write_product(&product, &out_dir, keep_intermediates)?;

            let stats = product.score.statistics();
            println!("Risk products saved to: {}", out_dir.display());
            if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
                println!("  Risk score: min {:.4}, max {:.4}, mean {:.4}", min, max, mean);
            }
            println!("  Valid cells: {} of {}", stats.valid_count, template.len());
            println!("  Processing time: {:.2?}", elapsed);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster: Raster<f64> = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Slope ────────────────────────────────────────────────────
        Commands::Slope {
            input,
            output,
            units,
            z_factor,
        } => {
            let units = match units.to_lowercase().as_str() {
                "degrees" | "deg" | "d" => SlopeUnits::Degrees,
                "percent" | "pct" | "%" => SlopeUnits::Percent,
                "radians" | "rad" | "r" => SlopeUnits::Radians,
                _ => anyhow::bail!("Unknown units: {}. Use degrees, percent, or radians.", units),
            };
            let dem = read_raster(&input)?;
            let start = Instant::now();
            let params = SlopeParams {
                units,
                z_factor,
                ..Default::default()
            };
            let result = slope(&dem, params).context("Failed to calculate slope")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Slope", &output, elapsed);
        }

        // ── Distance ─────────────────────────────────────────────────
        Commands::Distance {
            input,
            output,
            class,
            max_distance,
        } => {
            let classes: Raster<u8> = read_raster(&input)?;
            let mask = classes.eq_value(class);
            info!("Class {}: {} cells", class, mask.count_true());

            let start = Instant::now();
            let params = RasterDistanceParams {
                max_distance,
                empty: EmptySourcePolicy::Fail,
            };
            let result = distance_to_mask(&mask, &params)
                .with_context(|| format!("Failed to compute distance to class {}", class))?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Distance", &output, elapsed);
        }

        // ── Config ───────────────────────────────────────────────────
        Commands::Config => {
            println!("{}", RiskConfig::default().to_json()?);
        }
    }

    Ok(())
}
