//! Coastmorph CLI - barrier-island DEM morphometrics

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use coastmorph_algorithms::analysis::{analyze, AnalysisOutput, AnalysisParams, Product};
use coastmorph_algorithms::landforms::{
    DistanceWindow, FeatureFix, LandformParams, ScanDirection, Thresholds, TransectRecord,
};
use coastmorph_core::io::{read_envi, write_envi, EnviDataType, EnviHeader};
use coastmorph_core::raster::{Raster, RasterElement};
use coastmorph_core::UNFOUND;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "coastmorph")]
#[command(author, version, about = "Barrier-island DEM morphometrics", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about an ENVI raster dataset
    Info {
        /// Dataset stem (reads <stem>.hdr and <stem>.dat)
        stem: PathBuf,
    },
    /// Extract landform features and morphometrics from a DEM
    Analyze {
        /// Dataset stem (reads <stem>.hdr and <stem>.dat)
        stem: PathBuf,
        /// Base relief window size in cells (odd, >= 3)
        #[arg(short, long, default_value = "11")]
        window_size: usize,
        /// Product to compute
        #[arg(short, long, value_enum, default_value = "all")]
        product: ProductArg,
        /// Output format(s)
        #[arg(short, long, value_enum, default_value = "both")]
        format: FormatArg,
        /// Direction the transect scan travels (pointing inland)
        #[arg(short, long, value_enum, default_value = "west")]
        direction: DirectionArg,
        /// Shoreline elevation threshold
        #[arg(long, default_value = "0.5")]
        shoreline: f64,
        /// Dune toe threshold on averaged relative relief
        #[arg(long, default_value = "0.25")]
        dune_toe: f64,
        /// Dune crest threshold on averaged relative relief
        #[arg(long, default_value = "0.6")]
        dune_crest: f64,
        /// Dune heel threshold on averaged relative relief
        #[arg(long, default_value = "0.4")]
        dune_heel: f64,
        /// Backbarrier elevation threshold
        #[arg(long, default_value = "0.5")]
        backbarrier: f64,
        /// Dune toe search distance from the shoreline (ground units)
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values = ["0", "100"])]
        toe_dist: Vec<f64>,
        /// Dune crest search distance from the dune toe (ground units)
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values = ["0", "80"])]
        crest_dist: Vec<f64>,
        /// Dune heel search distance from the dune crest (ground units)
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values = ["0", "80"])]
        heel_dist: Vec<f64>,
        /// Dune heights at or above this value are rejected as implausible
        #[arg(long, default_value = "300")]
        dune_height_ceiling: f64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProductArg {
    /// Relief layers only
    #[value(alias = "rr")]
    RelativeRelief,
    Shoreline,
    #[value(alias = "dunetoe")]
    DuneToe,
    #[value(alias = "dunecrest")]
    DuneCrest,
    #[value(alias = "duneheel")]
    DuneHeel,
    Backbarrier,
    /// All features plus morphometrics (tabular only)
    Landforms,
    /// Every product
    All,
}

impl From<ProductArg> for Product {
    fn from(arg: ProductArg) -> Self {
        match arg {
            ProductArg::RelativeRelief => Product::RelativeRelief,
            ProductArg::Shoreline => Product::Shoreline,
            ProductArg::DuneToe => Product::DuneToe,
            ProductArg::DuneCrest => Product::DuneCrest,
            ProductArg::DuneHeel => Product::DuneHeel,
            ProductArg::Backbarrier => Product::Backbarrier,
            ProductArg::Landforms => Product::Landforms,
            ProductArg::All => Product::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    #[value(alias = "n")]
    North,
    #[value(alias = "s")]
    South,
    #[value(alias = "e")]
    East,
    #[value(alias = "w")]
    West,
}

impl From<DirectionArg> for ScanDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::North => ScanDirection::North,
            DirectionArg::South => ScanDirection::South,
            DirectionArg::East => ScanDirection::East,
            DirectionArg::West => ScanDirection::West,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// CSV metrics table only
    Ascii,
    /// ENVI rasters only
    Envi,
    /// Both outputs
    Both,
}

impl FormatArg {
    fn writes_ascii(self) -> bool {
        matches!(self, FormatArg::Ascii | FormatArg::Both)
    }

    fn writes_envi(self) -> bool {
        matches!(self, FormatArg::Envi | FormatArg::Both)
    }
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

fn read_dem(stem: &Path) -> Result<(Raster<f64>, EnviHeader)> {
    let pb = spinner("Reading raster...");
    let (raster, header) = read_envi::<f64, _>(stem)
        .with_context(|| format!("Failed to read dataset '{}'", stem.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok((raster, header))
}

/// Write one output raster; an I/O failure is fatal for this product only.
fn write_product<T: RasterElement>(
    raster: &Raster<T>,
    stem: &Path,
    suffix: &str,
    data_type: EnviDataType,
    template: &EnviHeader,
    description: &str,
) {
    let out = PathBuf::from(format!("{}{}", stem.display(), suffix));
    let mut header = template.clone();
    header.description = description.to_string();

    match write_envi(raster, &out, data_type, &header) {
        Ok(()) => info!("Wrote {}", out.display()),
        Err(e) => error!("Cannot write {}: {}", out.display(), e),
    }
}

fn done(name: &str, elapsed: std::time::Duration) {
    println!("{} complete", name);
    println!("  Processing time: {:.2?}", elapsed);
}

fn distance_window(name: &'static str, values: &[f64]) -> Result<DistanceWindow> {
    match values {
        [min, max] => Ok(DistanceWindow::new(*min, *max)),
        _ => anyhow::bail!("--{} expects MIN MAX", name),
    }
}

// ─── Metrics table ──────────────────────────────────────────────────────

/// World coordinate of a feature along the scan axis
fn axis_coord(direction: ScanDirection, fix: &FeatureFix) -> f64 {
    if direction.along_rows() {
        fix.x
    } else {
        fix.y
    }
}

/// World coordinate identifying the transect (the cross axis)
fn cross_coord(direction: ScanDirection, fix: &FeatureFix) -> f64 {
    if direction.along_rows() {
        fix.y
    } else {
        fix.x
    }
}

fn cell(value: Option<f64>) -> String {
    format!("{:.6}", value.unwrap_or(UNFOUND))
}

/// Write the per-transect metrics table.
///
/// One row per transect with a found shoreline; for single-feature products
/// the row additionally requires that feature. Unfound values carry the
/// tabular sentinel.
fn write_metrics_csv(
    stem: &Path,
    product: Product,
    direction: ScanDirection,
    records: &[TransectRecord],
) -> Result<()> {
    if product == Product::RelativeRelief {
        return Ok(());
    }

    let path = PathBuf::from(format!("{}_island_metrics.csv", stem.display()));
    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Cannot create metrics file '{}'", path.display()))?;

    let single = |name: &str| vec![
        "coordinate".to_string(),
        format!("{}_x", name),
        format!("{}_z", name),
    ];

    let header: Vec<String> = match product {
        Product::Shoreline => single("shoreline"),
        Product::DuneToe => single("dunetoe"),
        Product::DuneCrest => single("dunecrest"),
        Product::DuneHeel => single("duneheel"),
        Product::Backbarrier => single("backbarrier"),
        Product::Landforms | Product::All => [
            "coordinate",
            "shoreline_x",
            "shoreline_z",
            "dunetoe_x",
            "dunetoe_z",
            "dunecrest_x",
            "dunecrest_z",
            "duneheel_x",
            "duneheel_z",
            "backbarrier_x",
            "backbarrier_z",
            "beach_width",
            "beach_vol",
            "dune_height",
            "dune_vol",
            "island_width",
            "island_volume",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        Product::RelativeRelief => return Ok(()),
    };
    wtr.write_record(&header)?;

    for rec in records {
        let Some(shoreline) = rec.shoreline else {
            continue;
        };
        let coord = cross_coord(direction, &shoreline);

        let single_row = |fix: Option<FeatureFix>| -> Option<Vec<String>> {
            fix.map(|f| {
                vec![
                    format!("{:.6}", coord),
                    format!("{:.6}", axis_coord(direction, &f)),
                    format!("{:.6}", f.z),
                ]
            })
        };

        let row: Option<Vec<String>> = match product {
            Product::Shoreline => single_row(rec.shoreline),
            Product::DuneToe => single_row(rec.dune_toe),
            Product::DuneCrest => single_row(rec.dune_crest),
            Product::DuneHeel => single_row(rec.dune_heel),
            Product::Backbarrier => single_row(rec.backbarrier),
            Product::Landforms | Product::All => {
                let mut row = vec![format!("{:.6}", coord)];
                for fix in [
                    rec.shoreline,
                    rec.dune_toe,
                    rec.dune_crest,
                    rec.dune_heel,
                    rec.backbarrier,
                ] {
                    row.push(cell(fix.map(|f| axis_coord(direction, &f))));
                    row.push(cell(fix.map(|f| f.z)));
                }
                let m = rec.metrics;
                row.push(cell(m.and_then(|m| m.beach_width)));
                row.push(cell(m.and_then(|m| m.beach_volume)));
                row.push(cell(m.and_then(|m| m.dune_height)));
                row.push(cell(m.and_then(|m| m.dune_volume)));
                row.push(cell(m.and_then(|m| m.island_width)));
                row.push(cell(m.and_then(|m| m.island_volume)));
                Some(row)
            }
            Product::RelativeRelief => None,
        };

        if let Some(row) = row {
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    info!("Wrote {}", path.display());
    Ok(())
}

// ─── Raster products ────────────────────────────────────────────────────

fn write_raster_products(
    stem: &Path,
    product: Product,
    output: &AnalysisOutput,
    template: &EnviHeader,
) {
    if matches!(product, Product::RelativeRelief | Product::All) {
        for (k, layer) in output.relief.scales.iter().enumerate() {
            let window = output.relief.window_at(k);
            write_product(
                layer,
                stem,
                &format!("_rr{}", window),
                EnviDataType::F32,
                template,
                &format!("relative relief, window {}", window),
            );
        }
        write_product(
            &output.relief.mean,
            stem,
            "_rr_avg",
            EnviDataType::F32,
            template,
            "average relative relief",
        );
    }

    let Some(markers) = &output.markers else {
        return;
    };
    let marker_products: [(Product, &Raster<u8>, &str, &str); 5] = [
        (Product::Shoreline, &markers.shoreline, "_shoreline", "shoreline"),
        (Product::DuneToe, &markers.dune_toe, "_dune_toe", "dune toe"),
        (Product::DuneCrest, &markers.dune_crest, "_dune_crest", "dune crest"),
        (Product::DuneHeel, &markers.dune_heel, "_dune_heel", "dune heel"),
        (
            Product::Backbarrier,
            &markers.backbarrier,
            "_backbarrier_shoreline",
            "backbarrier shoreline",
        ),
    ];
    for (wanted, layer, suffix, description) in marker_products {
        if product == wanted || product == Product::All {
            write_product(layer, stem, suffix, EnviDataType::U8, template, description);
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { stem } => {
            let (raster, header) = read_dem(&stem)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("Dataset: {}", stem.display());
            if !header.description.is_empty() {
                println!("Description: {}", header.description);
            }
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {} x {}", raster.xres(), raster.yres());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(mi) = &header.map_info {
                match (&mi.zone, &mi.hemisphere) {
                    (Some(zone), Some(hemisphere)) => {
                        println!("Projection: {} zone {} {}", mi.projection, zone, hemisphere)
                    }
                    _ => println!("Projection: {}", mi.projection),
                }
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

        // ── Analyze ──────────────────────────────────────────────────
        Commands::Analyze {
            stem,
            window_size,
            product,
            format,
            direction,
            shoreline,
            dune_toe,
            dune_crest,
            dune_heel,
            backbarrier,
            toe_dist,
            crest_dist,
            heel_dist,
            dune_height_ceiling,
        } => {
            let product: Product = product.into();
            let params = AnalysisParams {
                window_size,
                product,
                landform: LandformParams {
                    direction: direction.into(),
                    thresholds: Thresholds {
                        shoreline,
                        dune_toe,
                        dune_crest,
                        dune_heel,
                        backbarrier,
                    },
                    toe_search: distance_window("toe-dist", &toe_dist)?,
                    crest_search: distance_window("crest-dist", &crest_dist)?,
                    heel_search: distance_window("heel-dist", &heel_dist)?,
                    dune_height_ceiling,
                },
            };

            let (dem, header) = read_dem(&stem)?;

            let pb = spinner("Processing the input data...");
            let start = Instant::now();
            let output = analyze(&dem, &params).context("Analysis failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            info!(
                "Extracted {} transects ({} with a shoreline)",
                output.records.len(),
                output
                    .records
                    .iter()
                    .filter(|r| r.shoreline.is_some())
                    .count()
            );

            if format.writes_ascii() {
                if let Err(e) =
                    write_metrics_csv(&stem, product, params.landform.direction, &output.records)
                {
                    error!("Cannot write metrics table: {:#}", e);
                }
            }
            if format.writes_envi() {
                write_raster_products(&stem, product, &output, &header);
            }

            done("Analysis", elapsed);
        }
    }

    Ok(())
}
