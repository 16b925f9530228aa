//! Analysis orchestration
//!
//! Sequences the relief pass over the whole grid, then the transect
//! feature-extraction pass over every interior transect along the configured
//! axis, selecting how deep into the feature chain to search from the
//! requested product. Holds no algorithmic logic of its own.

use crate::landforms::{
    extract_transect, LandformParams, ScanDirection, TransectRecord, TransectScan,
};
use crate::maybe_rayon::*;
use crate::relief::{relative_relief, validate_window, ReliefParams, ReliefStack};
use coastmorph_core::raster::Raster;
use coastmorph_core::{Algorithm, Error, Result};

/// Requested analysis product.
///
/// Single-feature products still run every search stage they depend on:
/// the dune crest needs the toe's position, the backbarrier scan starts at
/// the innermost dune feature found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// Relief layers only; the transect pass is skipped entirely
    RelativeRelief,
    Shoreline,
    DuneToe,
    DuneCrest,
    DuneHeel,
    Backbarrier,
    /// All five features plus the derived morphometrics
    Landforms,
    /// Everything: relief layers, features, morphometrics
    All,
}

impl Product {
    /// How far down the feature chain the search goes
    /// (0 = none, 1 = shoreline ... 5 = through backbarrier)
    pub fn feature_depth(self) -> usize {
        match self {
            Product::RelativeRelief => 0,
            Product::Shoreline => 1,
            Product::DuneToe => 2,
            Product::DuneCrest => 3,
            Product::DuneHeel => 4,
            Product::Backbarrier | Product::Landforms | Product::All => 5,
        }
    }

    /// Whether volumes, widths and dune height are computed
    pub fn wants_metrics(self) -> bool {
        matches!(self, Product::Landforms | Product::All)
    }
}

/// Parameters for a full analysis run
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// Base relief window size (odd, >= 3)
    pub window_size: usize,
    pub product: Product,
    pub landform: LandformParams,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            window_size: 11,
            product: Product::All,
            landform: LandformParams::default(),
        }
    }
}

/// Binary indicator layers, 1 at located feature cells
#[derive(Debug, Clone)]
pub struct FeatureMarkers {
    pub shoreline: Raster<u8>,
    pub dune_toe: Raster<u8>,
    pub dune_crest: Raster<u8>,
    pub dune_heel: Raster<u8>,
    pub backbarrier: Raster<u8>,
}

impl FeatureMarkers {
    fn zeros(dem: &Raster<f64>) -> Self {
        let (rows, cols) = dem.shape();
        Self {
            shoreline: dem.with_same_meta(rows, cols),
            dune_toe: dem.with_same_meta(rows, cols),
            dune_crest: dem.with_same_meta(rows, cols),
            dune_heel: dem.with_same_meta(rows, cols),
            backbarrier: dem.with_same_meta(rows, cols),
        }
    }
}

/// Everything one analysis run produces
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub relief: ReliefStack,
    /// Present unless the product was relief-only
    pub markers: Option<FeatureMarkers>,
    /// One record per processed transect, in cross-axis order
    pub records: Vec<TransectRecord>,
}

/// Full barrier-island analysis
#[derive(Debug, Clone, Default)]
pub struct IslandAnalysis;

impl Algorithm for IslandAnalysis {
    type Input = Raster<f64>;
    type Output = AnalysisOutput;
    type Params = AnalysisParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "IslandAnalysis"
    }

    fn description(&self) -> &'static str {
        "Relative relief, landform features and morphometrics per transect"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        analyze(&input, &params)
    }
}

/// Run the full analysis: relief first, then the transect pass.
pub fn analyze(dem: &Raster<f64>, params: &AnalysisParams) -> Result<AnalysisOutput> {
    let buffer = validate_window(params.window_size)?;

    let relief = relative_relief(
        dem,
        ReliefParams {
            window_size: params.window_size,
        },
    )?;

    let depth = params.product.feature_depth();
    if depth == 0 {
        return Ok(AnalysisOutput {
            relief,
            markers: None,
            records: Vec::new(),
        });
    }

    let direction = params.landform.direction;
    let (rows, cols) = dem.shape();
    let cross_len = if direction.along_rows() { rows } else { cols };

    // Same symmetric margin on the cross axis as along the transect
    let lo = buffer + 1;
    let hi = cross_len.saturating_sub(buffer + 1);
    let with_metrics = params.product.wants_metrics();

    let records: Vec<TransectRecord> = (lo..hi)
        .into_par_iter()
        .map(|cross| {
            let t = TransectScan::new(dem, &relief.mean, direction, cross, buffer);
            extract_transect(&t, &params.landform, depth, with_metrics)
        })
        .collect();

    let mut markers = FeatureMarkers::zeros(dem);
    for rec in &records {
        let mut mark = |layer: &mut Raster<u8>, fix: &Option<crate::landforms::FeatureFix>| {
            if let Some(fix) = fix {
                let (row, col) = if direction.along_rows() {
                    (rec.cross_index, fix.pos)
                } else {
                    (fix.pos, rec.cross_index)
                };
                // Positions come from the scan itself, always in bounds
                unsafe { layer.set_unchecked(row, col, 1) };
            }
        };
        mark(&mut markers.shoreline, &rec.shoreline);
        mark(&mut markers.dune_toe, &rec.dune_toe);
        mark(&mut markers.dune_crest, &rec.dune_crest);
        mark(&mut markers.dune_heel, &rec.dune_heel);
        mark(&mut markers.backbarrier, &rec.backbarrier);
    }

    Ok(AnalysisOutput {
        relief,
        markers: Some(markers),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 5x5 grid, unit resolution, elevation ramp rising inland from 0.0 at
    /// the eastern edge to 4.0 in unit steps.
    fn ramp_5x5() -> Raster<f64> {
        let mut dem = Raster::new(5, 5);
        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, (4 - col) as f64).unwrap();
            }
        }
        dem
    }

    fn ramp_params() -> AnalysisParams {
        let mut params = AnalysisParams {
            window_size: 3,
            product: Product::All,
            landform: LandformParams::default(),
        };
        params.landform.direction = ScanDirection::West;
        params.landform.thresholds.shoreline = 2.0;
        params
    }

    #[test]
    fn test_ramp_shoreline_at_threshold_crossing() {
        let output = analyze(&ramp_5x5(), &ramp_params()).unwrap();

        // Window 3 leaves a single fully-interior transect: row 2
        assert_eq!(output.records.len(), 1);
        let rec = &output.records[0];
        assert_eq!(rec.cross_index, 2);

        // Scanning landward, elevation first reaches 2.0 at column 2
        let sh = rec.shoreline.unwrap();
        assert_eq!(sh.pos, 2);
        assert_eq!(sh.z, 2.0);

        let markers = output.markers.as_ref().unwrap();
        assert_eq!(markers.shoreline.get(2, 2).unwrap(), 1);
        let ones: u32 = markers.shoreline.data().iter().map(|&v| v as u32).sum();
        assert_eq!(ones, 1);
    }

    #[test]
    fn test_relief_only_product_skips_transects() {
        let mut params = ramp_params();
        params.product = Product::RelativeRelief;
        let output = analyze(&ramp_5x5(), &params).unwrap();
        assert!(output.markers.is_none());
        assert!(output.records.is_empty());
        assert_eq!(output.relief.window_size, 3);
    }

    #[test]
    fn test_no_shoreline_transect_yields_empty_record() {
        // Nothing reaches the threshold anywhere
        let dem = Raster::filled(7, 7, 0.1);
        let mut params = ramp_params();
        params.window_size = 3;
        let output = analyze(&dem, &params).unwrap();

        assert!(!output.records.is_empty());
        for rec in &output.records {
            assert!(rec.shoreline.is_none());
            assert!(rec.backbarrier.is_none());
            assert!(rec.metrics.is_none());
        }
        let markers = output.markers.as_ref().unwrap();
        assert!(markers.shoreline.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_invalid_window_is_fatal() {
        let mut params = ramp_params();
        params.window_size = 4;
        assert!(matches!(
            analyze(&ramp_5x5(), &params),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_depth_gating_matches_product() {
        assert_eq!(Product::RelativeRelief.feature_depth(), 0);
        assert_eq!(Product::Shoreline.feature_depth(), 1);
        assert_eq!(Product::Backbarrier.feature_depth(), 5);
        assert!(Product::Landforms.wants_metrics());
        assert!(!Product::Backbarrier.wants_metrics());
    }
}
