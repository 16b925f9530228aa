//! # Coastmorph Algorithms
//!
//! Analysis passes for barrier-island DEMs:
//!
//! - **relief**: multi-scale relative relief, the texture signal landform
//!   detection runs on
//! - **landforms**: directional transect feature extraction (shoreline, dune
//!   toe, dune crest, dune heel, backbarrier edge) and morphometrics
//! - **analysis**: orchestration of both passes with product selection

pub mod analysis;
pub mod landforms;
pub mod relief;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        analyze, AnalysisOutput, AnalysisParams, FeatureMarkers, IslandAnalysis, Product,
    };
    pub use crate::landforms::{
        DistanceWindow, FeatureFix, LandformParams, ScanDirection, Thresholds, TransectMetrics,
        TransectRecord,
    };
    pub use crate::relief::{relative_relief, RelativeRelief, ReliefParams, ReliefStack};
    pub use coastmorph_core::prelude::*;
}
