//! # Coastmorph Core
//!
//! Core types and I/O for the coastmorph barrier-island analysis tools.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - Sentinel conventions shared by all analysis passes
//! - ENVI-format raster I/O (binary `.dat` + text `.hdr` sidecar)

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Raster sentinel for "not computed" cells.
pub const NODATA: f64 = -9999.0;

/// Elevations at or below this value are treated as absent (no return).
pub const NULL_ELEVATION: f64 = -100.0;

/// Tabular sentinel for "feature or metric not found", distinct from a
/// valid zero.
pub const UNFOUND: f64 = -99999.0;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
    pub use crate::{NODATA, NULL_ELEVATION, UNFOUND};
}

/// Core trait for all algorithms in coastmorph.
///
/// Algorithms are pure functions that transform input data according to
/// parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(
        &self,
        input: Self::Input,
    ) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
