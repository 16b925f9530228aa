//! Multi-scale relative relief
//!
//! Relative relief normalizes a cell's elevation against the min/max
//! elevation of a surrounding square window:
//!
//!   RR = (z - z_min) / (z_max - z_min)
//!
//! yielding a value in `[0, 1]`: 0 at the lowest point of the window, 1 at
//! the highest. Computed at nine window sizes (`w, w+2, ..., w+16` for a base
//! window `w`) and averaged into a single per-cell texture value; the
//! averaged layer is the detection signal for dune toe/crest/heel
//! extraction.
//!
//! Conventions:
//! - Cells within `buffer = (w-1)/2` cells of any border, and cells whose
//!   elevation is at or below [`NULL_ELEVATION`], carry [`NODATA`] in every
//!   output layer.
//! - A flat window (`z_max == z_min`) yields relief 0.0: the cell is
//!   indistinguishable from its surroundings.
//!
//! Reference: Wernette et al. (2016) "An automated approach for extracting
//! barrier island morphology from digital elevation models"

use crate::maybe_rayon::*;
use coastmorph_core::raster::Raster;
use coastmorph_core::{Algorithm, Error, Result, NODATA, NULL_ELEVATION};
use ndarray::Array2;

/// Number of window sizes evaluated per cell
pub const RELIEF_SCALES: usize = 9;

/// Parameters for relative relief calculation
#[derive(Debug, Clone)]
pub struct ReliefParams {
    /// Base window size in cells; must be odd and at least 3
    pub window_size: usize,
}

impl Default for ReliefParams {
    fn default() -> Self {
        Self { window_size: 11 }
    }
}

/// Relative relief at all evaluated scales, plus their mean.
#[derive(Debug, Clone)]
pub struct ReliefStack {
    /// One layer per scale; `scales[k]` was computed with window
    /// `window_size + 2k`
    pub scales: Vec<Raster<f64>>,
    /// Arithmetic mean of all scale layers
    pub mean: Raster<f64>,
    /// Base window size the stack was computed with
    pub window_size: usize,
}

impl ReliefStack {
    /// Window size (in cells) of scale layer `k`
    pub fn window_at(&self, k: usize) -> usize {
        self.window_size + 2 * k
    }

    /// Border margin excluded from analysis
    pub fn buffer(&self) -> usize {
        (self.window_size - 1) / 2
    }
}

/// Validate a window size and derive the buffer radius
pub(crate) fn validate_window(window_size: usize) -> Result<usize> {
    if window_size < 3 {
        return Err(Error::InvalidParameter {
            name: "window_size",
            value: window_size.to_string(),
            reason: "window size must be at least 3".to_string(),
        });
    }
    if window_size % 2 == 0 {
        return Err(Error::InvalidParameter {
            name: "window_size",
            value: window_size.to_string(),
            reason: "window size must be an odd number".to_string(),
        });
    }
    Ok((window_size - 1) / 2)
}

/// Relative relief algorithm
#[derive(Debug, Clone, Default)]
pub struct RelativeRelief;

impl Algorithm for RelativeRelief {
    type Input = Raster<f64>;
    type Output = ReliefStack;
    type Params = ReliefParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "RelativeRelief"
    }

    fn description(&self) -> &'static str {
        "Multi-scale relative relief: elevation normalized by windowed min/max"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        relative_relief(&input, params)
    }
}

/// Calculate multi-scale relative relief
///
/// # Arguments
/// * `dem` - Input DEM raster
/// * `params` - Base window size (odd, >= 3)
///
/// # Returns
/// A [`ReliefStack`] with one layer per scale and their mean, each cell a
/// value in `[0, 1]` or the [`NODATA`] sentinel.
pub fn relative_relief(dem: &Raster<f64>, params: ReliefParams) -> Result<ReliefStack> {
    let buffer = validate_window(params.window_size)?;
    let (rows, cols) = dem.shape();

    // Each cell yields its 9 scale values plus their mean
    let cells: Vec<[f64; RELIEF_SCALES + 1]> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_cells = vec![[NODATA; RELIEF_SCALES + 1]; cols];
            let border_row = row < buffer || row + buffer >= rows;

            for (col, cell) in row_cells.iter_mut().enumerate() {
                if border_row || col < buffer || col + buffer >= cols {
                    continue;
                }
                let z0 = unsafe { dem.get_unchecked(row, col) };
                if z0 <= NULL_ELEVATION {
                    continue;
                }
                *cell = relief_at(dem, row, col, buffer, z0);
            }

            row_cells
        })
        .collect();

    let layer = |idx: usize| -> Result<Raster<f64>> {
        let data: Vec<f64> = cells.iter().map(|c| c[idx]).collect();
        let mut raster = dem.with_same_meta::<f64>(rows, cols);
        raster.set_nodata(Some(NODATA));
        *raster.data_mut() =
            Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
        Ok(raster)
    };

    let mut scales = Vec::with_capacity(RELIEF_SCALES);
    for k in 0..RELIEF_SCALES {
        scales.push(layer(k)?);
    }
    let mean = layer(RELIEF_SCALES)?;

    Ok(ReliefStack {
        scales,
        mean,
        window_size: params.window_size,
    })
}

/// Relief at every scale for one valid interior cell.
///
/// Windows are clipped to the grid; neighbors at or below the null elevation
/// threshold do not participate in the min/max. The center cell seeds both
/// extremes, so a window with no other valid neighbor is flat by definition.
fn relief_at(
    dem: &Raster<f64>,
    row: usize,
    col: usize,
    buffer: usize,
    z0: f64,
) -> [f64; RELIEF_SCALES + 1] {
    let (rows, cols) = dem.shape();
    let mut out = [0.0; RELIEF_SCALES + 1];
    let mut sum = 0.0;

    for k in 0..RELIEF_SCALES {
        let a = buffer + k;
        let mut z_min = z0;
        let mut z_max = z0;

        let r1 = (row + a).min(rows - 1);
        let c1 = (col + a).min(cols - 1);
        for rr in row.saturating_sub(a)..=r1 {
            for cc in col.saturating_sub(a)..=c1 {
                let z = unsafe { dem.get_unchecked(rr, cc) };
                if z > NULL_ELEVATION {
                    if z > z_max {
                        z_max = z;
                    } else if z < z_min {
                        z_min = z;
                    }
                }
            }
        }

        let rel = if z_max > z_min {
            (z0 - z_min) / (z_max - z_min)
        } else {
            0.0
        };
        out[k] = rel;
        sum += rel;
    }

    out[RELIEF_SCALES] = sum / RELIEF_SCALES as f64;
    out
}
