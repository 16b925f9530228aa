//! Per-transect morphometrics
//!
//! After the feature searches finish, a single accumulation pass over the
//! transect produces three volumes, and the located features yield widths
//! and the dune height. A volume that comes out at or below zero is reported
//! as unfound rather than zero: zero is a physically valid volume the design
//! suppresses as likely noise.

use super::extract::FeatureFix;
use super::transect::TransectScan;
use super::LandformParams;

/// Derived scalars for one transect. `None` means not computed or rejected
/// by a plausibility gate; the output layer writes the unfound sentinel.
#[derive(Debug, Clone, Copy)]
pub struct TransectMetrics {
    pub beach_width: Option<f64>,
    pub beach_volume: Option<f64>,
    pub dune_height: Option<f64>,
    pub dune_volume: Option<f64>,
    pub island_width: Option<f64>,
    pub island_volume: Option<f64>,
}

fn between(pos: usize, a: usize, b: usize) -> bool {
    pos >= a.min(b) && pos <= a.max(b)
}

/// Coordinate along the scan axis of a feature fix
fn axis_coord(t: &TransectScan, fix: &FeatureFix) -> f64 {
    if t.direction.along_rows() {
        fix.x
    } else {
        fix.y
    }
}

fn positive(v: f64) -> Option<f64> {
    (v > 0.0).then_some(v)
}

pub(crate) fn compute_metrics(
    t: &TransectScan,
    shoreline: &FeatureFix,
    dune_toe: Option<&FeatureFix>,
    dune_crest: Option<&FeatureFix>,
    dune_heel: Option<&FeatureFix>,
    backbarrier: Option<&FeatureFix>,
    params: &LandformParams,
) -> TransectMetrics {
    let base = params.thresholds.shoreline;
    let cell_area = t.cell_area();

    // Accumulation pass: every cell at or above the shoreline threshold
    // contributes its prism above that datum to the ranges it falls in
    let mut beach_sum = 0.0;
    let mut dune_sum = 0.0;
    let mut island_sum = 0.0;

    for pos in 0..t.len {
        let z = t.z_at(pos);
        if z < base {
            continue;
        }
        let prism = (z - base) * cell_area;

        if let Some(toe) = dune_toe {
            if between(pos, toe.pos, shoreline.pos) {
                beach_sum += prism;
            }
            if let Some(heel) = dune_heel {
                if between(pos, heel.pos, toe.pos) {
                    dune_sum += prism;
                }
            }
        }
        if let Some(bb) = backbarrier {
            if between(pos, bb.pos, shoreline.pos) {
                island_sum += prism;
            }
        }
    }

    let beach_width = dune_toe.map(|toe| (axis_coord(t, shoreline) - axis_coord(t, toe)).abs() * t.res);
    let island_width = backbarrier
        .and_then(|bb| positive((axis_coord(t, shoreline) - axis_coord(t, bb)).abs() * t.res));

    let dune_height = match (dune_crest, dune_toe) {
        (Some(crest), Some(toe)) => {
            let dh = crest.z - toe.z;
            (dh > 0.0 && dh < params.dune_height_ceiling).then_some(dh)
        }
        _ => None,
    };

    TransectMetrics {
        beach_width,
        beach_volume: dune_toe.and(positive(beach_sum)),
        dune_height,
        dune_volume: dune_heel.and(positive(dune_sum)),
        island_width,
        island_volume: backbarrier.and(positive(island_sum)),
    }
}
