//! Sequential feature searches along one transect
//!
//! Each search starts where the previous feature was found and applies a
//! threshold-crossing test plus the gates described in the module docs. The
//! shoreline and dune toe test the seaward neighbor (the crossing is entered
//! from the water side); crest, heel and backbarrier test the landward
//! neighbor (the crossing is left on the inland side).

use super::metrics::{compute_metrics, TransectMetrics};
use super::transect::TransectScan;
use super::{DistanceWindow, LandformParams};
use coastmorph_core::NODATA;

/// A located landform boundary on one transect.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFix {
    /// Index along the scan axis (column for E/W scans, row for N/S)
    pub pos: usize,
    /// World X of the cell
    pub x: f64,
    /// World Y of the cell
    pub y: f64,
    /// Elevation of the cell
    pub z: f64,
}

/// Everything extracted from one transect.
///
/// `None` marks an unfound feature; downstream features and metrics of an
/// unfound feature are themselves unfound. A record with no shoreline
/// produces no tabular output.
#[derive(Debug, Clone)]
pub struct TransectRecord {
    /// Index of the transect on the cross axis (row for E/W scans)
    pub cross_index: usize,
    pub shoreline: Option<FeatureFix>,
    pub dune_toe: Option<FeatureFix>,
    pub dune_crest: Option<FeatureFix>,
    pub dune_heel: Option<FeatureFix>,
    pub backbarrier: Option<FeatureFix>,
    pub metrics: Option<TransectMetrics>,
}

impl TransectRecord {
    fn unfound(cross_index: usize) -> Self {
        Self {
            cross_index,
            shoreline: None,
            dune_toe: None,
            dune_crest: None,
            dune_heel: None,
            backbarrier: None,
            metrics: None,
        }
    }
}

fn fix_at(t: &TransectScan, pos: usize) -> FeatureFix {
    let (x, y) = t.world(pos);
    FeatureFix {
        pos,
        x,
        y,
        z: t.z_at(pos),
    }
}

/// Shoreline: first interior cell at/above the threshold whose seaward
/// neighbor is below it (the water-to-land crossing).
fn find_shoreline(t: &TransectScan, threshold: f64) -> Option<FeatureFix> {
    for pos in t.positions() {
        if !t.in_margin(pos) {
            continue;
        }
        let Some(sea) = t.seaward(pos) else {
            continue;
        };
        if t.z_at(sea) < threshold && t.z_at(pos) >= threshold {
            return Some(fix_at(t, pos));
        }
    }
    None
}

/// Dune toe: same crossing shape as the shoreline, but on the averaged
/// relief signal and only within the search window behind the shoreline.
fn find_dune_toe(
    t: &TransectScan,
    shoreline: &FeatureFix,
    threshold: f64,
    search: DistanceWindow,
) -> Option<FeatureFix> {
    for pos in t.positions_from(shoreline.pos) {
        if !t.in_margin(pos) {
            continue;
        }
        if !search.contains(t.distance(pos, shoreline.pos)) {
            continue;
        }
        let Some(sea) = t.seaward(pos) else {
            continue;
        };
        if t.avg_at(sea) < threshold && t.avg_at(pos) >= threshold {
            return Some(fix_at(t, pos));
        }
    }
    None
}

/// Shared shape of the crest and heel searches: a relief crossing left on
/// the landward side, strictly beyond the previous feature and inside its
/// search window, with no-data gates on both relief values and on
/// elevation. `floor` adds the crest's requirement of out-topping the toe.
fn find_relief_drop(
    t: &TransectScan,
    from: &FeatureFix,
    threshold: f64,
    search: DistanceWindow,
    floor: Option<f64>,
) -> Option<FeatureFix> {
    for pos in t.positions_from(from.pos) {
        if !t.is_landward_of(pos, from.pos) {
            continue;
        }
        if !t.in_margin(pos) {
            continue;
        }
        if !search.contains(t.distance(pos, from.pos)) {
            continue;
        }
        let Some(land) = t.landward(pos) else {
            continue;
        };
        let (avg, avg_land) = (t.avg_at(pos), t.avg_at(land));
        if avg == NODATA || avg_land == NODATA {
            continue;
        }
        let z = t.z_at(pos);
        if z == NODATA {
            continue;
        }
        if !(avg >= threshold && avg_land < threshold) {
            continue;
        }
        if let Some(floor) = floor {
            if z <= floor {
                continue;
            }
        }
        return Some(fix_at(t, pos));
    }
    None
}

/// Backbarrier edge: land-to-water crossing on raw elevation, scanning
/// landward from the innermost feature found so far. No distance gate.
fn find_backbarrier(t: &TransectScan, start: usize, threshold: f64) -> Option<FeatureFix> {
    for pos in t.positions_from(start) {
        if !t.in_margin(pos) {
            continue;
        }
        let Some(land) = t.landward(pos) else {
            continue;
        };
        let z = t.z_at(pos);
        if t.z_at(land) < threshold && z >= threshold && z != NODATA {
            return Some(fix_at(t, pos));
        }
    }
    None
}

/// Run the full state machine over one transect.
///
/// `depth` limits how far down the feature chain the search goes
/// (1 = shoreline only ... 5 = through backbarrier); `with_metrics` adds the
/// volume-accumulation pass and derived scalars.
pub(crate) fn extract_transect(
    t: &TransectScan,
    params: &LandformParams,
    depth: usize,
    with_metrics: bool,
) -> TransectRecord {
    let th = &params.thresholds;

    let Some(shoreline) = find_shoreline(t, th.shoreline) else {
        // No shoreline, no transect: every downstream search is skipped
        return TransectRecord::unfound(t.cross);
    };

    let dune_toe = if depth >= 2 {
        find_dune_toe(t, &shoreline, th.dune_toe, params.toe_search)
    } else {
        None
    };

    let dune_crest = if depth >= 3 {
        dune_toe
            .as_ref()
            .and_then(|toe| find_relief_drop(t, toe, th.dune_crest, params.crest_search, Some(toe.z)))
    } else {
        None
    };

    let dune_heel = if depth >= 4 {
        dune_crest
            .as_ref()
            .and_then(|crest| find_relief_drop(t, crest, th.dune_heel, params.heel_search, None))
    } else {
        None
    };

    let backbarrier = if depth >= 5 {
        let start = dune_heel
            .or(dune_crest)
            .or(dune_toe)
            .map_or(shoreline.pos, |f| f.pos);
        find_backbarrier(t, start, th.backbarrier)
    } else {
        None
    };

    let metrics = with_metrics.then(|| {
        compute_metrics(
            t,
            &shoreline,
            dune_toe.as_ref(),
            dune_crest.as_ref(),
            dune_heel.as_ref(),
            backbarrier.as_ref(),
            params,
        )
    });

    TransectRecord {
        cross_index: t.cross,
        shoreline: Some(shoreline),
        dune_toe,
        dune_crest,
        dune_heel,
        backbarrier,
        metrics,
    }
}
