//! End-to-end tests on a synthetic barrier-island grid.
//!
//! The profile runs sea (east) -> beach -> dune -> island flat ->
//! backbarrier -> lagoon, constant across rows. Elevation-driven features
//! (shoreline, backbarrier) have exact expected positions; the dune chain is
//! disabled with an unreachable relief threshold so the island metrics are
//! fully predictable from the elevation values alone.

use approx::assert_relative_eq;
use coastmorph_algorithms::prelude::*;

/// Sea at the eastern (high-column) edge; rises to a dune, falls to a lagoon.
const PROFILE: [f64; 30] = [
    0.05, 0.05, 0.05, 0.05, 0.05, 0.05, // 0-5 lagoon
    1.0, 0.8, // 6-7 backbarrier rise
    0.6, 0.6, 0.6, 0.6, 0.6, 0.6, // 8-13 island flat
    0.8, 1.0, // 14-15 dune heel slope
    2.0, 3.0, 4.0, 3.0, // 16-19 dune
    2.0, 1.5, 1.2, 1.0, // 20-23 beach
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // 24-29 water
];

const ROWS: usize = 9;
const COLS: usize = 30;

fn island_dem() -> Raster<f64> {
    let mut dem = Raster::new(ROWS, COLS);
    for row in 0..ROWS {
        for col in 0..COLS {
            dem.set(row, col, PROFILE[col]).unwrap();
        }
    }
    dem
}

/// Sum of (z - datum) over an inclusive column range, one row
fn prism_sum(datum: f64, from: usize, to: usize) -> f64 {
    PROFILE[from..=to]
        .iter()
        .filter(|&&z| z >= datum)
        .map(|&z| z - datum)
        .sum()
}

fn island_params() -> AnalysisParams {
    let mut params = AnalysisParams {
        window_size: 3,
        product: Product::All,
        landform: LandformParams::default(),
    };
    params.landform.direction = ScanDirection::West;
    params.landform.thresholds.shoreline = 0.5;
    params.landform.thresholds.backbarrier = 0.5;
    // Averaged relief never exceeds 1, so the dune chain stays unfound and
    // the metrics depend on elevation alone
    params.landform.thresholds.dune_toe = 2.0;
    params
}

#[test]
fn island_features_west_scan() {
    let output = analyze(&island_dem(), &island_params()).unwrap();

    // Window 3 leaves transect rows 2..=6
    assert_eq!(output.records.len(), 5);

    for rec in &output.records {
        let sh = rec.shoreline.expect("shoreline must be found");
        assert_eq!(sh.pos, 23);
        assert_relative_eq!(sh.z, 1.0);

        assert!(rec.dune_toe.is_none());
        assert!(rec.dune_crest.is_none());
        assert!(rec.dune_heel.is_none());

        let bb = rec.backbarrier.expect("backbarrier must be found");
        assert_eq!(bb.pos, 6);
        assert_relative_eq!(bb.z, 1.0);
    }
}

#[test]
fn island_metrics_west_scan() {
    let output = analyze(&island_dem(), &island_params()).unwrap();

    for rec in &output.records {
        let m = rec.metrics.as_ref().expect("landforms product");

        // Dune chain unfound: beach and dune quantities are all unfound
        assert!(m.beach_width.is_none());
        assert!(m.beach_volume.is_none());
        assert!(m.dune_height.is_none());
        assert!(m.dune_volume.is_none());

        // Island spans backbarrier (col 6) through shoreline (col 23)
        assert_relative_eq!(m.island_width.unwrap(), 17.0);
        assert_relative_eq!(
            m.island_volume.unwrap(),
            prism_sum(0.5, 6, 23),
            epsilon = 1e-9
        );
    }
}

#[test]
fn island_markers_match_records() {
    let output = analyze(&island_dem(), &island_params()).unwrap();
    let markers = output.markers.as_ref().unwrap();

    for row in 0..ROWS {
        let expected = u8::from((2..=6).contains(&row));
        assert_eq!(markers.shoreline.get(row, 23).unwrap(), expected);
        assert_eq!(markers.backbarrier.get(row, 6).unwrap(), expected);
    }
    let total: u32 = markers.shoreline.data().iter().map(|&v| v as u32).sum();
    assert_eq!(total, 5);
    assert!(markers.dune_toe.data().iter().all(|&v| v == 0));
}

#[test]
fn mirrored_grid_east_scan_mirrors_features() {
    let mut mirrored = Raster::new(ROWS, COLS);
    for row in 0..ROWS {
        for col in 0..COLS {
            mirrored.set(row, col, PROFILE[COLS - 1 - col]).unwrap();
        }
    }

    let mut params = island_params();
    params.landform.direction = ScanDirection::East;
    let output = analyze(&mirrored, &params).unwrap();

    for rec in &output.records {
        assert_eq!(rec.shoreline.unwrap().pos, COLS - 1 - 23);
        assert_eq!(rec.backbarrier.unwrap().pos, COLS - 1 - 6);

        let m = rec.metrics.as_ref().unwrap();
        assert_relative_eq!(m.island_width.unwrap(), 17.0);
        assert_relative_eq!(
            m.island_volume.unwrap(),
            prism_sum(0.5, 6, 23),
            epsilon = 1e-9
        );
    }
}

#[test]
fn transposed_grid_north_scan_matches_west() {
    let mut transposed = Raster::new(COLS, ROWS);
    for row in 0..ROWS {
        for col in 0..COLS {
            transposed.set(col, row, PROFILE[col]).unwrap();
        }
    }

    let mut params = island_params();
    params.landform.direction = ScanDirection::North;
    let output = analyze(&transposed, &params).unwrap();

    assert_eq!(output.records.len(), 5);
    for rec in &output.records {
        assert_eq!(rec.shoreline.unwrap().pos, 23);
        assert_eq!(rec.backbarrier.unwrap().pos, 6);
        let m = rec.metrics.as_ref().unwrap();
        assert_relative_eq!(m.island_width.unwrap(), 17.0);
    }
}

#[test]
fn relief_pass_is_idempotent_through_analyze() {
    let dem = island_dem();
    let params = island_params();
    let a = analyze(&dem, &params).unwrap();
    let b = analyze(&dem, &params).unwrap();

    assert_eq!(a.relief.mean.data(), b.relief.mean.data());
    assert_eq!(a.records.len(), b.records.len());
    for (ra, rb) in a.records.iter().zip(&b.records) {
        assert_eq!(ra.shoreline.map(|f| f.pos), rb.shoreline.map(|f| f.pos));
        assert_eq!(ra.backbarrier.map(|f| f.pos), rb.backbarrier.map(|f| f.pos));
    }
}

#[test]
fn relief_values_bounded_on_island() {
    let output = analyze(&island_dem(), &island_params()).unwrap();
    let buffer = output.relief.buffer();

    for row in 0..ROWS {
        for col in 0..COLS {
            let v = output.relief.mean.get(row, col).unwrap();
            let border = row < buffer || row + buffer >= ROWS || col < buffer || col + buffer >= COLS;
            if border {
                assert_eq!(v, NODATA);
            } else {
                assert!((0.0..=1.0).contains(&v), "mean RR out of range: {}", v);
            }
        }
    }
}
