//! Transect traversal
//!
//! A transect is one row or column of the grid treated as a one-dimensional
//! cross-shore profile. The same extraction algorithm serves all four scan
//! directions; `TransectScan` maps scan positions to grid cells so the
//! feature searches never branch on axis or orientation.

use coastmorph_core::raster::Raster;

/// Direction a transect scan travels, pointing inland. The opposite grid
/// edge is treated as seaward: a `West` scan starts at the eastern edge,
/// a `North` scan at the southern edge.
///
/// `East`/`West` scan along grid rows, `North`/`South` along grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    North,
    South,
    East,
    West,
}

impl ScanDirection {
    /// Transects run along grid rows (the scan varies the column index)
    pub fn along_rows(self) -> bool {
        matches!(self, ScanDirection::East | ScanDirection::West)
    }

    /// Scan proceeds from high to low index along the scan axis
    pub fn reversed(self) -> bool {
        matches!(self, ScanDirection::West | ScanDirection::North)
    }
}

impl std::fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScanDirection::North => "N",
            ScanDirection::South => "S",
            ScanDirection::East => "E",
            ScanDirection::West => "W",
        };
        f.write_str(s)
    }
}

/// View over one transect of the elevation and averaged-relief layers.
///
/// Positions are raw indices along the scan axis (column index for
/// `East`/`West`, row index for `North`/`South`), independent of scan
/// order.
pub(crate) struct TransectScan<'a> {
    z: &'a Raster<f64>,
    avg: &'a Raster<f64>,
    pub direction: ScanDirection,
    /// Fixed index on the cross axis (row for E/W scans, column for N/S)
    pub cross: usize,
    /// Length of the scan axis
    pub len: usize,
    /// Border margin excluded from feature search
    pub buffer: usize,
    /// Ground resolution along the scan axis
    pub res: f64,
}

impl<'a> TransectScan<'a> {
    pub fn new(
        z: &'a Raster<f64>,
        avg: &'a Raster<f64>,
        direction: ScanDirection,
        cross: usize,
        buffer: usize,
    ) -> Self {
        let (rows, cols) = z.shape();
        let (len, res) = if direction.along_rows() {
            (cols, z.xres())
        } else {
            (rows, z.yres())
        };
        Self {
            z,
            avg,
            direction,
            cross,
            len,
            buffer,
            res,
        }
    }

    /// Grid cell of a scan position
    pub fn cell(&self, pos: usize) -> (usize, usize) {
        if self.direction.along_rows() {
            (self.cross, pos)
        } else {
            (pos, self.cross)
        }
    }

    pub fn z_at(&self, pos: usize) -> f64 {
        let (row, col) = self.cell(pos);
        unsafe { self.z.get_unchecked(row, col) }
    }

    pub fn avg_at(&self, pos: usize) -> f64 {
        let (row, col) = self.cell(pos);
        unsafe { self.avg.get_unchecked(row, col) }
    }

    /// World coordinates of a scan position (upper-left-corner convention)
    pub fn world(&self, pos: usize) -> (f64, f64) {
        let (row, col) = self.cell(pos);
        self.z.cell_coords(row, col)
    }

    /// Cell footprint area in ground units
    pub fn cell_area(&self) -> f64 {
        self.z.xres() * self.z.yres()
    }

    /// Neighbor one step back toward the sea, if it exists
    pub fn seaward(&self, pos: usize) -> Option<usize> {
        if self.direction.reversed() {
            (pos + 1 < self.len).then_some(pos + 1)
        } else {
            pos.checked_sub(1)
        }
    }

    /// Neighbor one step further inland, if it exists
    pub fn landward(&self, pos: usize) -> Option<usize> {
        if self.direction.reversed() {
            pos.checked_sub(1)
        } else {
            (pos + 1 < self.len).then_some(pos + 1)
        }
    }

    /// Whether `pos` is strictly further inland than `of`
    pub fn is_landward_of(&self, pos: usize, of: usize) -> bool {
        if self.direction.reversed() {
            pos < of
        } else {
            pos > of
        }
    }

    /// Interior test: a margin of `buffer + 1` cells at both ends of the
    /// transect is excluded from feature search
    pub fn in_margin(&self, pos: usize) -> bool {
        pos >= self.buffer + 1 && pos + self.buffer + 2 <= self.len
    }

    /// Ground distance between two scan positions
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        (a as f64 - b as f64).abs() * self.res
    }

    /// Scan order over the whole transect, seaward edge first
    pub fn positions(&self) -> impl Iterator<Item = usize> {
        let len = self.len;
        let rev = self.direction.reversed();
        (0..len).map(move |i| if rev { len - 1 - i } else { i })
    }

    /// Scan order starting at `start` (inclusive), continuing inland
    pub fn positions_from(&self, start: usize) -> impl Iterator<Item = usize> {
        let rev = self.direction.reversed();
        let count = if rev { start + 1 } else { self.len - start };
        (0..count).map(move |i| if rev { start - i } else { start + i })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers() -> (Raster<f64>, Raster<f64>) {
        let mut z = Raster::new(5, 8);
        for row in 0..5 {
            for col in 0..8 {
                z.set(row, col, (row * 8 + col) as f64).unwrap();
            }
        }
        let avg = z.like(0.0);
        (z, avg)
    }

    #[test]
    fn test_west_scan_order() {
        let (z, avg) = layers();
        let t = TransectScan::new(&z, &avg, ScanDirection::West, 2, 1);
        assert_eq!(t.len, 8);
        let order: Vec<usize> = t.positions().collect();
        assert_eq!(order, vec![7, 6, 5, 4, 3, 2, 1, 0]);
        assert_eq!(t.seaward(5), Some(6));
        assert_eq!(t.landward(5), Some(4));
        assert_eq!(t.landward(0), None);
        assert_eq!(t.seaward(7), None);
        assert!(t.is_landward_of(3, 5));
    }

    #[test]
    fn test_east_scan_order() {
        let (z, avg) = layers();
        let t = TransectScan::new(&z, &avg, ScanDirection::East, 2, 1);
        let order: Vec<usize> = t.positions_from(5).collect();
        assert_eq!(order, vec![5, 6, 7]);
        assert_eq!(t.seaward(5), Some(4));
        assert_eq!(t.landward(5), Some(6));
        assert_eq!(t.seaward(0), None);
    }

    #[test]
    fn test_column_axis_mapping() {
        let (z, avg) = layers();
        let t = TransectScan::new(&z, &avg, ScanDirection::South, 3, 1);
        assert_eq!(t.len, 5);
        assert_eq!(t.cell(4), (4, 3));
        assert_eq!(t.z_at(2), (2 * 8 + 3) as f64);
    }

    #[test]
    fn test_margin_excludes_buffer_plus_one() {
        let (z, avg) = layers();
        let t = TransectScan::new(&z, &avg, ScanDirection::West, 2, 1);
        // len 8, buffer 1: valid positions are 2..=5
        let valid: Vec<usize> = (0..8).filter(|&p| t.in_margin(p)).collect();
        assert_eq!(valid, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_distance_uses_axis_resolution() {
        let mut z = Raster::new(5, 8);
        z.set_transform(coastmorph_core::GeoTransform::new(0.0, 10.0, 2.0, -0.5));
        let avg = z.like(0.0);

        let t = TransectScan::new(&z, &avg, ScanDirection::West, 2, 1);
        assert_eq!(t.res, 2.0);
        assert_eq!(t.distance(3, 7), 8.0);

        let t = TransectScan::new(&z, &avg, ScanDirection::South, 3, 1);
        assert_eq!(t.res, 0.5);
        assert_eq!(t.distance(0, 4), 2.0);
    }
}
