//! I/O operations for reading and writing raster data
//!
//! The native exchange format is the ENVI flat-binary raster: a headerless
//! `.dat` file of cell values plus a human-readable `.hdr` sidecar.

mod envi;

pub use envi::{read_envi, write_envi, EnviDataType, EnviHeader, MapInfo};
