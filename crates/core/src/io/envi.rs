//! ENVI raster reading/writing
//!
//! An ENVI dataset is a pair of files sharing a stem: `<stem>.dat` holds raw
//! little-endian cell values (band-sequential), `<stem>.hdr` is a text
//! sidecar of `key = value` lines describing dimensions, cell type and
//! georeferencing. Only single-band, byte-order-0 datasets are supported,
//! which is what the coastal lidar DEMs this tool consumes look like.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// ENVI cell type, tagged with the format's numeric type code.
///
/// One reader and one writer are parameterized by this enum; the byte width
/// drives the binary layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnviDataType {
    /// Unsigned 8-bit (code 1)
    U8,
    /// Signed 16-bit (code 2)
    I16,
    /// Signed 32-bit (code 3)
    I32,
    /// 32-bit float (code 4)
    F32,
    /// 64-bit float (code 5)
    F64,
}

impl EnviDataType {
    /// ENVI numeric type code
    pub fn code(self) -> u8 {
        match self {
            EnviDataType::U8 => 1,
            EnviDataType::I16 => 2,
            EnviDataType::I32 => 3,
            EnviDataType::F32 => 4,
            EnviDataType::F64 => 5,
        }
    }

    /// Parse an ENVI numeric type code
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(EnviDataType::U8),
            2 => Ok(EnviDataType::I16),
            3 => Ok(EnviDataType::I32),
            4 => Ok(EnviDataType::F32),
            5 => Ok(EnviDataType::F64),
            other => Err(Error::UnsupportedDataType(format!(
                "ENVI data type code {}",
                other
            ))),
        }
    }

    /// Bytes per cell
    pub fn byte_width(self) -> usize {
        match self {
            EnviDataType::U8 => 1,
            EnviDataType::I16 => 2,
            EnviDataType::I32 => 4,
            EnviDataType::F32 => 4,
            EnviDataType::F64 => 8,
        }
    }
}

/// Georeferencing block of an ENVI header (`map info = {...}`).
#[derive(Debug, Clone)]
pub struct MapInfo {
    /// Projection name (e.g. "UTM")
    pub projection: String,
    /// X coordinate of the upper-left corner
    pub ulx: f64,
    /// Y coordinate of the upper-left corner
    pub uly: f64,
    /// Cell size in the X direction
    pub xres: f64,
    /// Cell size in the Y direction (positive; rows run southward)
    pub yres: f64,
    /// UTM zone number, when projected
    pub zone: Option<String>,
    /// UTM hemisphere ("North"/"South"), when projected
    pub hemisphere: Option<String>,
    /// Datum name
    pub datum: Option<String>,
    /// Map units
    pub units: Option<String>,
}

impl MapInfo {
    fn to_header_line(&self) -> String {
        let mut fields = vec![
            self.projection.clone(),
            "1.000".to_string(),
            "1.000".to_string(),
            format!("{:.6}", self.ulx),
            format!("{:.6}", self.uly),
            format!("{:.6}", self.xres),
            format!("{:.6}", self.yres),
        ];
        if let Some(zone) = &self.zone {
            fields.push(zone.clone());
        }
        if let Some(hemisphere) = &self.hemisphere {
            fields.push(hemisphere.clone());
        }
        if let Some(datum) = &self.datum {
            fields.push(datum.clone());
        }
        if let Some(units) = &self.units {
            fields.push(format!("units={}", units));
        }
        format!("map info = {{{}}}", fields.join(", "))
    }
}

/// Parsed ENVI `.hdr` sidecar.
#[derive(Debug, Clone)]
pub struct EnviHeader {
    pub description: String,
    /// Number of columns
    pub samples: usize,
    /// Number of rows
    pub lines: usize,
    pub bands: usize,
    pub header_offset: usize,
    pub data_type: EnviDataType,
    pub interleave: String,
    pub byte_order: u8,
    pub map_info: Option<MapInfo>,
    pub coordinate_system: Option<String>,
    pub data_ignore_value: Option<f64>,
}

impl EnviHeader {
    /// Build a header describing a raster, for writing datasets that did not
    /// originate from an ENVI source (tests, synthetic grids).
    pub fn from_raster<T: RasterElement>(
        raster: &Raster<T>,
        description: impl Into<String>,
    ) -> Self {
        let gt = raster.transform();
        Self {
            description: description.into(),
            samples: raster.cols(),
            lines: raster.rows(),
            bands: 1,
            header_offset: 0,
            data_type: if T::is_float() {
                EnviDataType::F64
            } else {
                EnviDataType::U8
            },
            interleave: "bsq".to_string(),
            byte_order: 0,
            map_info: Some(MapInfo {
                projection: "Arbitrary".to_string(),
                ulx: gt.origin_x,
                uly: gt.origin_y,
                xres: gt.xres(),
                yres: gt.yres(),
                zone: None,
                hemisphere: None,
                datum: None,
                units: Some("Meters".to_string()),
            }),
            coordinate_system: None,
            data_ignore_value: Some(crate::NODATA),
        }
    }

    /// GeoTransform described by this header, if it carries map info
    pub fn transform(&self) -> Option<GeoTransform> {
        self.map_info
            .as_ref()
            .map(|mi| GeoTransform::new(mi.ulx, mi.uly, mi.xres, -mi.yres))
    }

    /// Parse a `.hdr` file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, label: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidHeader {
            path: label.to_string(),
            reason: reason.to_string(),
        };

        let mut description = String::new();
        let mut samples = None;
        let mut lines_n = None;
        let mut bands = 1usize;
        let mut header_offset = 0usize;
        let mut data_type = None;
        let mut interleave = "bsq".to_string();
        let mut byte_order = 0u8;
        let mut map_info = None;
        let mut coordinate_system = None;
        let mut data_ignore_value = None;

        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let mut value = value.trim().to_string();

            // Braced values may continue over several lines
            if value.starts_with('{') && !value.contains('}') {
                for cont in lines.by_ref() {
                    value.push(' ');
                    value.push_str(cont.trim());
                    if cont.contains('}') {
                        break;
                    }
                }
            }

            match key.as_str() {
                "description" => description = strip_braces(&value).to_string(),
                "samples" => {
                    samples = Some(
                        value
                            .parse()
                            .map_err(|_| invalid("samples is not an integer"))?,
                    )
                }
                "lines" => {
                    lines_n = Some(
                        value
                            .parse()
                            .map_err(|_| invalid("lines is not an integer"))?,
                    )
                }
                "bands" => {
                    bands = value
                        .parse()
                        .map_err(|_| invalid("bands is not an integer"))?
                }
                "header offset" => {
                    header_offset = value
                        .parse()
                        .map_err(|_| invalid("header offset is not an integer"))?
                }
                "data type" => {
                    let code: u8 = value
                        .parse()
                        .map_err(|_| invalid("data type is not an integer"))?;
                    data_type = Some(EnviDataType::from_code(code)?);
                }
                "interleave" => interleave = value.to_ascii_lowercase(),
                "byte order" => {
                    byte_order = value
                        .parse()
                        .map_err(|_| invalid("byte order is not an integer"))?
                }
                "map info" => map_info = Some(parse_map_info(&value, label)?),
                "coordinate system string" => {
                    coordinate_system = Some(strip_braces(&value).to_string())
                }
                "data ignore value" => {
                    data_ignore_value = Some(
                        value
                            .parse()
                            .map_err(|_| invalid("data ignore value is not a number"))?,
                    )
                }
                _ => {}
            }
        }

        Ok(Self {
            description,
            samples: samples.ok_or_else(|| invalid("missing samples"))?,
            lines: lines_n.ok_or_else(|| invalid("missing lines"))?,
            bands,
            header_offset,
            data_type: data_type.ok_or_else(|| invalid("missing data type"))?,
            interleave,
            byte_order,
            map_info,
            coordinate_system,
            data_ignore_value,
        })
    }

    fn to_header_text(&self) -> String {
        let mut out = String::from("ENVI\n");
        let _ = writeln!(out, "description = {{{}}}", self.description);
        let _ = writeln!(out, "samples = {}", self.samples);
        let _ = writeln!(out, "lines = {}", self.lines);
        let _ = writeln!(out, "bands = {}", self.bands);
        let _ = writeln!(out, "header offset = {}", self.header_offset);
        out.push_str("file type = ENVI Standard\n");
        let _ = writeln!(out, "data type = {}", self.data_type.code());
        let _ = writeln!(out, "interleave = {}", self.interleave);
        let _ = writeln!(out, "byte order = {}", self.byte_order);
        if let Some(mi) = &self.map_info {
            let _ = writeln!(out, "{}", mi.to_header_line());
        }
        if let Some(cs) = &self.coordinate_system {
            let _ = writeln!(out, "coordinate system string = {{{}}}", cs);
        }
        if let Some(iv) = self.data_ignore_value {
            let _ = writeln!(out, "data ignore value = {}", iv);
        }
        out
    }
}

fn strip_braces(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
}

fn parse_map_info(value: &str, label: &str) -> Result<MapInfo> {
    let invalid = |reason: String| Error::InvalidHeader {
        path: label.to_string(),
        reason,
    };

    let fields: Vec<&str> = strip_braces(value).split(',').map(str::trim).collect();
    if fields.len() < 7 {
        return Err(invalid(format!(
            "map info has {} fields, expected at least 7",
            fields.len()
        )));
    }

    let num = |idx: usize, name: &str| -> Result<f64> {
        fields[idx]
            .parse()
            .map_err(|_| invalid(format!("map info {} is not a number: {}", name, fields[idx])))
    };

    let projection = fields[0].to_string();
    let ulx = num(3, "ulx")?;
    let uly = num(4, "uly")?;
    let xres = num(5, "xres")?;
    let yres = num(6, "yres")?;

    let mut zone = None;
    let mut hemisphere = None;
    let mut datum = None;
    let mut units = None;

    let mut rest = fields[7..].iter();
    if projection.eq_ignore_ascii_case("utm") {
        zone = rest.next().map(|s| s.to_string());
        hemisphere = rest.next().map(|s| s.to_string());
    }
    for field in rest {
        if let Some(u) = field.strip_prefix("units=") {
            units = Some(u.to_string());
        } else if datum.is_none() {
            datum = Some(field.to_string());
        }
    }

    Ok(MapInfo {
        projection,
        ulx,
        uly,
        xres,
        yres,
        zone,
        hemisphere,
        datum,
        units,
    })
}

fn dat_path(stem: &Path) -> PathBuf {
    PathBuf::from(format!("{}.dat", stem.display()))
}

fn hdr_path(stem: &Path) -> PathBuf {
    PathBuf::from(format!("{}.hdr", stem.display()))
}

/// Read an ENVI dataset (`<stem>.hdr` + `<stem>.dat`) into a raster.
///
/// Cell values are cast to `T`; values that cannot be represented become the
/// type's default no-data. Returns the parsed header alongside the raster so
/// projection strings can be carried through to derived products.
pub fn read_envi<T, P>(stem: P) -> Result<(Raster<T>, EnviHeader)>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let stem = stem.as_ref();
    let header = EnviHeader::from_path(&hdr_path(stem))?;

    if header.bands != 1 {
        return Err(Error::UnsupportedDataType(format!(
            "{} bands (only single-band rasters are supported)",
            header.bands
        )));
    }
    if header.byte_order != 0 {
        return Err(Error::UnsupportedDataType(
            "big-endian ENVI data".to_string(),
        ));
    }
    if !header.interleave.eq_ignore_ascii_case("bsq") {
        return Err(Error::UnsupportedDataType(format!(
            "interleave '{}' (only bsq is supported)",
            header.interleave
        )));
    }

    let bytes = fs::read(dat_path(stem))?;
    let width = header.data_type.byte_width();
    let npix = header.samples * header.lines;
    let expected = header.header_offset + npix * width;
    if bytes.len() < expected {
        return Err(Error::InvalidDimensions {
            width: header.samples,
            height: header.lines,
        });
    }

    let payload = &bytes[header.header_offset..expected];
    let mut data = Vec::with_capacity(npix);
    for chunk in payload.chunks_exact(width) {
        let v = decode_cell(chunk, header.data_type);
        data.push(T::from_f64(v));
    }

    let mut raster = Raster::from_vec(data, header.lines, header.samples)?;
    if let Some(transform) = header.transform() {
        raster.set_transform(transform);
    }
    if let Some(iv) = header.data_ignore_value {
        // Only meaningful when the ignore value is representable in T
        if let Some(nd) = num_traits::cast(iv) {
            raster.set_nodata(Some(nd));
        }
    }

    Ok((raster, header))
}

/// Write a raster as an ENVI dataset (`<stem>.hdr` + `<stem>.dat`).
///
/// `data_type` selects the on-disk cell encoding; geographic fields are
/// carried from `template` while dimensions and cell type come from the
/// raster itself.
pub fn write_envi<T, P>(
    raster: &Raster<T>,
    stem: P,
    data_type: EnviDataType,
    template: &EnviHeader,
) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let stem = stem.as_ref();

    let header = EnviHeader {
        samples: raster.cols(),
        lines: raster.rows(),
        bands: 1,
        header_offset: 0,
        data_type,
        interleave: "bsq".to_string(),
        byte_order: 0,
        ..template.clone()
    };
    fs::write(hdr_path(stem), header.to_header_text())?;

    let mut bytes = Vec::with_capacity(raster.len() * data_type.byte_width());
    for &value in raster.data().iter() {
        let v = value.to_f64().unwrap_or(crate::NODATA);
        encode_cell(v, data_type, &mut bytes);
    }
    fs::write(dat_path(stem), bytes)?;

    Ok(())
}

fn decode_cell(chunk: &[u8], data_type: EnviDataType) -> f64 {
    match data_type {
        EnviDataType::U8 => chunk[0] as f64,
        EnviDataType::I16 => i16::from_le_bytes([chunk[0], chunk[1]]) as f64,
        EnviDataType::I32 => {
            i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64
        }
        EnviDataType::F32 => {
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64
        }
        EnviDataType::F64 => f64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]),
    }
}

fn encode_cell(v: f64, data_type: EnviDataType, out: &mut Vec<u8>) {
    match data_type {
        EnviDataType::U8 => out.push(v as u8),
        EnviDataType::I16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
        EnviDataType::I32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
        EnviDataType::F32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
        EnviDataType::F64 => out.extend_from_slice(&v.to_le_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE_HDR: &str = "\
ENVI
description = {Coastal lidar DEM}
samples = 120
lines = 80
bands = 1
header offset = 0
file type = ENVI Standard
data type = 4
interleave = bsq
byte order = 0
map info = {UTM, 1.000, 1.000, 441200.0, 3034500.0, 1.0, 1.0, 14, North, WGS-84, units=Meters}
data ignore value = -9999
";

    #[test]
    fn test_parse_header() {
        let hdr = EnviHeader::parse(SAMPLE_HDR, "sample").unwrap();
        assert_eq!(hdr.samples, 120);
        assert_eq!(hdr.lines, 80);
        assert_eq!(hdr.data_type, EnviDataType::F32);
        assert_eq!(hdr.data_ignore_value, Some(-9999.0));

        let mi = hdr.map_info.as_ref().unwrap();
        assert_eq!(mi.projection, "UTM");
        assert_relative_eq!(mi.ulx, 441200.0);
        assert_relative_eq!(mi.uly, 3034500.0);
        assert_eq!(mi.zone.as_deref(), Some("14"));
        assert_eq!(mi.hemisphere.as_deref(), Some("North"));
        assert_eq!(mi.datum.as_deref(), Some("WGS-84"));
        assert_eq!(mi.units.as_deref(), Some("Meters"));

        let gt = hdr.transform().unwrap();
        assert_relative_eq!(gt.origin_x, 441200.0);
        assert_relative_eq!(gt.pixel_height, -1.0);
    }

    #[test]
    fn test_parse_header_missing_dims() {
        let err = EnviHeader::parse("ENVI\ndata type = 4\n", "broken").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { .. }));
    }

    #[test]
    fn test_data_type_codes() {
        for dt in [
            EnviDataType::U8,
            EnviDataType::I16,
            EnviDataType::I32,
            EnviDataType::F32,
            EnviDataType::F64,
        ] {
            assert_eq!(EnviDataType::from_code(dt.code()).unwrap(), dt);
        }
        assert!(EnviDataType::from_code(12).is_err());
    }

    #[test]
    fn test_roundtrip_f64() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("dem");

        let mut raster: Raster<f64> = Raster::new(6, 5);
        raster.set_transform(GeoTransform::new(441200.0, 3034500.0, 2.0, -2.0));
        raster.set_nodata(Some(crate::NODATA));
        for row in 0..6 {
            for col in 0..5 {
                raster.set(row, col, row as f64 + col as f64 * 0.25).unwrap();
            }
        }
        raster.set(0, 0, crate::NODATA).unwrap();

        let header = EnviHeader::from_raster(&raster, "roundtrip");
        write_envi(&raster, &stem, EnviDataType::F64, &header).unwrap();

        let (copy, hdr): (Raster<f64>, _) = read_envi(&stem).unwrap();
        assert_eq!(copy.shape(), raster.shape());
        assert_eq!(hdr.data_type, EnviDataType::F64);
        assert_relative_eq!(copy.transform().origin_x, 441200.0);
        assert_relative_eq!(copy.transform().pixel_height, -2.0);
        assert_eq!(copy.nodata(), Some(crate::NODATA));

        for row in 0..6 {
            for col in 0..5 {
                assert_relative_eq!(
                    copy.get(row, col).unwrap(),
                    raster.get(row, col).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_roundtrip_u8_markers() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("markers");

        let mut raster: Raster<u8> = Raster::new(4, 4);
        raster.set(2, 3, 1).unwrap();

        let header = EnviHeader::from_raster(&raster, "marker layer");
        write_envi(&raster, &stem, EnviDataType::U8, &header).unwrap();

        let (copy, hdr): (Raster<u8>, _) = read_envi(&stem).unwrap();
        assert_eq!(hdr.data_type, EnviDataType::U8);
        assert_eq!(copy.get(2, 3).unwrap(), 1);
        assert_eq!(copy.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_truncated_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("short");

        let raster: Raster<f64> = Raster::new(4, 4);
        let header = EnviHeader::from_raster(&raster, "short");
        write_envi(&raster, &stem, EnviDataType::F64, &header).unwrap();

        // Truncate the data file, then re-read
        let dat = PathBuf::from(format!("{}.dat", stem.display()));
        let bytes = fs::read(&dat).unwrap();
        fs::write(&dat, &bytes[..bytes.len() / 2]).unwrap();

        let err = read_envi::<f64, _>(&stem).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { .. }));
    }
}
