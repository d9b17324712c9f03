//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and understands the small subset of
//! GeoTIFF metadata the pipeline needs: pixel scale + tiepoint for the
//! transform, the EPSG code from the GeoKey directory, and the GDAL no-data
//! tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag; // 33550
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag; // 33922
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag; // 34735
const GDAL_NODATA: Tag = Tag::GdalNodata; // 42113

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Skip the GeoKey directory (plain TIFF with scale/tiepoint only)
    pub omit_geokeys: bool,
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    macro_rules! cast_buffer {
        ($buf:expr) => {
            $buf.iter()
                .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
                .collect()
        };
    }

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_buffer!(buf),
        DecodingResult::F64(buf) => cast_buffer!(buf),
        DecodingResult::U8(buf) => cast_buffer!(buf),
        DecodingResult::U16(buf) => cast_buffer!(buf),
        DecodingResult::U32(buf) => cast_buffer!(buf),
        DecodingResult::I8(buf) => cast_buffer!(buf),
        DecodingResult::I16(buf) => cast_buffer!(buf),
        DecodingResult::I32(buf) => cast_buffer!(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_epsg(&mut decoder).map(CRS::from_epsg));

    let nodata = read_nodata(&mut decoder).and_then(T::from_f64);
    raster.set_nodata(nodata.or_else(|| T::is_float().then(T::default_nodata)));

    Ok(raster)
}

fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_epsg<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok()?;

    // Header is 4 shorts; each key entry is (id, location, count, value)
    keys.get(4..)?
        .chunks_exact(4)
        .find(|entry| {
            (entry[0] == PROJECTED_CS_TYPE_KEY || entry[0] == GEOGRAPHIC_TYPE_KEY)
                && entry[1] == 0
        })
        .map(|entry| entry[3] as u32)
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    text.trim_end_matches('\0').trim().parse().ok()
}

/// Write a Raster to a GeoTIFF file
///
/// Cells are stored as 32-bit float; the no-data value and EPSG code are
/// written when known.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, file, options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let tiff_err = |what: &str, e: tiff::TiffError| Error::Other(format!("{}: {}", what, e));

    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_err("TIFF encoder error", e))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| tiff_err("Cannot write scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;

    if !options.omit_geokeys {
        let geokeys = geokey_directory(raster.crs());
        image
            .encoder()
            .write_tag(GEO_KEY_DIRECTORY, geokeys.as_slice())
            .map_err(|e| tiff_err("Cannot write geokey tag", e))?;
    }

    if let Some(text) = nodata_text(raster) {
        image
            .encoder()
            .write_tag(GDAL_NODATA, text.as_str())
            .map_err(|e| tiff_err("Cannot write nodata tag", e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| tiff_err("Cannot write image data", e))?;

    Ok(())
}

/// Minimal GeoKey directory: model type, raster type and, when the EPSG code
/// fits a short, the projected CRS.
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|code| u16::try_from(code).ok());
    let mut keys: Vec<u16> = vec![
        GT_MODEL_TYPE_KEY, 0, 1, 1, // ModelTypeProjected
        GT_RASTER_TYPE_KEY, 0, 1, 1, // RasterPixelIsArea
    ];
    if let Some(code) = epsg {
        keys.extend_from_slice(&[PROJECTED_CS_TYPE_KEY, 0, 1, code]);
    }
    let mut directory = vec![1, 1, 0, (keys.len() / 4) as u16];
    directory.extend(keys);
    directory
}

fn nodata_text<T: RasterElement>(raster: &Raster<T>) -> Option<String> {
    match raster.nodata().and_then(|v| v.to_f64()) {
        Some(v) if v.is_nan() => Some("nan".to_string()),
        Some(v) => Some(v.to_string()),
        None if T::is_float() => Some("nan".to_string()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GridTemplate, MASK_NODATA};

    fn template() -> GridTemplate {
        GridTemplate::new(3, 4, GeoTransform::new(380_000.0, 400_000.0, 10.0, -10.0))
            .unwrap()
            .with_crs(Some(CRS::british_national_grid()))
    }

    #[test]
    fn test_buffer_roundtrip_f64() {
        let values: Vec<f64> = (0..12).map(|v| v as f64 * 0.5).collect();
        let mut raster = Raster::from_template_vec(&template(), values).unwrap();
        raster.set(1, 1, f64::NAN).unwrap();

        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert!(back.ensure_on(&template()).is_ok());
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(27700));
        assert_eq!(back.get(2, 3).unwrap(), 5.5);
        assert!(back.is_nodata_at(1, 1).unwrap());
    }

    #[test]
    fn test_buffer_roundtrip_categorical() {
        let mut lc: Raster<u8> = Raster::from_template(&template(), 60);
        lc.set(0, 0, 50).unwrap();
        lc.set(2, 2, MASK_NODATA).unwrap();
        lc.set_nodata(Some(MASK_NODATA));

        let bytes = write_geotiff_to_buffer(&lc, None).unwrap();
        let back: Raster<u8> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.get(0, 0).unwrap(), 50);
        assert_eq!(back.get(1, 1).unwrap(), 60);
        assert_eq!(back.nodata(), Some(MASK_NODATA));
        assert!(back.is_nodata_at(2, 2).unwrap());
    }

    #[test]
    fn test_file_roundtrip() {
        let raster = Raster::from_template(&template(), 12.0f64);
        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), None).unwrap();

        let back: Raster<f64> = read_geotiff(tmp.path()).unwrap();
        assert_eq!(back.statistics().mean, Some(12.0));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result: Result<Raster<f64>> = read_geotiff("/nonexistent/brisk/lc.tif");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
