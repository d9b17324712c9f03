//! I/O operations for reading and writing geospatial data

mod geojson;
mod geotiff;

pub use self::geojson::{parse_feature_set, read_feature_set};
pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
};
