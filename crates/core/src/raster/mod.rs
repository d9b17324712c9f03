//! Raster data structures and operations

mod algebra;
mod element;
mod geotransform;
mod grid;
mod template;

pub use algebra::CategoricalMask;
pub use element::{RasterElement, MASK_NODATA};
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use template::GridTemplate;
