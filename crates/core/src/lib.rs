//! # Brisk Core
//!
//! Core types and I/O for the Brisk brownfield contamination-risk pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: immutable-by-convention georeferenced grid with cell algebra
//! - `GridTemplate` / `Region`: the explicit study-area lattice every grid shares
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `FeatureSet`: vector features consumed by distance transforms
//! - `CRS`: Coordinate Reference System handling
//! - I/O for GeoTIFF rasters and GeoJSON features

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod region;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{CategoricalMask, GeoTransform, GridTemplate, Raster, RasterElement};
pub use region::Region;
pub use vector::{Feature, FeatureSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{CategoricalMask, GeoTransform, GridTemplate, Raster, RasterElement};
    pub use crate::region::Region;
    pub use crate::vector::{Feature, FeatureSet};
    pub use crate::Algorithm;
}

/// Core trait for the grid algorithms of Brisk.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
