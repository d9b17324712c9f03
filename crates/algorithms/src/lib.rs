//! # Brisk Algorithms
//!
//! Grid algorithms and the contamination-risk model for Brisk.
//!
//! ## Modules
//!
//! - **distance**: Euclidean distance to a raster mask or to vector features
//! - **terrain**: Slope (Horn's method)
//! - **risk**: Normalizer, the four indicators, weighted combiner, configuration
//! - **pipeline**: Layer sources and the end-to-end driver

pub(crate) mod maybe_rayon;

pub mod distance;
pub mod pipeline;
pub mod risk;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::distance::{
        distance_to_features, distance_to_mask, BeyondRadius, EmptySourcePolicy, RasterDistance,
        RasterDistanceParams, VectorDistance, VectorDistanceParams,
    };
    pub use crate::pipeline::{
        CancelFlag, DerivedLayers, InMemorySource, LayerSource, Pipeline, RiskProduct, SourceLayers,
    };
    pub use crate::risk::{
        combine, normalize, Domain, Indicator, IndicatorGrid, RiskConfig, RiskScoreGrid, Weights,
    };
    pub use crate::terrain::{slope, Slope, SlopeParams, SlopeUnits};
    pub use brisk_core::prelude::*;
}
