//! Distance transforms
//!
//! Two ways of measuring how far each cell of a grid is from a reference set:
//! - **Raster mode**: distance to the nearest `1` cell of a categorical mask,
//!   via an exact separable Euclidean sweep scaled by the cell size
//! - **Vector mode**: planar distance from each cell center to the nearest
//!   geometry of a [`FeatureSet`](brisk_core::FeatureSet), bounded by a search
//!   radius
//!
//! All distances are in CRS units (meters for the projected grids the
//! pipeline works on), are never negative, and are 0 on the reference set.

mod raster;
mod vector;

use serde::{Deserialize, Serialize};

pub use raster::{distance_to_mask, RasterDistance, RasterDistanceParams};
pub use vector::{distance_to_features, BeyondRadius, VectorDistance, VectorDistanceParams};

/// What a distance transform returns when its source has nothing in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySourcePolicy {
    /// Every cell takes the saturation distance: the search radius in
    /// vector mode, `max_distance` (or the grid diagonal when unbounded) in
    /// raster mode.
    #[default]
    Saturate,
    /// Every cell is no-data.
    NoData,
    /// Fail with [`Error::EmptySource`](brisk_core::Error::EmptySource).
    Fail,
}
