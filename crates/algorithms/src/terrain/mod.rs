//! Terrain analysis algorithms
//!
//! - Slope: rate of change of elevation (Horn 1981), the input of the slope
//!   risk indicator

mod slope;

pub use slope::{slope, EdgeMode, Slope, SlopeParams, SlopeUnits};
