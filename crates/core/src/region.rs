//! Rectangular regions of interest

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned rectangle in CRS units.
///
/// Used as the study-area boundary, as raster bounds, and as the filter
/// window for vector features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Region {
    /// Create a region, rejecting empty, inverted or non-finite rectangles.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let coords = [min_x, min_y, max_x, max_y];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid_parameter(
                "region",
                format!("{:?}", coords),
                "coordinates must be finite",
            ));
        }
        if min_x >= max_x || min_y >= max_y {
            return Err(Error::invalid_parameter(
                "region",
                format!("{:?}", coords),
                "min must be strictly less than max",
            ));
        }
        Ok(Self { min_x, min_y, max_x, max_y })
    }

    /// Degenerate region covering a single point
    pub(crate) fn point(x: f64, y: f64) -> Self {
        Self { min_x: x, min_y: y, max_x: x, max_y: y }
    }

    /// Smallest region containing `self` and the point `(x, y)`
    pub fn expand_to(self, x: f64, y: f64) -> Self {
        Self {
            min_x: self.min_x.min(x),
            min_y: self.min_y.min(y),
            max_x: self.max_x.max(x),
            max_y: self.max_y.max(y),
        }
    }

    /// Region grown by `margin` on every side
    pub fn grow(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Length of the diagonal, the largest distance between two points inside
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Planar distance from a point to the rectangle (0 when inside)
    pub fn distance_to_point(&self, x: f64, y: f64) -> f64 {
        let dx = (self.min_x - x).max(0.0).max(x - self.max_x);
        let dy = (self.min_y - y).max(0.0).max(y - self.max_y);
        dx.hypot(dy)
    }
}
