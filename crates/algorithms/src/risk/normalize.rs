//! Linear scaling of raw grids onto the [0, 1] risk scale

use std::fmt;

use serde::{Deserialize, Serialize};

use brisk_core::raster::Raster;
use brisk_core::{Error, Result};

/// The four risk factors, in the order the combiner weighs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Water,
    Soil,
    Slope,
    LandCover,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [
        Indicator::Water,
        Indicator::Soil,
        Indicator::Slope,
        Indicator::LandCover,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Indicator::Water => "water",
            Indicator::Soil => "soil",
            Indicator::Slope => "slope",
            Indicator::LandCover => "land_cover",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw-value range mapped onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    /// Create a domain, failing with [`Error::InvalidDomain`] unless
    /// `min < max` and both are finite.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let domain = Self { min, max };
        domain.validate()?;
        Ok(domain)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(Error::InvalidDomain {
                min: self.min,
                max: self.max,
            })
        }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// A grid whose valid cells all lie in [0, 1]; higher means more risk.
#[derive(Debug, Clone)]
pub struct IndicatorGrid(Raster<f64>);

impl IndicatorGrid {
    /// Wrap a raster already on the unit scale.
    ///
    /// Fails with [`Error::InvalidParameter`] if any valid cell is outside
    /// [0, 1].
    pub fn from_raster(raster: Raster<f64>) -> Result<Self> {
        let outside = raster
            .data()
            .iter()
            .find(|&&v| !raster.is_nodata(v) && !(0.0..=1.0).contains(&v));
        if let Some(v) = outside {
            return Err(Error::invalid_parameter(
                "indicator",
                v,
                "indicator values must lie in [0, 1]",
            ));
        }
        Ok(Self(raster))
    }

    pub fn raster(&self) -> &Raster<f64> {
        &self.0
    }

    pub fn into_raster(self) -> Raster<f64> {
        self.0
    }
}

/// Scale `grid` linearly from `domain` onto [0, 1].
///
/// `raw = (v - min) / (max - min)`, replaced by `1 - raw` when `invert` is
/// set (low raw values are the risky ones), then clamped to [0, 1]. No-data
/// cells stay no-data.
pub fn normalize(grid: &Raster<f64>, domain: &Domain, invert: bool) -> Result<IndicatorGrid> {
    domain.validate()?;

    let width = domain.width();
    let scaled = grid.map(|v| {
        let raw = (v - domain.min) / width;
        let raw = if invert { 1.0 - raw } else { raw };
        raw.clamp(0.0, 1.0)
    });
    Ok(IndicatorGrid(scaled))
}

/// Map an indicator back onto `domain`, the inverse of [`normalize`] for
/// values that were inside the domain.
pub fn denormalize(indicator: &IndicatorGrid, domain: &Domain, invert: bool) -> Result<Raster<f64>> {
    domain.validate()?;

    let width = domain.width();
    Ok(indicator.raster().map(|u| {
        let raw = if invert { 1.0 - u } else { u };
        raw * width + domain.min
    }))
}
