//! Risk model configuration
//!
//! Every constant of the model lives here. `RiskConfig::default()` is the
//! reference model; a JSON file may override any subset of fields.

use serde::{Deserialize, Serialize};

use brisk_core::{Error, Result};

use super::combine::Weights;
use super::normalize::Domain;
use crate::distance::{BeyondRadius, EmptySourcePolicy, RasterDistanceParams, VectorDistanceParams};
use crate::terrain::{EdgeMode, SlopeParams, SlopeUnits};

/// Complete risk model configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub water: WaterConfig,
    pub soil: SoilConfig,
    pub slope: SlopeConfig,
    pub land_cover: LandCoverConfig,
    pub weights: Weights,
}

impl RiskConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: RiskConfig =
            serde_json::from_str(text).map_err(|e| Error::Other(format!("invalid risk config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }

    /// Check every domain, distance and weight before any grid is touched.
    pub fn validate(&self) -> Result<()> {
        self.water.domain.validate()?;
        self.soil.domain.validate()?;
        self.slope.domain.validate()?;
        self.weights.validate()?;

        let positive = |name: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::invalid_parameter(name, v, "must be finite and positive"))
            }
        };
        positive("water.search_radius", self.water.search_radius)?;
        positive("slope.z_factor", self.slope.z_factor)?;
        positive("land_cover.max_built_up_distance", self.land_cover.max_built_up_distance)?;
        if !self.water.max_error.is_finite() || self.water.max_error < 0.0 {
            return Err(Error::invalid_parameter(
                "water.max_error",
                self.water.max_error,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Water-proximity indicator: distance to the nearest watercourse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Meters
    pub search_radius: f64,
    /// Meters
    pub max_error: f64,
    pub beyond_radius: BeyondRadius,
    pub empty: EmptySourcePolicy,
    pub domain: Domain,
    pub invert: bool,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            search_radius: 10_000.0,
            max_error: 10.0,
            beyond_radius: BeyondRadius::Saturate,
            empty: EmptySourcePolicy::Saturate,
            domain: Domain { min: 0.0, max: 5_000.0 },
            invert: true,
        }
    }
}

impl WaterConfig {
    pub fn distance_params(&self) -> VectorDistanceParams {
        VectorDistanceParams {
            search_radius: self.search_radius,
            max_error: self.max_error,
            beyond_radius: self.beyond_radius,
            empty: self.empty,
        }
    }
}

/// Soil-permeability indicator: texture class scaled directly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    pub domain: Domain,
    pub invert: bool,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            domain: Domain { min: 0.0, max: 12.0 },
            invert: false,
        }
    }
}

/// Slope indicator: terrain slope in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeConfig {
    pub z_factor: f64,
    pub domain: Domain,
    pub invert: bool,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            z_factor: 1.0,
            domain: Domain { min: 0.0, max: 30.0 },
            invert: true,
        }
    }
}

impl SlopeConfig {
    pub fn slope_params(&self) -> SlopeParams {
        SlopeParams {
            units: SlopeUnits::Degrees,
            z_factor: self.z_factor,
            edges: EdgeMode::Replicate,
        }
    }
}

/// Brownfield-likelihood gate over land-cover classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandCoverConfig {
    /// Bare / sparse vegetation class code
    pub bare_class: u8,
    /// Built-up class code
    pub built_up_class: u8,
    /// Bare cells strictly closer than this (meters) to built-up land qualify
    pub max_built_up_distance: f64,
    pub empty: EmptySourcePolicy,
}

impl Default for LandCoverConfig {
    fn default() -> Self {
        Self {
            bare_class: 60,
            built_up_class: 50,
            max_built_up_distance: 500.0,
            empty: EmptySourcePolicy::Saturate,
        }
    }
}

impl LandCoverConfig {
    /// Distances only matter up to the gate threshold, so the transform
    /// saturates there.
    pub fn distance_params(&self) -> RasterDistanceParams {
        RasterDistanceParams {
            max_distance: Some(self.max_built_up_distance),
            empty: self.empty,
        }
    }
}
