//! The four risk indicators
//!
//! Each function is a pure function of already co-registered source layers.
//! Those that go through a distance or slope step also hand back that
//! intermediate grid so it can be inspected.

use brisk_core::raster::{CategoricalMask, GridTemplate, Raster};
use brisk_core::{Error, FeatureSet, Result};

use super::config::{LandCoverConfig, SlopeConfig, SoilConfig, WaterConfig};
use super::normalize::{normalize, IndicatorGrid};
use crate::distance::{distance_to_features, distance_to_mask};
use crate::terrain::slope;

/// An indicator together with the raw grid it was scaled from
#[derive(Debug, Clone)]
pub struct WithIntermediate {
    pub indicator: IndicatorGrid,
    pub intermediate: Raster<f64>,
}

/// Water-proximity risk: 1 on a watercourse, falling linearly to 0 at the
/// far end of the domain (5 km by default).
///
/// The intermediate is the distance to the nearest watercourse in meters.
pub fn water_indicator(
    watercourses: &FeatureSet,
    template: &GridTemplate,
    config: &WaterConfig,
) -> Result<WithIntermediate> {
    let distance = distance_to_features(watercourses, template, &config.distance_params())
        .map_err(|e| relabel_empty(e, "watercourses"))?;
    let indicator = normalize(&distance, &config.domain, config.invert)?;
    Ok(WithIntermediate {
        indicator,
        intermediate: distance,
    })
}

/// Soil-permeability risk: the texture class (1-12, sandier is higher)
/// scaled directly.
pub fn soil_indicator(soil_texture: &Raster<u8>, config: &SoilConfig) -> Result<IndicatorGrid> {
    normalize(&soil_texture.cast::<f64>(), &config.domain, config.invert)
}

/// Slope risk: flat ground scores 1, slopes at or above the top of the
/// domain (30 degrees by default) score 0.
///
/// The intermediate is the slope in degrees.
pub fn slope_indicator(elevation: &Raster<f64>, config: &SlopeConfig) -> Result<WithIntermediate> {
    let degrees = slope(elevation, config.slope_params())?;
    let indicator = normalize(&degrees, &config.domain, config.invert)?;
    Ok(WithIntermediate {
        indicator,
        intermediate: degrees,
    })
}

/// Brownfield likelihood: 1 where land is bare or sparsely vegetated and
/// built-up land lies strictly closer than the threshold, 0 elsewhere.
///
/// This is a hard gate, not a gradient. The intermediate is the distance to
/// the nearest built-up cell, saturated at the threshold.
pub fn land_cover_indicator(land_cover: &Raster<u8>, config: &LandCoverConfig) -> Result<WithIntermediate> {
    let built_up: CategoricalMask = land_cover.eq_value(config.built_up_class);
    let bare: CategoricalMask = land_cover.eq_value(config.bare_class);

    let distance = distance_to_mask(&built_up, &config.distance_params())
        .map_err(|e| relabel_empty(e, "built-up land cover"))?;
    let near_built_up = distance.lt_value(config.max_built_up_distance);
    let gate = bare.and(&near_built_up)?;

    let indicator = IndicatorGrid::from_raster(gate.cast::<f64>())?;
    Ok(WithIntermediate {
        indicator,
        intermediate: distance,
    })
}

fn relabel_empty(err: Error, source_name: &str) -> Error {
    match err {
        Error::EmptySource { .. } => Error::EmptySource {
            source_name: source_name.to_string(),
        },
        other => other,
    }
}
