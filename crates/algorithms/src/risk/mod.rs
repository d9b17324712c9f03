//! Contamination-risk scoring
//!
//! Four independent indicators are derived from the source layers, each
//! scaled to [0, 1] by the same [`normalize`] primitive (higher = more risk),
//! then averaged by [`combine`] into a single risk score:
//!
//! | indicator | source | transform |
//! |---|---|---|
//! | water | watercourse features | vector distance, [0, 5000] m, inverted |
//! | soil | soil texture class (1-12) | [0, 12] |
//! | slope | elevation | Horn slope in degrees, [0, 30], inverted |
//! | land cover | land-cover classes | bare (60) within 500 m of built-up (50) |

mod combine;
mod config;
mod indicators;
mod normalize;

pub use combine::{combine, RiskScoreGrid, Weights};
pub use config::{LandCoverConfig, RiskConfig, SlopeConfig, SoilConfig, WaterConfig};
pub use indicators::{
    land_cover_indicator, slope_indicator, soil_indicator, water_indicator, WithIntermediate,
};
pub use normalize::{denormalize, normalize, Domain, Indicator, IndicatorGrid};
