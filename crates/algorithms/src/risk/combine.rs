//! Weighted combination of the four indicators into one risk score

use ndarray::Zip;
use serde::{Deserialize, Serialize};

use brisk_core::raster::{Raster, RasterStatistics};
use brisk_core::{Error, Result};

use super::normalize::{Indicator, IndicatorGrid};

/// Relative importance of each indicator.
///
/// The combiner divides by the weight sum, so weights need not add up to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub water: f64,
    pub soil: f64,
    pub slope: f64,
    pub land_cover: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            water: 0.25,
            soil: 0.25,
            slope: 0.25,
            land_cover: 0.25,
        }
    }
}

impl Weights {
    pub fn new(water: f64, soil: f64, slope: f64, land_cover: f64) -> Result<Self> {
        let weights = Self {
            water,
            soil,
            slope,
            land_cover,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Weight of one indicator
    pub fn get(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::Water => self.water,
            Indicator::Soil => self.soil,
            Indicator::Slope => self.slope,
            Indicator::LandCover => self.land_cover,
        }
    }

    /// Weights in [`Indicator::ALL`] order
    pub fn as_array(&self) -> [f64; 4] {
        Indicator::ALL.map(|i| self.get(i))
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Weights must be finite, non-negative, and not all zero.
    pub fn validate(&self) -> Result<()> {
        for indicator in Indicator::ALL {
            let w = self.get(indicator);
            if !w.is_finite() || w < 0.0 {
                return Err(Error::invalid_parameter(
                    "weights",
                    format!("{}={}", indicator, w),
                    "weights must be finite and non-negative",
                ));
            }
        }
        if self.sum() <= 0.0 {
            return Err(Error::invalid_parameter(
                "weights",
                format!("{:?}", self.as_array()),
                "at least one weight must be positive",
            ));
        }
        Ok(())
    }
}

/// Final risk surface, valid cells in [0, 1]
#[derive(Debug, Clone)]
pub struct RiskScoreGrid(Raster<f64>);

impl RiskScoreGrid {
    pub fn raster(&self) -> &Raster<f64> {
        &self.0
    }

    pub fn into_raster(self) -> Raster<f64> {
        self.0
    }

    pub fn statistics(&self) -> RasterStatistics<f64> {
        self.0.statistics()
    }
}

/// Weighted mean of the four indicators, in [`Indicator::ALL`] order.
///
/// All indicators must share one template. A cell is no-data if any
/// indicator is no-data there, by NaN or by its declared sentinel.
pub fn combine(indicators: &[IndicatorGrid; 4], weights: &Weights) -> Result<RiskScoreGrid> {
    weights.validate()?;

    let [water, soil, slope, land_cover] = indicators.each_ref().map(IndicatorGrid::raster);
    for other in [soil, slope, land_cover] {
        water.ensure_coregistered(other)?;
    }

    let w = weights.as_array();
    let total = w[0] + w[1] + w[2] + w[3];

    let data = Zip::from(water.data())
        .and(soil.data())
        .and(slope.data())
        .and(land_cover.data())
        .map_collect(|&a, &b, &c, &d| {
            let missing = water.is_nodata(a)
                || soil.is_nodata(b)
                || slope.is_nodata(c)
                || land_cover.is_nodata(d);
            if missing {
                return f64::NAN;
            }
            // Same summation order as `total`, so all-ones gives exactly 1
            let score = (w[0] * a + w[1] * b + w[2] * c + w[3] * d) / total;
            score.clamp(0.0, 1.0)
        });

    water.with_data(data, Some(f64::NAN)).map(RiskScoreGrid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brisk_core::{GeoTransform, GridTemplate};

    fn template() -> GridTemplate {
        GridTemplate::new(1, 3, GeoTransform::new(0.0, 10.0, 10.0, -10.0)).unwrap()
    }

    fn indicator(values: [f64; 3]) -> IndicatorGrid {
        let mut r = Raster::from_template_vec(&template(), values.to_vec()).unwrap();
        r.set_nodata(Some(f64::NAN));
        IndicatorGrid::from_raster(r).unwrap()
    }

    #[test]
    fn test_all_ones_and_all_zeros() {
        let ones = indicator([1.0; 3]);
        let zeros = indicator([0.0; 3]);

        let high = combine(&[ones.clone(), ones.clone(), ones.clone(), ones.clone()], &Weights::default()).unwrap();
        let low = combine(&[zeros.clone(), zeros.clone(), zeros.clone(), zeros], &Weights::default()).unwrap();

        assert!(high.raster().data().iter().all(|&v| v == 1.0));
        assert!(low.raster().data().iter().all(|&v| v == 0.0));

        // Uneven weights still map all-ones to exactly 1
        let uneven = Weights::new(0.1, 0.7, 0.13, 0.07).unwrap();
        let high = combine(&[ones.clone(), ones.clone(), ones.clone(), ones], &uneven).unwrap();
        assert!(high.raster().data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_equal_weights_is_the_mean() {
        let grids = [
            indicator([1.0, 0.0, 0.5]),
            indicator([1.0, 0.0, 0.25]),
            indicator([0.0, 0.0, 0.75]),
            indicator([0.0, 1.0, 0.5]),
        ];
        let score = combine(&grids, &Weights::default()).unwrap();
        assert_relative_eq!(score.raster().get(0, 0).unwrap(), 0.5);
        assert_relative_eq!(score.raster().get(0, 1).unwrap(), 0.25);
        assert_relative_eq!(score.raster().get(0, 2).unwrap(), 0.5);
    }

    #[test]
    fn test_weights_are_normalized_by_their_sum() {
        let grids = [
            indicator([1.0; 3]),
            indicator([0.0; 3]),
            indicator([0.0; 3]),
            indicator([0.0; 3]),
        ];
        let score = combine(&grids, &Weights::new(2.0, 1.0, 1.0, 0.0).unwrap()).unwrap();
        assert_relative_eq!(score.raster().get(0, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_nodata_in_any_indicator() {
        let grids = [
            indicator([1.0, 1.0, 1.0]),
            indicator([1.0, f64::NAN, 1.0]),
            indicator([1.0; 3]),
            indicator([1.0; 3]),
        ];
        let score = combine(&grids, &Weights::default()).unwrap();
        assert!(score.raster().is_nodata_at(0, 1).unwrap());
        assert_eq!(score.statistics().valid_count, 2);
    }

    #[test]
    fn test_sentinel_nodata_in_an_indicator() {
        let mut water = Raster::from_template_vec(&template(), vec![-9999.0, 1.0, 0.5]).unwrap();
        water.set_nodata(Some(-9999.0));
        let water = IndicatorGrid::from_raster(water).unwrap();
        let ones = indicator([1.0; 3]);

        let score = combine(&[water, ones.clone(), ones.clone(), ones], &Weights::default()).unwrap();
        assert!(score.raster().get(0, 0).unwrap().is_nan());
        assert!(score.raster().is_nodata_at(0, 0).unwrap());
        assert_eq!(score.raster().get(0, 1).unwrap(), 1.0);
        assert_relative_eq!(score.raster().get(0, 2).unwrap(), 0.875);
        assert_eq!(score.statistics().valid_count, 2);
    }

    #[test]
    fn test_rejects_bad_weights() {
        assert!(Weights::new(-0.1, 0.5, 0.3, 0.3).is_err());
        assert!(Weights::new(0.0, 0.0, 0.0, 0.0).is_err());
        assert!(Weights::new(f64::NAN, 1.0, 1.0, 1.0).is_err());

        let g = indicator([0.5; 3]);
        let bad = Weights { water: -1.0, ..Default::default() };
        assert!(combine(&[g.clone(), g.clone(), g.clone(), g], &bad).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let shifted = GridTemplate::new(1, 3, GeoTransform::new(10.0, 10.0, 10.0, -10.0)).unwrap();
        let mut r = Raster::from_template(&shifted, 0.5);
        r.set_nodata(Some(f64::NAN));
        let odd = IndicatorGrid::from_raster(r).unwrap();
        let g = indicator([0.5; 3]);

        assert!(matches!(
            combine(&[g.clone(), g.clone(), odd, g], &Weights::default()),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
