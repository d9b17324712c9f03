//! Pipeline driver
//!
//! Loads the four source layers onto one [`GridTemplate`], derives the four
//! indicators independently (in parallel with the `parallel` feature), and
//! combines them into a [`RiskScoreGrid`]. Any failure aborts the run with the
//! originating error; there are no retries and no partial results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use brisk_core::raster::{GridTemplate, Raster, RasterElement};
use brisk_core::{Error, FeatureSet, Region, Result};

use crate::maybe_rayon::join;
use crate::risk::{
    combine, land_cover_indicator, slope_indicator, soil_indicator, water_indicator, IndicatorGrid,
    RiskConfig, RiskScoreGrid,
};

/// Supplier of the raw layers of a run.
///
/// Rasters may cover more than the template; the pipeline clips them. A
/// failure to supply a layer should be reported as
/// [`Error::SourceUnavailable`] and is passed through unchanged.
pub trait LayerSource {
    /// Categorical land cover (ESA WorldCover codes: 50 built-up, 60 bare)
    fn land_cover(&self, template: &GridTemplate) -> Result<Raster<u8>>;

    /// Watercourse geometry intersecting `region`
    fn watercourses(&self, region: &Region) -> Result<FeatureSet>;

    /// Soil texture class, 1 (clay) to 12 (sand)
    fn soil_texture(&self, template: &GridTemplate) -> Result<Raster<u8>>;

    /// Elevation in meters
    fn elevation(&self, template: &GridTemplate) -> Result<Raster<f64>>;
}

/// [`LayerSource`] over layers already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub land_cover: Option<Raster<u8>>,
    pub watercourses: Option<FeatureSet>,
    pub soil_texture: Option<Raster<u8>>,
    pub elevation: Option<Raster<f64>>,
}

fn missing<T>(layer: Option<&T>, name: &str) -> Result<T>
where
    T: Clone,
{
    layer
        .cloned()
        .ok_or_else(|| Error::source_unavailable(name, "layer not loaded"))
}

impl LayerSource for InMemorySource {
    fn land_cover(&self, _template: &GridTemplate) -> Result<Raster<u8>> {
        missing(self.land_cover.as_ref(), "land_cover")
    }

    fn watercourses(&self, region: &Region) -> Result<FeatureSet> {
        missing(self.watercourses.as_ref(), "watercourses").map(|f| f.filter_region(region))
    }

    fn soil_texture(&self, _template: &GridTemplate) -> Result<Raster<u8>> {
        missing(self.soil_texture.as_ref(), "soil_texture")
    }

    fn elevation(&self, _template: &GridTemplate) -> Result<Raster<f64>> {
        missing(self.elevation.as_ref(), "elevation")
    }
}

/// Shared flag for aborting a run between stages
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw layers of a run, all on the run's template
#[derive(Debug, Clone)]
pub struct SourceLayers {
    pub land_cover: Raster<u8>,
    pub watercourses: FeatureSet,
    pub soil_texture: Raster<u8>,
    pub elevation: Raster<f64>,
}

/// Intermediate grids kept for inspection
#[derive(Debug, Clone)]
pub struct DerivedLayers {
    /// Meters to the nearest watercourse
    pub water_distance: Raster<f64>,
    /// Slope in degrees
    pub slope_degrees: Raster<f64>,
    /// Meters to the nearest built-up cell, saturated at the gate threshold
    pub built_up_distance: Raster<f64>,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct RiskProduct {
    pub template: GridTemplate,
    pub water: IndicatorGrid,
    pub soil: IndicatorGrid,
    pub slope: IndicatorGrid,
    pub land_cover: IndicatorGrid,
    pub score: RiskScoreGrid,
    pub derived: DerivedLayers,
}

impl RiskProduct {
    /// Indicators in combiner order
    pub fn indicators(&self) -> [&IndicatorGrid; 4] {
        [&self.water, &self.soil, &self.slope, &self.land_cover]
    }
}

/// One configured risk model
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: RiskConfig,
    cancel: CancelFlag,
}

impl Pipeline {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Use `flag` to abort runs from another thread
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Load, derive and combine.
    pub fn run<S: LayerSource + ?Sized>(&self, source: &S, template: &GridTemplate) -> Result<RiskProduct> {
        self.config.validate()?;
        let layers = self.load(source, template)?;
        self.run_on_layers(&layers, template)
    }

    /// Fetch every layer and bring rasters onto `template`.
    pub fn load<S: LayerSource + ?Sized>(&self, source: &S, template: &GridTemplate) -> Result<SourceLayers> {
        self.check_cancelled()?;

        let river_window = template.region().grow(self.config.water.search_radius);
        let layers = SourceLayers {
            land_cover: fit(source.land_cover(template)?, template)?,
            watercourses: source.watercourses(&river_window)?,
            soil_texture: fit(source.soil_texture(template)?, template)?,
            elevation: fit(source.elevation(template)?, template)?,
        };

        self.check_cancelled()?;
        Ok(layers)
    }

    /// Derive and combine the indicators from layers already on `template`.
    pub fn run_on_layers(&self, layers: &SourceLayers, template: &GridTemplate) -> Result<RiskProduct> {
        self.config.validate()?;
        layers.land_cover.ensure_on(template)?;
        layers.soil_texture.ensure_on(template)?;
        layers.elevation.ensure_on(template)?;
        self.check_cancelled()?;

        let config = &self.config;
        let ((water, soil), (slope, land_cover)) = join(
            || {
                join(
                    || water_indicator(&layers.watercourses, template, &config.water),
                    || soil_indicator(&layers.soil_texture, &config.soil),
                )
            },
            || {
                join(
                    || slope_indicator(&layers.elevation, &config.slope),
                    || land_cover_indicator(&layers.land_cover, &config.land_cover),
                )
            },
        );
        // Errors surface in a fixed order regardless of scheduling
        let (water, soil, slope, land_cover) = (water?, soil?, slope?, land_cover?);
        self.check_cancelled()?;

        let indicators = [water.indicator, soil, slope.indicator, land_cover.indicator];
        let score = combine(&indicators, &config.weights)?;
        let [water_grid, soil_grid, slope_grid, land_cover_grid] = indicators;

        Ok(RiskProduct {
            template: template.clone(),
            water: water_grid,
            soil: soil_grid,
            slope: slope_grid,
            land_cover: land_cover_grid,
            score,
            derived: DerivedLayers {
                water_distance: water.intermediate,
                slope_degrees: slope.intermediate,
                built_up_distance: land_cover.intermediate,
            },
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Pass a raster through if it already lives on `template`, otherwise clip it.
fn fit<T: RasterElement>(raster: Raster<T>, template: &GridTemplate) -> Result<Raster<T>> {
    if raster.template().is_coregistered(template) {
        Ok(raster)
    } else {
        raster.clip_to(template)
    }
}
