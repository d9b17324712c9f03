//! End-to-end runs of the risk pipeline on small synthetic study areas.

use brisk_algorithms::pipeline::{InMemorySource, LayerSource, Pipeline};
use brisk_algorithms::risk::{RiskConfig, Weights};
use brisk_core::{Error, Feature, FeatureSet, GeoTransform, GridTemplate, Raster, Region, Result};
use geo::{line_string, LineString};

/// A 1 x 2 strip of 10 m cells: bare land next to built-up land, a river
/// through both cell centers, sandy soil, flat ground.
fn strip() -> (GridTemplate, InMemorySource) {
    let tpl = GridTemplate::new(1, 2, GeoTransform::new(0.0, 10.0, 10.0, -10.0)).unwrap();
    let source = InMemorySource {
        land_cover: Some(Raster::from_template_vec(&tpl, vec![60, 50]).unwrap()),
        watercourses: Some(
            vec![Feature::new(line_string![(x: -100.0, y: 5.0), (x: 100.0, y: 5.0)])]
                .into_iter()
                .collect(),
        ),
        soil_texture: Some(Raster::from_template(&tpl, 12)),
        elevation: Some(Raster::from_template(&tpl, 35.0)),
    };
    (tpl, source)
}

/// A 40 x 40 study area of 25 m cells with varied terrain and land cover
fn study_area() -> (GridTemplate, InMemorySource) {
    let n = 40;
    let tpl = GridTemplate::new(n, n, GeoTransform::new(1_000.0, 2_000.0, 25.0, -25.0)).unwrap();

    let classes = [10u8, 40, 50, 60, 60, 80];
    let land_cover: Vec<u8> = (0..n * n).map(|i| classes[(i * 7 + i / n) % classes.len()]).collect();
    let soil: Vec<u8> = (0..n * n).map(|i| 1 + (i % 12) as u8).collect();
    let elevation: Vec<f64> = (0..n * n)
        .map(|i| {
            let (r, c) = ((i / n) as f64, (i % n) as f64);
            100.0 + 3.0 * r + (c * 0.4).sin() * 20.0
        })
        .collect();

    let river: LineString<f64> = (0..=20)
        .map(|k| (1_000.0 + k as f64 * 50.0, 1_500.0 + (k as f64).cos() * 100.0))
        .collect::<Vec<_>>()
        .into();

    let source = InMemorySource {
        land_cover: Some(Raster::from_template_vec(&tpl, land_cover).unwrap()),
        watercourses: Some(vec![Feature::new(river)].into_iter().collect()),
        soil_texture: Some(Raster::from_template_vec(&tpl, soil).unwrap()),
        elevation: Some(Raster::from_template_vec(&tpl, elevation).unwrap()),
    };
    (tpl, source)
}

#[test]
fn strip_scenario_scores_exactly_one() {
    let (tpl, source) = strip();
    let product = Pipeline::default().run(&source, &tpl).unwrap();

    assert_eq!(product.derived.water_distance.get(0, 0).unwrap(), 0.0);
    assert_eq!(product.derived.slope_degrees.get(0, 0).unwrap(), 0.0);
    assert_eq!(product.derived.built_up_distance.get(0, 0).unwrap(), 10.0);

    assert_eq!(product.water.raster().get(0, 0).unwrap(), 1.0);
    assert_eq!(product.soil.raster().get(0, 0).unwrap(), 1.0);
    assert_eq!(product.slope.raster().get(0, 0).unwrap(), 1.0);
    assert_eq!(product.land_cover.raster().get(0, 0).unwrap(), 1.0);
    assert_eq!(product.score.raster().get(0, 0).unwrap(), 1.0);

    // The built-up cell itself is not bare land
    assert_eq!(product.land_cover.raster().get(0, 1).unwrap(), 0.0);
    assert_eq!(product.score.raster().get(0, 1).unwrap(), 0.75);
}

#[test]
fn all_zero_indicators_score_zero() {
    let tpl = GridTemplate::new(1, 1, GeoTransform::new(0.0, 10.0, 10.0, -10.0)).unwrap();
    let source = InMemorySource {
        land_cover: Some(Raster::from_template(&tpl, 10)),
        watercourses: Some(FeatureSet::new()),
        soil_texture: Some(Raster::from_template(&tpl, 0)),
        // A single cell is flat; make the slope indicator zero through its domain instead
        elevation: Some(Raster::from_template(&tpl, 0.0)),
    };
    let mut config = RiskConfig::default();
    config.slope.domain.max = 1e-6;
    config.slope.invert = false;

    let product = Pipeline::new(config).run(&source, &tpl).unwrap();
    for indicator in product.indicators() {
        assert_eq!(indicator.raster().get(0, 0).unwrap(), 0.0);
    }
    assert_eq!(product.score.raster().get(0, 0).unwrap(), 0.0);
}

#[test]
fn reruns_are_bit_identical() {
    let (tpl, source) = study_area();
    let pipeline = Pipeline::default();

    let first = pipeline.run(&source, &tpl).unwrap();
    let second = pipeline.run(&source, &tpl).unwrap();

    let bits = |r: &Raster<f64>| r.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(first.score.raster()), bits(second.score.raster()));
    for (a, b) in first.indicators().iter().zip(second.indicators().iter()) {
        assert_eq!(bits(a.raster()), bits(b.raster()));
    }
}

#[test]
fn every_output_is_on_the_unit_scale() {
    let (tpl, source) = study_area();
    let weights = Weights::new(3.0, 1.0, 0.5, 2.0).unwrap();
    let config = RiskConfig {
        weights,
        ..Default::default()
    };
    let product = Pipeline::new(config).run(&source, &tpl).unwrap();

    let in_unit = |r: &Raster<f64>| r.data().iter().all(|&v| v.is_nan() || (0.0..=1.0).contains(&v));
    for indicator in product.indicators() {
        assert!(indicator.raster().ensure_on(&tpl).is_ok());
        assert!(in_unit(indicator.raster()));
    }
    assert!(in_unit(product.score.raster()));

    let stats = product.score.statistics();
    assert_eq!(stats.valid_count, tpl.len());
    assert!(product.derived.water_distance.data().iter().all(|&d| d >= 0.0));
    assert!(product.derived.built_up_distance.data().iter().all(|&d| d >= 0.0));
}

#[test]
fn land_cover_gate_is_binary() {
    let (tpl, source) = study_area();
    let product = Pipeline::default().run(&source, &tpl).unwrap();
    assert!(product
        .land_cover
        .raster()
        .data()
        .iter()
        .all(|&v| v == 0.0 || v == 1.0));
}

struct Offline;

impl LayerSource for Offline {
    fn land_cover(&self, _template: &GridTemplate) -> Result<Raster<u8>> {
        Err(Error::source_unavailable("land_cover", "catalog offline"))
    }

    fn watercourses(&self, _region: &Region) -> Result<FeatureSet> {
        Ok(FeatureSet::new())
    }

    fn soil_texture(&self, _template: &GridTemplate) -> Result<Raster<u8>> {
        Err(Error::source_unavailable("soil_texture", "catalog offline"))
    }

    fn elevation(&self, _template: &GridTemplate) -> Result<Raster<f64>> {
        Err(Error::source_unavailable("elevation", "catalog offline"))
    }
}

#[test]
fn source_failure_surfaces_unchanged() {
    let (tpl, _) = strip();
    match Pipeline::default().run(&Offline, &tpl) {
        Err(Error::SourceUnavailable { layer, reason }) => {
            assert_eq!(layer, "land_cover");
            assert_eq!(reason, "catalog offline");
        }
        other => panic!("expected SourceUnavailable, got {:?}", other.map(|_| ())),
    }
}
