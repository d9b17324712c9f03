//! Vector features
//!
//! A [`FeatureSet`] holds the watercourse network (or any other reference
//! geometry) that vector distance transforms measure against. Features are
//! never rasterized for storage.

use geo_types::{Coord, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::region::Region;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Bounding rectangle of the geometry, `None` when it has no coordinates
    pub fn bounds(&self) -> Option<Region> {
        let mut bounds: Option<Region> = None;
        if let Some(geometry) = &self.geometry {
            visit_coords(geometry, &mut |c| {
                bounds = Some(match bounds {
                    Some(b) => b.expand_to(c.x, c.y),
                    None => Region::point(c.x, c.y),
                });
            });
        }
        bounds
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Iterate over the geometries of features that have one
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features.iter().filter_map(|f| f.geometry.as_ref())
    }

    /// Features whose bounding rectangle intersects `region`.
    ///
    /// Features without geometry are dropped.
    pub fn filter_region(&self, region: &Region) -> FeatureSet {
        let features = self
            .features
            .iter()
            .filter(|f| f.bounds().is_some_and(|b| b.intersects(region)))
            .cloned()
            .collect();
        FeatureSet { features }
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        FeatureSet {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureSet {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

fn visit_coords(geometry: &Geometry<f64>, f: &mut impl FnMut(Coord<f64>)) {
    match geometry {
        Geometry::Point(p) => f(p.0),
        Geometry::Line(l) => {
            f(l.start);
            f(l.end);
        }
        Geometry::LineString(ls) => ls.0.iter().copied().for_each(f),
        Geometry::Polygon(p) => {
            p.exterior().0.iter().copied().for_each(&mut *f);
            for ring in p.interiors() {
                ring.0.iter().copied().for_each(&mut *f);
            }
        }
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.0)),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                ls.0.iter().copied().for_each(&mut *f);
            }
        }
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                visit_coords(&Geometry::Polygon(p.clone()), f);
            }
        }
        Geometry::Rect(r) => {
            f(r.min());
            f(r.max());
        }
        Geometry::Triangle(t) => {
            f(t.v1());
            f(t.v2());
            f(t.v3());
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                visit_coords(g, f);
            }
        }
    }
}
