//! Distance from cell centers to the nearest vector feature
//!
//! Features are first restricted to those within the search radius of the
//! study region and simplified with Douglas-Peucker at `max_error`, so that the
//! reported distance may differ from the exact one by at most that amount.
//! The remaining geometry is broken into segments and binned into a coarse
//! bucket grid; each cell then scans buckets in rings around its center until
//! no closer segment can exist.

use geo::{
    coord, Contains, Distance, Euclidean, Geometry, Intersects, Line, LineString, Point, Polygon, Rect,
    Simplify,
};
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use brisk_core::raster::{GridTemplate, Raster};
use brisk_core::{Algorithm, Error, FeatureSet, Region, Result};

use super::EmptySourcePolicy;

/// What cells farther than the search radius from every feature receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeyondRadius {
    /// The search radius itself
    #[default]
    Saturate,
    /// No-data
    NoData,
}

/// Parameters for the vector distance transform
#[derive(Debug, Clone)]
pub struct VectorDistanceParams {
    /// Features farther than this from the region are ignored (CRS units)
    pub search_radius: f64,
    /// Simplification tolerance; the error bound of reported distances
    pub max_error: f64,
    pub beyond_radius: BeyondRadius,
    pub empty: EmptySourcePolicy,
}

impl Default for VectorDistanceParams {
    fn default() -> Self {
        Self {
            search_radius: 10_000.0,
            max_error: 10.0,
            beyond_radius: BeyondRadius::Saturate,
            empty: EmptySourcePolicy::Saturate,
        }
    }
}

/// Vector-mode distance transform
#[derive(Debug, Clone, Default)]
pub struct VectorDistance;

impl Algorithm for VectorDistance {
    type Input = (FeatureSet, GridTemplate);
    type Output = Raster<f64>;
    type Params = VectorDistanceParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Vector Distance"
    }

    fn description(&self) -> &'static str {
        "Distance from every cell center to the nearest vector feature, bounded by a search radius"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (features, template) = input;
        distance_to_features(&features, &template, &params)
    }
}

/// Compute the distance from every cell center of `template` to the nearest
/// feature in `features`.
///
/// Cells inside a polygon feature, or on a line, are at distance 0.
pub fn distance_to_features(
    features: &FeatureSet,
    template: &GridTemplate,
    params: &VectorDistanceParams,
) -> Result<Raster<f64>> {
    if !params.search_radius.is_finite() || params.search_radius <= 0.0 {
        return Err(Error::invalid_parameter(
            "search_radius",
            params.search_radius,
            "must be finite and positive",
        ));
    }
    if !params.max_error.is_finite() || params.max_error < 0.0 {
        return Err(Error::invalid_parameter(
            "max_error",
            params.max_error,
            "must be finite and non-negative",
        ));
    }

    let (rows, cols) = template.shape();
    let radius = params.search_radius;
    let study = template.region();
    let window = study.grow(radius);

    let mut segments = Vec::new();
    let mut polygons = Vec::new();
    for geometry in features.filter_region(&window).geometries() {
        collect(geometry, params.max_error, &mut segments, &mut polygons);
    }

    // Corners of the grown window lie farther than the radius
    let study_rect = Rect::new(
        coord! { x: study.min_x, y: study.min_y },
        coord! { x: study.max_x, y: study.max_y },
    );
    segments.retain(|s| within_reach(s, &study_rect, radius));
    polygons.retain(|(_, polygon)| polygon.intersects(&study_rect));

    if segments.is_empty() && polygons.is_empty() {
        let fill = match params.empty {
            EmptySourcePolicy::Saturate => radius,
            EmptySourcePolicy::NoData => f64::NAN,
            EmptySourcePolicy::Fail => {
                return Err(Error::EmptySource {
                    source_name: "features".into(),
                })
            }
        };
        let mut grid = Raster::from_template(template, fill);
        grid.set_nodata(Some(f64::NAN));
        return Ok(grid);
    }

    let index = SegmentIndex::build(segments, &window, template.cell_size());

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0.0; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = template.cell_center(row, col);

                let inside = polygons.iter().any(|(bbox, polygon)| {
                    bbox.contains_point(x, y) && polygon.contains(&Point::new(x, y))
                });
                let d = if inside { 0.0 } else { index.nearest(x, y, radius) };

                *out = if d <= radius {
                    d
                } else {
                    match params.beyond_radius {
                        BeyondRadius::Saturate => radius,
                        BeyondRadius::NoData => f64::NAN,
                    }
                };
            }
            row_data
        })
        .collect();

    let mut grid = Raster::from_template_vec(template, data)?;
    grid.set_nodata(Some(f64::NAN));
    Ok(grid)
}

fn segment_bounds(segment: &Line<f64>) -> Region {
    let (a, b) = (segment.start, segment.end);
    Region {
        min_x: a.x.min(b.x),
        min_y: a.y.min(b.y),
        max_x: a.x.max(b.x),
        max_y: a.y.max(b.y),
    }
}

/// Whether any point of `segment` is within `radius` of `rect`.
fn within_reach(segment: &Line<f64>, rect: &Rect<f64>, radius: f64) -> bool {
    if segment.intersects(rect) {
        return true;
    }
    // Disjoint: the gap is closed at an endpoint or at a rectangle corner
    let (min, max) = (rect.min(), rect.max());
    let ends = [segment.start, segment.end].map(|c| {
        let dx = (min.x - c.x).max(c.x - max.x).max(0.0);
        let dy = (min.y - c.y).max(c.y - max.y).max(0.0);
        dx.hypot(dy)
    });
    let corners = [(min.x, min.y), (max.x, min.y), (max.x, max.y), (min.x, max.y)]
        .map(|(x, y)| Euclidean.distance(&Point::new(x, y), segment));
    ends.into_iter().chain(corners).any(|d| d <= radius)
}

/// Break a geometry into segments (points become zero-length segments) and
/// polygons used for the interior test.
fn collect(
    geometry: &Geometry<f64>,
    max_error: f64,
    segments: &mut Vec<Line<f64>>,
    polygons: &mut Vec<(Region, Polygon<f64>)>,
) {
    let simplify = |ls: &LineString<f64>| {
        if max_error > 0.0 {
            ls.simplify(&max_error)
        } else {
            ls.clone()
        }
    };

    match geometry {
        Geometry::Point(p) => segments.push(Line::new(p.0, p.0)),
        Geometry::MultiPoint(mp) => {
            segments.extend(mp.0.iter().map(|p| Line::new(p.0, p.0)));
        }
        Geometry::Line(l) => segments.push(*l),
        Geometry::LineString(ls) => push_line(&simplify(ls), segments),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                push_line(&simplify(ls), segments);
            }
        }
        Geometry::Polygon(p) => push_polygon(p, &simplify, segments, polygons),
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                push_polygon(p, &simplify, segments, polygons);
            }
        }
        Geometry::Rect(r) => push_polygon(&r.to_polygon(), &simplify, segments, polygons),
        Geometry::Triangle(t) => push_polygon(&t.to_polygon(), &simplify, segments, polygons),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect(g, max_error, segments, polygons);
            }
        }
    }
}

fn push_line(ls: &LineString<f64>, segments: &mut Vec<Line<f64>>) {
    match ls.0.as_slice() {
        [] => {}
        [only] => segments.push(Line::new(*only, *only)),
        _ => segments.extend(ls.lines()),
    }
}

fn push_polygon(
    polygon: &Polygon<f64>,
    simplify: &impl Fn(&LineString<f64>) -> LineString<f64>,
    segments: &mut Vec<Line<f64>>,
    polygons: &mut Vec<(Region, Polygon<f64>)>,
) {
    let exterior = polygon.exterior();
    let Some(first) = exterior.0.first() else {
        return;
    };
    let bbox = exterior
        .0
        .iter()
        .fold(Region { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y }, |b, c| {
            b.expand_to(c.x, c.y)
        });

    push_line(&simplify(exterior), segments);
    for ring in polygon.interiors() {
        push_line(&simplify(ring), segments);
    }
    // Interior test runs on the unsimplified polygon
    polygons.push((bbox, polygon.clone()));
}

/// Uniform bucket grid over segment bounding boxes
struct SegmentIndex {
    segments: Vec<Line<f64>>,
    buckets: Vec<Vec<usize>>,
    origin: (f64, f64),
    size: f64,
    nx: usize,
    ny: usize,
}

impl SegmentIndex {
    fn build(segments: Vec<Line<f64>>, window: &Region, cell_size: f64) -> Self {
        // Roughly one segment per bucket, but never finer than a grid cell
        let per_axis = (segments.len() as f64).sqrt().max(1.0);
        let size = (window.width().max(window.height()) / per_axis).max(cell_size);
        let nx = ((window.width() / size).ceil() as usize).max(1);
        let ny = ((window.height() / size).ceil() as usize).max(1);

        let mut index = Self {
            segments: Vec::new(),
            buckets: vec![Vec::new(); nx * ny],
            origin: (window.min_x, window.min_y),
            size,
            nx,
            ny,
        };

        for (i, segment) in segments.iter().enumerate() {
            let b = segment_bounds(segment);
            let (x0, y0) = index.bucket_of(b.min_x, b.min_y);
            let (x1, y1) = index.bucket_of(b.max_x, b.max_y);
            for by in y0..=y1 {
                for bx in x0..=x1 {
                    index.buckets[by * nx + bx].push(i);
                }
            }
        }
        index.segments = segments;
        index
    }

    /// Bucket holding a point, clamped onto the grid
    fn bucket_of(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp = |v: f64, n: usize| (v.floor().max(0.0) as usize).min(n - 1);
        (
            clamp((x - self.origin.0) / self.size, self.nx),
            clamp((y - self.origin.1) / self.size, self.ny),
        )
    }

    /// Distance to the nearest segment, or +inf if none is within `limit`.
    fn nearest(&self, x: f64, y: f64, limit: f64) -> f64 {
        let p = Point::new(x, y);
        let (cx, cy) = self.bucket_of(x, y);
        let mut best = f64::INFINITY;

        for ring in 0.. {
            // Any bucket on this ring is at least (ring - 1) buckets away
            let ring_min = (ring as f64 - 1.0).max(0.0) * self.size;
            if ring_min > best.min(limit) {
                break;
            }
            if ring > cx && ring > cy && cx + ring >= self.nx && cy + ring >= self.ny {
                break;
            }

            let x0 = cx as isize - ring as isize;
            let x1 = cx as isize + ring as isize;
            let y0 = cy as isize - ring as isize;
            let y1 = cy as isize + ring as isize;

            for by in y0..=y1 {
                if by < 0 || by as usize >= self.ny {
                    continue;
                }
                let on_edge_row = by == y0 || by == y1;
                let mut bx = x0;
                while bx <= x1 {
                    if bx >= 0 && (bx as usize) < self.nx {
                        for &i in &self.buckets[by as usize * self.nx + bx as usize] {
                            best = best.min(Euclidean.distance(&p, &self.segments[i]));
                        }
                    }
                    // Interior rows only contribute their two end buckets
                    bx += if on_edge_row || ring == 0 { 1 } else { x1 - x0 };
                }
            }
        }

        if best <= limit {
            best
        } else {
            f64::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brisk_core::{Feature, GeoTransform};
    use geo::{line_string, point, polygon, Coord};

    /// 10 x 10 cells of 10 m over (0, 0)-(100, 100)
    fn template() -> GridTemplate {
        GridTemplate::new(10, 10, GeoTransform::new(0.0, 100.0, 10.0, -10.0)).unwrap()
    }

    fn exact() -> VectorDistanceParams {
        VectorDistanceParams {
            search_radius: 1_000.0,
            max_error: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_cells_on_a_line_are_zero() {
        // Horizontal river through the centers of row 5 (y = 45)
        let rivers: FeatureSet =
            vec![Feature::new(line_string![(x: -50.0, y: 45.0), (x: 150.0, y: 45.0)])]
                .into_iter()
                .collect();
        let d = distance_to_features(&rivers, &template(), &exact()).unwrap();

        assert_eq!(d.get(5, 3).unwrap(), 0.0);
        assert_relative_eq!(d.get(4, 3).unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(d.get(0, 0).unwrap(), 50.0, epsilon = 1e-9);
        assert!(d.ensure_on(&template()).is_ok());
    }

    #[test]
    fn test_nearest_of_several_features() {
        let features: FeatureSet = vec![
            Feature::new(point!(x: 5.0, y: 95.0)),
            Feature::new(point!(x: 95.0, y: 5.0)),
        ]
        .into_iter()
        .collect();
        let d = distance_to_features(&features, &template(), &exact()).unwrap();

        assert_eq!(d.get(0, 0).unwrap(), 0.0);
        assert_eq!(d.get(9, 9).unwrap(), 0.0);
        assert_relative_eq!(d.get(0, 3).unwrap(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(d.get(8, 9).unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_matches_brute_force_with_many_segments() {
        let zigzag: Vec<(f64, f64)> = (0..40)
            .map(|i| (i as f64 * 3.0 - 10.0, if i % 2 == 0 { 20.0 } else { 60.0 }))
            .collect();
        let features: FeatureSet = vec![Feature::new(LineString::from(zigzag.clone()))]
            .into_iter()
            .collect();
        let d = distance_to_features(&features, &template(), &exact()).unwrap();

        let segments: Vec<Line<f64>> = zigzag
            .windows(2)
            .map(|w| Line::new(Coord { x: w[0].0, y: w[0].1 }, Coord { x: w[1].0, y: w[1].1 }))
            .collect();
        let tpl = template();
        for row in 0..10 {
            for col in 0..10 {
                let (x, y) = tpl.cell_center(row, col);
                let expected = segments
                    .iter()
                    .map(|s| Euclidean.distance(&Point::new(x, y), s))
                    .fold(f64::INFINITY, f64::min);
                assert_relative_eq!(d.get(row, col).unwrap(), expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_polygon_interior_is_zero() {
        let lake = polygon![
            (x: 20.0, y: 20.0),
            (x: 80.0, y: 20.0),
            (x: 80.0, y: 80.0),
            (x: 20.0, y: 80.0),
            (x: 20.0, y: 20.0),
        ];
        let features: FeatureSet = vec![Feature::new(lake)].into_iter().collect();
        let d = distance_to_features(&features, &template(), &exact()).unwrap();

        assert_eq!(d.get(5, 5).unwrap(), 0.0);
        assert_relative_eq!(d.get(5, 0).unwrap(), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_beyond_radius() {
        let far: FeatureSet = vec![Feature::new(point!(x: 0.0, y: 300.0))].into_iter().collect();
        let saturate = VectorDistanceParams {
            search_radius: 250.0,
            ..exact()
        };
        let d = distance_to_features(&far, &template(), &saturate).unwrap();
        assert_relative_eq!(d.get(0, 0).unwrap(), (5f64.powi(2) + 205f64.powi(2)).sqrt(), epsilon = 1e-9);
        assert_eq!(d.get(9, 9).unwrap(), 250.0);

        let nodata = VectorDistanceParams {
            beyond_radius: BeyondRadius::NoData,
            ..saturate
        };
        let d = distance_to_features(&far, &template(), &nodata).unwrap();
        assert!(d.get(9, 9).unwrap().is_nan());
        assert!(d.is_nodata_at(9, 9).unwrap());
    }

    #[test]
    fn test_features_outside_search_window_are_ignored() {
        let far: FeatureSet = vec![Feature::new(point!(x: 5_000.0, y: 5_000.0))]
            .into_iter()
            .collect();
        let d = distance_to_features(&far, &template(), &exact()).unwrap();
        assert!(d.data().iter().all(|&v| v == 1_000.0));

        let fail = VectorDistanceParams {
            empty: EmptySourcePolicy::Fail,
            ..exact()
        };
        assert!(matches!(
            distance_to_features(&far, &template(), &fail),
            Err(Error::EmptySource { .. })
        ));
    }

    #[test]
    fn test_window_corner_beyond_radius_counts_as_empty() {
        // Inside the grown window, but about 56.6 m from the study area's corner
        let corner: FeatureSet = vec![Feature::new(point!(x: 140.0, y: 140.0))]
            .into_iter()
            .collect();
        let near = VectorDistanceParams {
            search_radius: 50.0,
            ..exact()
        };
        let d = distance_to_features(&corner, &template(), &near).unwrap();
        assert!(d.data().iter().all(|&v| v == 50.0));

        let fail = VectorDistanceParams {
            empty: EmptySourcePolicy::Fail,
            ..near.clone()
        };
        assert!(matches!(
            distance_to_features(&corner, &template(), &fail),
            Err(Error::EmptySource { .. })
        ));

        // 45 m from the corner is in reach
        let reachable: FeatureSet = vec![Feature::new(point!(x: 100.0, y: 145.0))]
            .into_iter()
            .collect();
        let d = distance_to_features(&reachable, &template(), &fail).unwrap();
        assert_relative_eq!(d.get(0, 9).unwrap(), (5f64.powi(2) + 50f64.powi(2)).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_enclosing_polygon_with_distant_boundary() {
        let basin = polygon![
            (x: -1_000.0, y: -1_000.0),
            (x: 1_000.0, y: -1_000.0),
            (x: 1_000.0, y: 1_000.0),
            (x: -1_000.0, y: 1_000.0),
            (x: -1_000.0, y: -1_000.0),
        ];
        let features: FeatureSet = vec![Feature::new(basin)].into_iter().collect();
        let params = VectorDistanceParams {
            search_radius: 50.0,
            empty: EmptySourcePolicy::Fail,
            ..exact()
        };
        let d = distance_to_features(&features, &template(), &params).unwrap();
        assert!(d.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_feature_set_policies() {
        let none = FeatureSet::new();
        let d = distance_to_features(&none, &template(), &exact()).unwrap();
        assert_eq!(d.get(3, 3).unwrap(), 1_000.0);

        let nodata = VectorDistanceParams {
            empty: EmptySourcePolicy::NoData,
            ..exact()
        };
        let d = distance_to_features(&none, &template(), &nodata).unwrap();
        assert!(d.get(3, 3).unwrap().is_nan());
    }

    #[test]
    fn test_simplification_error_is_bounded() {
        // A wiggly line: simplified distances stay within max_error of exact ones
        let wiggle: Vec<(f64, f64)> = (0..=100)
            .map(|i| (i as f64, 50.0 + (i as f64 * 0.7).sin() * 2.0))
            .collect();
        let rivers: FeatureSet = vec![Feature::new(LineString::from(wiggle))].into_iter().collect();

        let exact_d = distance_to_features(&rivers, &template(), &exact()).unwrap();
        let coarse = VectorDistanceParams {
            max_error: 5.0,
            ..exact()
        };
        let coarse_d = distance_to_features(&rivers, &template(), &coarse).unwrap();

        for (a, b) in exact_d.data().iter().zip(coarse_d.data().iter()) {
            assert!((a - b).abs() <= 5.0 + 1e-9);
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let none = FeatureSet::new();
        let zero_radius = VectorDistanceParams {
            search_radius: 0.0,
            ..Default::default()
        };
        let negative_error = VectorDistanceParams {
            max_error: -1.0,
            ..Default::default()
        };
        assert!(distance_to_features(&none, &template(), &zero_radius).is_err());
        assert!(distance_to_features(&none, &template(), &negative_error).is_err());
    }
}
