//! Distance to the nearest true cell of a mask
//!
//! Exact Euclidean distance transform after Felzenszwalb & Huttenlocher
//! (2012): a 1-D lower-envelope sweep down every column followed by one along
//! every row, linear in the number of cells. The sweeps produce squared
//! distances in cell units, which are converted to ground distance with the
//! cell size.
//!
//! Reference:
//! Felzenszwalb, P.F. & Huttenlocher, D.P. (2012). Distance Transforms of
//! Sampled Functions. Theory of Computing, 8(19).

use ndarray::Array2;
use crate::maybe_rayon::*;
use brisk_core::raster::{CategoricalMask, Raster};
use brisk_core::{Algorithm, Error, Result};

use super::EmptySourcePolicy;

/// Parameters for the raster distance transform
#[derive(Debug, Clone, Default)]
pub struct RasterDistanceParams {
    /// Distances beyond this value are reported as this value
    pub max_distance: Option<f64>,
    /// Behavior when the mask has no true cells
    pub empty: EmptySourcePolicy,
}

/// Raster-mode distance transform
#[derive(Debug, Clone, Default)]
pub struct RasterDistance;

impl Algorithm for RasterDistance {
    type Input = CategoricalMask;
    type Output = Raster<f64>;
    type Params = RasterDistanceParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Raster Distance"
    }

    fn description(&self) -> &'static str {
        "Euclidean distance from every cell to the nearest true cell of a mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        distance_to_mask(&input, &params)
    }
}

/// Compute the distance from every cell to the nearest cell where `mask` is 1.
///
/// Mask cells holding 0 or no-data are not part of the source. Every output
/// cell is valid unless the mask is empty and the policy asks for no-data.
pub fn distance_to_mask(mask: &CategoricalMask, params: &RasterDistanceParams) -> Result<Raster<f64>> {
    if let Some(max) = params.max_distance {
        if !max.is_finite() || max < 0.0 {
            return Err(Error::invalid_parameter(
                "max_distance",
                max,
                "must be finite and non-negative",
            ));
        }
    }

    let (rows, cols) = mask.shape();
    let cell_size = mask.cell_size();

    if mask.count_true() == 0 {
        let fill = match params.empty {
            EmptySourcePolicy::Saturate => params
                .max_distance
                .unwrap_or_else(|| mask.bounds().diagonal()),
            EmptySourcePolicy::NoData => f64::NAN,
            EmptySourcePolicy::Fail => {
                return Err(Error::EmptySource {
                    source_name: "mask".into(),
                })
            }
        };
        return mask.with_data(Array2::from_elem((rows, cols), fill), Some(f64::NAN));
    }

    // Column sweep: squared vertical distance to the nearest source in each column
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..rows)
                .map(|row| {
                    if unsafe { mask.get_unchecked(row, col) } == 1 {
                        0.0
                    } else {
                        f64::INFINITY
                    }
                })
                .collect();
            let mut out = vec![0.0; rows];
            squared_edt_1d(&f, &mut out);
            out
        })
        .collect();

    // Row sweep over the column results
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let f: Vec<f64> = columns.iter().map(|column| column[row]).collect();
            let mut out = vec![0.0; cols];
            squared_edt_1d(&f, &mut out);

            for d in out.iter_mut() {
                let meters = d.sqrt() * cell_size;
                *d = match params.max_distance {
                    Some(max) => meters.min(max),
                    None => meters,
                };
            }
            out
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    mask.with_data(data, Some(f64::NAN))
}

/// One-dimensional squared distance transform of the sampled function `f`.
///
/// `f` holds 0 at sources and +inf elsewhere (or the squared distances of a
/// previous pass). Infinite samples never join the lower envelope; if all
/// samples are infinite the output is all infinite.
fn squared_edt_1d(f: &[f64], out: &mut [f64]) {
    let n = f.len();
    // v: parabola vertices, z: boundaries between consecutive parabolas
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    let mut any = false;

    for q in 0..n {
        if f[q].is_infinite() {
            continue;
        }
        if !any {
            v[0] = q;
            z[0] = f64::NEG_INFINITY;
            z[1] = f64::INFINITY;
            any = true;
            continue;
        }

        let fq = f[q] + (q * q) as f64;
        let mut s;
        loop {
            let p = v[k];
            s = (fq - (f[p] + (p * p) as f64)) / (2.0 * (q as f64 - p as f64));
            // z[0] is -inf, so this never steps below the first parabola
            if s <= z[k] {
                k -= 1;
            } else {
                break;
            }
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    if !any {
        out.fill(f64::INFINITY);
        return;
    }

    k = 0;
    for (q, slot) in out.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dq = q as f64 - p as f64;
        *slot = dq * dq + f[p];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use brisk_core::raster::MASK_NODATA;
    use brisk_core::GeoTransform;

    fn mask(rows: usize, cols: usize, ones: &[(usize, usize)], cell: f64) -> CategoricalMask {
        let mut m: CategoricalMask = Raster::filled(rows, cols, 0);
        m.set_transform(GeoTransform::new(0.0, rows as f64 * cell, cell, -cell));
        m.set_nodata(Some(MASK_NODATA));
        for &(r, c) in ones {
            m.set(r, c, 1).unwrap();
        }
        m
    }

    /// Brute-force reference in cell units
    fn brute_force(m: &CategoricalMask) -> Vec<f64> {
        let (rows, cols) = m.shape();
        let sources: Vec<(usize, usize)> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|&(r, c)| m.get(r, c).unwrap() == 1)
            .collect();
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .map(|(r, c)| {
                sources
                    .iter()
                    .map(|&(sr, sc)| {
                        let dr = r as f64 - sr as f64;
                        let dc = c as f64 - sc as f64;
                        (dr * dr + dc * dc).sqrt()
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    #[test]
    fn test_source_cells_are_zero() {
        let m = mask(5, 5, &[(2, 2)], 10.0);
        let d = distance_to_mask(&m, &RasterDistanceParams::default()).unwrap();
        assert_eq!(d.get(2, 2).unwrap(), 0.0);
        assert_relative_eq!(d.get(2, 3).unwrap(), 10.0);
        assert_relative_eq!(d.get(0, 0).unwrap(), 2.0 * 2f64.sqrt() * 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_matches_brute_force() {
        let m = mask(17, 23, &[(0, 0), (5, 17), (16, 3), (9, 9), (9, 10)], 1.0);
        let d = distance_to_mask(&m, &RasterDistanceParams::default()).unwrap();
        let expected = brute_force(&m);
        for (got, want) in d.data().iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_saturates_at_max_distance() {
        let m = mask(1, 100, &[(0, 0)], 10.0);
        let params = RasterDistanceParams {
            max_distance: Some(500.0),
            ..Default::default()
        };
        let d = distance_to_mask(&m, &params).unwrap();
        assert_relative_eq!(d.get(0, 10).unwrap(), 100.0);
        assert_eq!(d.get(0, 99).unwrap(), 500.0);
    }

    #[test]
    fn test_nodata_mask_cells_are_not_sources() {
        let mut m = mask(1, 5, &[(0, 0)], 1.0);
        m.set(0, 4, MASK_NODATA).unwrap();
        let d = distance_to_mask(&m, &RasterDistanceParams::default()).unwrap();
        assert_eq!(d.get(0, 4).unwrap(), 4.0);
    }

    #[test]
    fn test_empty_mask_policies() {
        let m = mask(3, 4, &[], 10.0);

        let saturate = distance_to_mask(&m, &RasterDistanceParams::default()).unwrap();
        assert_relative_eq!(saturate.get(1, 1).unwrap(), 50.0); // 30 x 40 m grid diagonal

        let capped = distance_to_mask(
            &m,
            &RasterDistanceParams {
                max_distance: Some(500.0),
                empty: EmptySourcePolicy::Saturate,
            },
        )
        .unwrap();
        assert_eq!(capped.get(0, 0).unwrap(), 500.0);

        let nodata = distance_to_mask(
            &m,
            &RasterDistanceParams {
                empty: EmptySourcePolicy::NoData,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(nodata.get(0, 0).unwrap().is_nan());

        let fail = distance_to_mask(
            &m,
            &RasterDistanceParams {
                empty: EmptySourcePolicy::Fail,
                ..Default::default()
            },
        );
        assert!(matches!(fail, Err(Error::EmptySource { .. })));
    }

    #[test]
    fn test_rejects_negative_max() {
        let m = mask(2, 2, &[(0, 0)], 1.0);
        let params = RasterDistanceParams {
            max_distance: Some(-1.0),
            ..Default::default()
        };
        assert!(distance_to_mask(&m, &params).is_err());
    }
}
