//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981) method,
//! which uses a 3x3 neighborhood to compute partial derivatives.

use ndarray::Array2;
use crate::maybe_rayon::*;
use brisk_core::raster::Raster;
use brisk_core::{Algorithm, Error, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent (0-infinity, typically 0-100+)
    Percent,
    /// Radians (0-π/2)
    Radians,
}

/// How the 3x3 window is completed at the grid border and around no-data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    /// Missing neighbors take the nearest valid value: cells beyond the
    /// border repeat the border cell, no-data neighbors repeat the center.
    /// Every valid DEM cell gets a slope; a single-cell DEM is flat.
    #[default]
    Replicate,
    /// Cells without a complete window are no-data.
    NoData,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    /// Output units
    pub units: SlopeUnits,
    /// Z-factor for unit conversion (default 1.0)
    pub z_factor: f64,
    /// Border and no-data handling
    pub edges: EdgeMode,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
            edges: EdgeMode::Replicate,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Calculate slope (rate of change of elevation) from a DEM using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope from a DEM
///
/// Uses Horn's (1981) method with a 3x3 neighborhood:
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
/// slope = atan(sqrt(dz/dx² + dz/dy²))
///
/// # Arguments
/// * `dem` - Input DEM raster
/// * `params` - Slope calculation parameters
///
/// # Returns
/// Raster with slope values in the specified units, on the DEM's template
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    if !params.z_factor.is_finite() || params.z_factor <= 0.0 {
        return Err(Error::invalid_parameter(
            "z_factor",
            params.z_factor,
            "must be finite and positive",
        ));
    }

    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size() * params.z_factor;
    let eight_cell_size = 8.0 * cell_size;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let e = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(e) {
                    continue;
                }

                let Some([a, b, c, d, f, g, h, i]) = window(dem, row, col, e, params.edges)
                else {
                    continue;
                };

                // Horn's method
                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell_size;

                let slope_rad = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();

                *out = match params.units {
                    SlopeUnits::Degrees => slope_rad.to_degrees(),
                    SlopeUnits::Percent => slope_rad.tan() * 100.0,
                    SlopeUnits::Radians => slope_rad,
                };
            }

            row_data
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    dem.with_data(data, Some(f64::NAN))
}

/// The eight neighbors of (row, col) in a, b, c, d, f, g, h, i order
fn window(dem: &Raster<f64>, row: usize, col: usize, center: f64, edges: EdgeMode) -> Option<[f64; 8]> {
    const OFFSETS: [(isize, isize); 8] = [
        (-1, -1), (-1, 0), (-1, 1),
        (0, -1),           (0, 1),
        (1, -1),  (1, 0),  (1, 1),
    ];

    let (rows, cols) = dem.shape();
    let mut values = [0.0; 8];

    for (slot, &(dr, dc)) in values.iter_mut().zip(OFFSETS.iter()) {
        let r = row as isize + dr;
        let c = col as isize + dc;
        let inside = r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols;

        let value = match (inside, edges) {
            (true, _) => unsafe { dem.get_unchecked(r as usize, c as usize) },
            (false, EdgeMode::NoData) => return None,
            (false, EdgeMode::Replicate) => {
                let r = r.clamp(0, rows as isize - 1) as usize;
                let c = c.clamp(0, cols as isize - 1) as usize;
                unsafe { dem.get_unchecked(r, c) }
            }
        };

        *slot = if !dem.is_nodata(value) {
            value
        } else if edges == EdgeMode::Replicate {
            center
        } else {
            return None;
        };
    }

    Some(values)
}
