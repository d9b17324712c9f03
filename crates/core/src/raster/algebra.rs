//! Cell-wise raster algebra
//!
//! Every operation returns a new raster on the same template as its inputs.
//! Binary operations require co-registered operands and fail with
//! [`Error::ShapeMismatch`] otherwise. No-data in any operand yields no-data
//! in the output.

use ndarray::Zip;

use crate::error::{Error, Result};
use crate::raster::{Raster, RasterElement, MASK_NODATA};

/// A 0/1 raster, typically the result of a comparison against a class code.
///
/// Cells hold `1` (selected), `0` (not selected) or [`MASK_NODATA`].
pub type CategoricalMask = Raster<u8>;

impl<T: RasterElement> Raster<T> {
    /// Apply `f` to every valid cell.
    ///
    /// No-data cells map to `U`'s default no-data, which becomes the output's
    /// declared no-data value. A computed value equal to that default (NaN for
    /// floats, [`MASK_NODATA`] for `u8`) therefore also reads as no-data.
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U,
    {
        let out_nodata = U::default_nodata();
        let data = self.data().map(|&v| if self.is_nodata(v) { out_nodata } else { f(v) });
        Raster::from_array(data).georeferenced_like(self, Some(out_nodata))
    }

    /// Combine two co-registered rasters cell by cell.
    pub fn zip_with<U, V, F>(&self, other: &Raster<U>, f: F) -> Result<Raster<V>>
    where
        U: RasterElement,
        V: RasterElement,
        F: Fn(T, U) -> V,
    {
        self.ensure_coregistered(other)?;

        let out_nodata = V::default_nodata();
        let data = Zip::from(self.data())
            .and(other.data())
            .map_collect(|&a, &b| {
                if self.is_nodata(a) || other.is_nodata(b) {
                    out_nodata
                } else {
                    f(a, b)
                }
            });
        Ok(Raster::from_array(data).georeferenced_like(self, Some(out_nodata)))
    }

    /// Convert cells to another element type.
    ///
    /// Values that `U` cannot represent become no-data, and so do values
    /// equal to `U`'s default no-data: casting 255.0 to `u8` yields
    /// [`MASK_NODATA`]. Class codes must stay below that value.
    pub fn cast<U: RasterElement>(&self) -> Raster<U> {
        let out_nodata = U::default_nodata();
        self.map(|v| v.to_f64().and_then(U::from_f64).unwrap_or(out_nodata))
    }

    /// Truncate every valid cell into `[min, max]`.
    pub fn clamp(&self, min: T, max: T) -> Result<Raster<T>> {
        if !(min <= max) {
            return Err(Error::invalid_parameter(
                "clamp",
                format!("[{:?}, {:?}]", min, max),
                "min must not exceed max",
            ));
        }
        Ok(self.map(|v| {
            if v < min {
                min
            } else if v > max {
                max
            } else {
                v
            }
        }))
    }

    /// Keep cells where `mask` is 1; every other cell becomes no-data.
    pub fn mask(&self, mask: &CategoricalMask) -> Result<Raster<T>> {
        self.ensure_coregistered(mask)?;

        let nodata = self.nodata().unwrap_or_else(T::default_nodata);
        let data = Zip::from(self.data())
            .and(mask.data())
            .map_collect(|&v, &m| if m == 1 { v } else { nodata });
        Ok(Raster::from_array(data).georeferenced_like(self, Some(nodata)))
    }

    /// Cell-wise equality with another grid
    pub fn eq(&self, other: &Raster<T>) -> Result<CategoricalMask> {
        self.zip_with(other, |a, b| (a == b) as u8).map(as_mask)
    }

    /// Cell-wise `self < other`
    pub fn lt(&self, other: &Raster<T>) -> Result<CategoricalMask> {
        self.zip_with(other, |a, b| (a < b) as u8).map(as_mask)
    }

    /// Cell-wise `self > other`
    pub fn gt(&self, other: &Raster<T>) -> Result<CategoricalMask> {
        self.zip_with(other, |a, b| (a > b) as u8).map(as_mask)
    }

    /// Mask of cells equal to `value`, e.g. a land-cover class code
    pub fn eq_value(&self, value: T) -> CategoricalMask {
        as_mask(self.map(|v| (v == value) as u8))
    }

    /// Mask of cells strictly below `value`
    pub fn lt_value(&self, value: T) -> CategoricalMask {
        as_mask(self.map(|v| (v < value) as u8))
    }

    /// Mask of cells strictly above `value`
    pub fn gt_value(&self, value: T) -> CategoricalMask {
        as_mask(self.map(|v| (v > value) as u8))
    }

    /// Copy this raster's georeferencing onto a freshly computed grid.
    fn georeferenced_like<S: RasterElement>(mut self, source: &Raster<S>, nodata: Option<T>) -> Self {
        self.set_transform(*source.transform());
        self.set_crs(source.crs().cloned());
        self.set_nodata(nodata);
        self
    }
}

fn as_mask(mut raster: Raster<u8>) -> CategoricalMask {
    raster.set_nodata(Some(MASK_NODATA));
    raster
}

impl Raster<f64> {
    /// Cell-wise sum
    pub fn add(&self, other: &Raster<f64>) -> Result<Raster<f64>> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Cell-wise difference
    pub fn subtract(&self, other: &Raster<f64>) -> Result<Raster<f64>> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Cell-wise product
    pub fn multiply(&self, other: &Raster<f64>) -> Result<Raster<f64>> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Cell-wise quotient; division by zero yields no-data
    pub fn divide(&self, other: &Raster<f64>) -> Result<Raster<f64>> {
        self.zip_with(other, |a, b| if b.abs() < 1e-10 { f64::NAN } else { a / b })
    }

    /// Multiply every valid cell by a constant
    pub fn scale(&self, factor: f64) -> Raster<f64> {
        self.map(|v| v * factor)
    }
}

impl CategoricalMask {
    /// Cell-wise logical AND of two masks
    pub fn and(&self, other: &CategoricalMask) -> Result<CategoricalMask> {
        self.zip_with(other, |a, b| (a == 1 && b == 1) as u8).map(as_mask)
    }

    /// Cell-wise logical OR of two masks
    pub fn or(&self, other: &CategoricalMask) -> Result<CategoricalMask> {
        self.zip_with(other, |a, b| (a == 1 || b == 1) as u8).map(as_mask)
    }

    /// Number of selected cells
    pub fn count_true(&self) -> usize {
        self.data().iter().filter(|&&v| v == 1).count()
    }
}
