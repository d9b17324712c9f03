//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, GridTemplate, RasterElement};
use crate::region::Region;
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS). Grid operations never modify
/// their operands; every transform returns a new raster.
///
/// # Type Parameters
///
/// - `T`: The cell value type, must implement [`RasterElement`]
///
/// # Example
///
/// ```ignore
/// use brisk_core::{GridTemplate, Raster, Region};
///
/// let region = Region::new(380_000.0, 390_000.0, 390_000.0, 400_000.0)?;
/// let template = GridTemplate::from_region(&region, 10.0)?;
/// let zeros: Raster<f64> = Raster::from_template(&template, 0.0);
/// let value = zeros.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster on `template`, every cell set to `fill_value`
    pub fn from_template(template: &GridTemplate, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(template.shape(), fill_value),
            transform: *template.transform(),
            crs: template.crs().cloned(),
            nodata: None,
        }
    }

    /// Create a raster on `template` from row-major cell values
    pub fn from_template_vec(template: &GridTemplate, data: Vec<T>) -> Result<Self> {
        let mut raster = Self::from_vec(data, template.rows(), template.cols())?;
        raster.transform = *template.transform();
        raster.crs = template.crs().cloned();
        Ok(raster)
    }

    /// Wrap `data` with this raster's georeferencing.
    ///
    /// `data` must have the same shape as `self`.
    pub fn with_data<U: RasterElement>(&self, data: Array2<U>, nodata: Option<U>) -> Result<Raster<U>> {
        if data.dim() != self.shape() {
            let (ar, ac) = data.dim();
            return Err(Error::ShapeMismatch {
                expected: format!("{}x{} cells", self.rows(), self.cols()),
                actual: format!("{}x{} cells", ar, ac),
            });
        }
        Ok(Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata,
        })
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Sample the cell containing map coordinate `(x, y)`.
    ///
    /// Returns `None` outside the grid or on no-data cells.
    pub fn sample_geo(&self, x: f64, y: f64) -> Option<T> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let value = self.data.get((row.floor() as usize, col.floor() as usize)).copied()?;
        (!self.is_nodata(value)).then_some(value)
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds
    pub fn bounds(&self) -> Region {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// The lattice this raster lives on
    pub fn template(&self) -> GridTemplate {
        GridTemplate::unchecked(self.rows(), self.cols(), self.transform, self.crs.clone())
    }

    /// Fail with [`Error::ShapeMismatch`] unless `other` shares this raster's template.
    pub fn ensure_coregistered<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        self.template().ensure_coregistered(&other.template())
    }

    /// Fail with [`Error::ShapeMismatch`] unless this raster lives on `template`.
    pub fn ensure_on(&self, template: &GridTemplate) -> Result<()> {
        template.ensure_coregistered(&self.template())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to map coordinates (cell center)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert map coordinates to pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    // Clipping

    /// Extract the part of this raster that falls on `template`.
    ///
    /// The template must use the same cell size and its origin must sit on
    /// this raster's cell lattice; resampling is not performed. Template
    /// cells outside this raster become no-data.
    pub fn clip_to(&self, template: &GridTemplate) -> Result<Raster<T>> {
        let src = self.template();
        let mismatch = || Error::ShapeMismatch {
            expected: format!("grid aligned with {}", src),
            actual: template.to_string(),
        };

        let same_cells = GeoTransform {
            origin_x: template.transform().origin_x,
            origin_y: template.transform().origin_y,
            ..self.transform
        };
        if !same_cells.approx_eq(template.transform()) {
            return Err(mismatch());
        }
        if let (Some(a), Some(b)) = (self.crs(), template.crs()) {
            if !a.is_equivalent(b) {
                return Err(mismatch());
            }
        }

        let (col_f, row_f) = self.geo_to_pixel(
            template.transform().origin_x,
            template.transform().origin_y,
        );
        let (col_off, row_off) = (col_f.round(), row_f.round());
        if (col_f - col_off).abs() > 1e-6 || (row_f - row_off).abs() > 1e-6 {
            return Err(mismatch());
        }
        let (col_off, row_off) = (col_off as isize, row_off as isize);

        let nodata = self.nodata.unwrap_or_else(T::default_nodata);
        let (rows, cols) = self.shape();
        let data = Array2::from_shape_fn(template.shape(), |(r, c)| {
            let sr = r as isize + row_off;
            let sc = c as isize + col_off;
            if sr < 0 || sc < 0 || sr as usize >= rows || sc as usize >= cols {
                nodata
            } else {
                self.data[(sr as usize, sc as usize)]
            }
        });

        Ok(Raster {
            data,
            transform: *template.transform(),
            crs: template.crs().cloned().or_else(|| self.crs.clone()),
            nodata: Some(nodata),
        })
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
