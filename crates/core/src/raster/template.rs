//! Grid templates: the shared lattice every grid of a run lives on

use std::fmt;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use crate::region::Region;

/// Shape, georeferencing and CRS of a raster, without its cells.
///
/// All grids that take part in one expression must share a template. Grids
/// derived from the study area are built from one `GridTemplate` that is
/// passed explicitly to every operation that creates a grid from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTemplate {
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl GridTemplate {
    /// Create a template with the given dimensions and transform
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        if !transform.is_north_up() || transform.pixel_width <= 0.0 {
            return Err(Error::invalid_parameter(
                "transform",
                format!("{:?}", transform),
                "grid templates must be north-up with positive pixel width",
            ));
        }
        Ok(Self {
            rows,
            cols,
            transform,
            crs: None,
        })
    }

    /// Template of an existing raster; its shape and transform were
    /// validated when the raster was built or loaded.
    pub(crate) fn unchecked(
        rows: usize,
        cols: usize,
        transform: GeoTransform,
        crs: Option<CRS>,
    ) -> Self {
        Self {
            rows,
            cols,
            transform,
            crs,
        }
    }

    /// Cover `region` with square cells of `cell_size`, anchored at its
    /// upper-left corner. Partial cells on the right and bottom edges are kept.
    pub fn from_region(region: &Region, cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(Error::invalid_parameter(
                "cell_size",
                cell_size,
                "must be finite and positive",
            ));
        }
        let cols = cells_covering(region.width(), cell_size);
        let rows = cells_covering(region.height(), cell_size);
        let transform = GeoTransform::new(region.min_x, region.max_y, cell_size, -cell_size);
        Self::new(rows, cols, transform)
    }

    /// Attach a coordinate reference system
    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Templates always hold at least one cell
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Cell size in CRS units (square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic extent covered by the grid
    pub fn region(&self) -> Region {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Center of cell (row, col) in map coordinates
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Whether both templates describe the same lattice.
    ///
    /// A CRS is only compared when both sides declare one.
    pub fn is_coregistered(&self, other: &GridTemplate) -> bool {
        if self.shape() != other.shape() || !self.transform.approx_eq(&other.transform) {
            return false;
        }
        match (&self.crs, &other.crs) {
            (Some(a), Some(b)) => a.is_equivalent(b),
            _ => true,
        }
    }

    /// Fail with [`Error::ShapeMismatch`] unless `other` is co-registered.
    pub fn ensure_coregistered(&self, other: &GridTemplate) -> Result<()> {
        if self.is_coregistered(other) {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: self.to_string(),
                actual: other.to_string(),
            })
        }
    }
}

fn cells_covering(extent: f64, cell_size: f64) -> usize {
    // Guard against 1000.0000000001 / 10.0 becoming 101 cells
    let n = (extent / cell_size - 1e-9).ceil();
    (n.max(1.0)) as usize
}

impl fmt::Display for GridTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} grid at ({}, {}) with {}m cells",
            self.rows,
            self.cols,
            self.transform.origin_x,
            self.transform.origin_y,
            self.cell_size()
        )?;
        if let Some(crs) = &self.crs {
            write!(f, " [{}]", crs)?;
        }
        Ok(())
    }
}
