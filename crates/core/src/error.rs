//! Error types for Brisk

use thiserror::Error;

/// Main error type for Brisk operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Operands of a grid operation are not co-registered.
    #[error("Grid shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Normalization domain is zero-width, inverted or not finite.
    #[error("Invalid normalization domain: [{min}, {max}]")]
    InvalidDomain { min: f64, max: f64 },

    /// A distance source has no qualifying cells or features in the region.
    #[error("Distance source '{source_name}' is empty within the region")]
    EmptySource { source_name: String },

    /// An upstream collaborator could not supply a layer.
    #[error("Source layer '{layer}' unavailable: {reason}")]
    SourceUnavailable { layer: String, reason: String },

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a source layer failure.
    pub fn source_unavailable(layer: impl Into<String>, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            layer: layer.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for an invalid parameter.
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Brisk operations
pub type Result<T> = std::result::Result<T, Error>;
