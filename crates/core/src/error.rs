//! Error types shared across the vegloss workspace.

use thiserror::Error;

/// Main error type for vegloss operations.
///
/// Only two variants abort a run: [`Error::InvalidParameter`] (rejected
/// before any remote query is issued) and [`Error::Upstream`] (the imagery
/// collaborator failed). "No matching scenes" and per-pixel numeric
/// indeterminacy are not errors; they flow through as nodata.
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

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch {
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Empty region geometry: {0}")]
    EmptyRegion(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a parameter-validation failure.
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

/// Result type alias for vegloss operations
pub type Result<T> = std::result::Result<T, Error>;
