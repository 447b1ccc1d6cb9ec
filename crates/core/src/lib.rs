//! # Vegloss Core
//!
//! Core types for the vegloss change-detection pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `GridSpec`: Analysis grid derived from a region and resolution
//! - `Region`: Polygon/multipolygon analysis area
//! - Shared error taxonomy

pub mod error;
pub mod grid;
pub mod raster;
pub mod region;

pub use error::{Error, Result};
pub use grid::GridSpec;
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::Region;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::GridSpec;
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::Region;
}
