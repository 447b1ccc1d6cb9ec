//! Analysis grid derivation.
//!
//! Every raster in one pipeline run shares a single [`GridSpec`]: a
//! north-up geographic grid covering the region's bounding box at the
//! requested ground-sample distance.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use crate::region::Region;

/// Approximate meters per degree of latitude (WGS84 mean).
///
/// Good enough for choosing a grid step at the coarse resolutions this
/// pipeline runs at (hundreds of meters and up).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// The shared analysis grid for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl GridSpec {
    /// Derive the grid covering `region`'s bounding box at `resolution_m`
    /// meters per pixel.
    pub fn from_region(region: &Region, resolution_m: f64) -> Result<Self> {
        if !resolution_m.is_finite() || resolution_m <= 0.0 {
            return Err(Error::invalid_parameter(
                "resolution_m",
                resolution_m,
                "must be a positive ground-sample distance",
            ));
        }

        let (west, south, east, north) = region.bbox();
        let step = resolution_m / METERS_PER_DEGREE;

        let cols = (((east - west) / step).ceil() as usize).max(1);
        let rows = (((north - south) / step).ceil() as usize).max(1);

        Ok(Self {
            rows,
            cols,
            transform: GeoTransform::new(west, north, step, -step),
        })
    }

    /// Number of cells in the grid.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate a raster on this grid, filled with `value`.
    pub fn raster_filled<T: RasterElement>(&self, value: T) -> Raster<T> {
        let mut raster = Raster::filled(self.rows, self.cols, value);
        raster.set_transform(self.transform);
        raster
    }

    /// Allocate an all-nodata f64 raster on this grid.
    pub fn raster_nodata(&self) -> Raster<f64> {
        let mut raster = self.raster_filled(f64::NAN);
        raster.set_nodata(Some(f64::NAN));
        raster
    }
}
