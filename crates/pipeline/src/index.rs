//! Normalized difference vegetation index.

use rayon::prelude::*;
use vegloss_core::{Error, Raster, RasterElement, Result};

use crate::composite::Composite;

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1. Pixels where either input is nodata, or where
/// both bands are zero (zero-sum denominator), are nodata in the output —
/// never a NaN produced by the division itself leaking into later
/// arithmetic as a numeric value.
pub fn ndvi(composite: &Composite) -> Result<Raster<f64>> {
    normalized_difference(&composite.nir, &composite.red)
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    if band_a.shape() != band_b.shape() {
        return Err(Error::SizeMismatch {
            er: band_a.rows(),
            ec: band_a.cols(),
            ar: band_b.rows(),
            ac: band_b.cols(),
        });
    }

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if a.is_nodata(nodata_a) || b.is_nodata(nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    let mut output = band_a.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
