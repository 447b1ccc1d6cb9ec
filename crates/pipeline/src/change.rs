//! Index delta and threshold classification.

use rayon::prelude::*;
use vegloss_core::{Error, Raster, RasterElement, Result};

/// Loss-mask value: vegetation loss detected.
pub const LOSS: u8 = 1;
/// Loss-mask value: no significant loss.
pub const NOT_LOSS: u8 = 0;
/// Loss-mask nodata value: delta undefined at this pixel, excluded from
/// both loss and non-loss counts.
pub const NO_DATA: u8 = 255;

/// Parameters for change classification.
#[derive(Debug, Clone, Copy)]
pub struct ChangeParams {
    /// Index-delta threshold below which a pixel is classified as loss.
    /// Negative: a drop exceeding its magnitude counts as loss.
    pub threshold: f64,
}

impl Default for ChangeParams {
    fn default() -> Self {
        Self { threshold: -0.15 }
    }
}

impl ChangeParams {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::invalid_parameter(
                "threshold",
                self.threshold,
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// Classify vegetation change between two index rasters.
///
/// `delta = recent - early` per pixel; a pixel is loss iff
/// `delta < threshold`, strictly — a delta exactly at the threshold is not
/// loss. Pixels where either input is nodata get a NaN delta and the
/// [`NO_DATA`] mask value.
///
/// Returns `(delta raster, loss mask)`.
pub fn classify(
    early: &Raster<f64>,
    recent: &Raster<f64>,
    params: &ChangeParams,
) -> Result<(Raster<f64>, Raster<u8>)> {
    params.validate()?;

    let (rows, cols) = early.shape();
    if recent.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: recent.rows(),
            ac: recent.cols(),
        });
    }

    let nodata_early = early.nodata();
    let nodata_recent = recent.nodata();
    let threshold = params.threshold;

    let (delta_data, mask_data): (Vec<f64>, Vec<u8>) = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut pairs = Vec::with_capacity(cols);
            for col in 0..cols {
                let e = unsafe { early.get_unchecked(row, col) };
                let r = unsafe { recent.get_unchecked(row, col) };

                if e.is_nodata(nodata_early) || r.is_nodata(nodata_recent) {
                    pairs.push((f64::NAN, NO_DATA));
                } else {
                    let d = r - e;
                    pairs.push((d, if d < threshold { LOSS } else { NOT_LOSS }));
                }
            }
            pairs
        })
        .unzip();

    let mut delta = early.with_same_meta::<f64>(rows, cols);
    delta.set_nodata(Some(f64::NAN));
    *delta.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), delta_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut mask = early.with_same_meta::<u8>(rows, cols);
    mask.set_nodata(Some(NO_DATA));
    *mask.data_mut() = ndarray::Array2::from_shape_vec((rows, cols), mask_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok((delta, mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn delta_is_recent_minus_early() {
        let early = make_band(3, 3, 0.7);
        let recent = make_band(3, 3, 0.4);

        let (delta, mask) = classify(&early, &recent, &ChangeParams::default()).unwrap();
        assert_relative_eq!(delta.get(1, 1).unwrap(), -0.3, epsilon = 1e-12);
        assert_eq!(mask.get(1, 1).unwrap(), LOSS);
    }

    #[test]
    fn threshold_boundary_is_strict() {
        let early = make_band(1, 1, 0.15);

        // delta exactly at the threshold: not loss
        let recent = make_band(1, 1, 0.0);
        let (delta, mask) = classify(&early, &recent, &ChangeParams::default()).unwrap();
        assert_relative_eq!(delta.get(0, 0).unwrap(), -0.15, epsilon = 1e-12);
        assert_eq!(mask.get(0, 0).unwrap(), NOT_LOSS);

        // just past the threshold: loss
        let recent = make_band(1, 1, -0.000001);
        let (_, mask) = classify(&early, &recent, &ChangeParams::default()).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), LOSS);
    }

    #[test]
    fn nodata_pixel_excluded_from_both_classes() {
        let mut early = make_band(2, 2, 0.8);
        early.set(0, 0, f64::NAN).unwrap();
        let recent = make_band(2, 2, 0.1);

        let (delta, mask) = classify(&early, &recent, &ChangeParams::default()).unwrap();
        assert!(delta.get(0, 0).unwrap().is_nan());
        assert_eq!(mask.get(0, 0).unwrap(), NO_DATA);
        assert_eq!(mask.get(1, 1).unwrap(), LOSS);
    }

    #[test]
    fn configurable_threshold() {
        let early = make_band(1, 1, 0.5);
        let recent = make_band(1, 1, 0.3);

        // -0.2 delta: loss at -0.15, not loss at -0.30
        let (_, mask) = classify(&early, &recent, &ChangeParams { threshold: -0.15 }).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), LOSS);
        let (_, mask) = classify(&early, &recent, &ChangeParams { threshold: -0.30 }).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), NOT_LOSS);
    }

    #[test]
    fn rejects_nonfinite_threshold() {
        let early = make_band(1, 1, 0.5);
        let recent = make_band(1, 1, 0.3);
        let params = ChangeParams {
            threshold: f64::NAN,
        };
        assert!(classify(&early, &recent, &params).is_err());
    }

    #[test]
    fn dimension_mismatch_is_error() {
        let early = make_band(2, 2, 0.5);
        let recent = make_band(2, 3, 0.5);
        assert!(classify(&early, &recent, &ChangeParams::default()).is_err());
    }
}
