//! Affected-area statistics.

use serde::{Deserialize, Serialize};
use vegloss_core::{Error, Raster, Result};

use crate::change::{LOSS, NO_DATA};
use crate::scene::Epoch;

/// Scalar summary of one change assessment.
///
/// A run over zero valid pixels is a complete, healthy record:
/// `valid_pixels = 0` and `loss_fraction_percent = 0.0`, distinguishable
/// from a run with low-but-nonzero coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossStatistics {
    /// Pixels classified as loss within the valid area.
    pub loss_pixels: usize,
    /// Pixels with any valid data.
    pub valid_pixels: usize,
    /// 100 * loss / valid; 0 when no pixel is valid.
    pub loss_fraction_percent: f64,
    /// Early epoch year pair.
    pub epoch_early: (u16, u16),
    /// Recent epoch year pair.
    pub epoch_recent: (u16, u16),
    /// Ground-sample distance of the analysis grid, meters.
    pub resolution_m: f64,
    /// Loss threshold the mask was classified with.
    pub threshold: f64,
}

/// Derive the validity mask from the rendered true-color channels of a
/// composite: a pixel is valid iff any channel is nonzero.
pub fn validity_mask(channels: &[Raster<u8>; 3]) -> Result<Raster<u8>> {
    let (rows, cols) = channels[0].shape();
    for c in &channels[1..] {
        if c.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: c.rows(),
                ac: c.cols(),
            });
        }
    }

    let mut mask = channels[0].with_same_meta::<u8>(rows, cols);
    for row in 0..rows {
        for col in 0..cols {
            let any_nonzero = channels.iter().any(|c| unsafe { c.get_unchecked(row, col) } != 0);
            if any_nonzero {
                mask.set(row, col, 1)?;
            }
        }
    }
    Ok(mask)
}

/// Aggregate loss statistics from the loss and validity masks.
///
/// - `loss_pixels`: loss AND valid
/// - `valid_pixels`: valid, excluding pixels whose classification is
///   undefined ([`NO_DATA`] in the loss mask) — those count toward neither
///   class, so a run with an entirely missing epoch reports zero coverage
/// - `loss_fraction_percent`: `100 * loss / valid`, 0 when `valid == 0`
pub fn aggregate(
    loss_mask: &Raster<u8>,
    validity: &Raster<u8>,
    epoch_early: &Epoch,
    epoch_recent: &Epoch,
    resolution_m: f64,
    threshold: f64,
) -> Result<LossStatistics> {
    let (rows, cols) = loss_mask.shape();
    if validity.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: validity.rows(),
            ac: validity.cols(),
        });
    }

    let mut loss_pixels = 0usize;
    let mut valid_pixels = 0usize;

    for (l, v) in loss_mask.data().iter().zip(validity.data().iter()) {
        if *v == 0 || *l == NO_DATA {
            continue;
        }
        valid_pixels += 1;
        if *l == LOSS {
            loss_pixels += 1;
        }
    }

    let loss_fraction_percent = if valid_pixels == 0 {
        0.0
    } else {
        100.0 * loss_pixels as f64 / valid_pixels as f64
    };

    Ok(LossStatistics {
        loss_pixels,
        valid_pixels,
        loss_fraction_percent,
        epoch_early: epoch_early.as_pair(),
        epoch_recent: epoch_recent.as_pair(),
        resolution_m,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{NOT_LOSS, NO_DATA};
    use approx::assert_relative_eq;

    fn epochs() -> (Epoch, Epoch) {
        (
            Epoch::new(2015, 2016).unwrap(),
            Epoch::new(2022, 2023).unwrap(),
        )
    }

    #[test]
    fn twenty_of_one_hundred_is_twenty_percent() {
        // 10x10 grid, all valid, 20 loss pixels
        let mut loss = Raster::filled(10, 10, NOT_LOSS);
        for i in 0..20 {
            loss.set(i / 10, i % 10, LOSS).unwrap();
        }
        let validity = Raster::filled(10, 10, 1u8);

        let (e, r) = epochs();
        let stats = aggregate(&loss, &validity, &e, &r, 1000.0, -0.15).unwrap();
        assert_eq!(stats.valid_pixels, 100);
        assert_eq!(stats.loss_pixels, 20);
        assert_relative_eq!(stats.loss_fraction_percent, 20.0);
    }

    #[test]
    fn zero_valid_pixels_is_zero_percent() {
        let loss = Raster::filled(5, 5, LOSS);
        let validity = Raster::filled(5, 5, 0u8);

        let (e, r) = epochs();
        let stats = aggregate(&loss, &validity, &e, &r, 1000.0, -0.15).unwrap();
        assert_eq!(stats.valid_pixels, 0);
        assert_relative_eq!(stats.loss_fraction_percent, 0.0);
    }

    #[test]
    fn loss_outside_validity_not_counted() {
        let mut loss = Raster::filled(2, 2, LOSS);
        loss.set(1, 1, NOT_LOSS).unwrap();
        let mut validity = Raster::filled(2, 2, 0u8);
        validity.set(0, 0, 1).unwrap();
        validity.set(1, 1, 1).unwrap();

        let (e, r) = epochs();
        let stats = aggregate(&loss, &validity, &e, &r, 1000.0, -0.15).unwrap();
        assert_eq!(stats.valid_pixels, 2);
        assert_eq!(stats.loss_pixels, 1);
        assert_relative_eq!(stats.loss_fraction_percent, 50.0);
    }

    #[test]
    fn undefined_classification_excluded_from_both_counts() {
        let mut loss = Raster::filled(2, 2, NO_DATA);
        loss.set(0, 0, LOSS).unwrap();
        let validity = Raster::filled(2, 2, 1u8);

        let (e, r) = epochs();
        let stats = aggregate(&loss, &validity, &e, &r, 1000.0, -0.15).unwrap();
        assert_eq!(stats.loss_pixels, 1);
        assert_eq!(stats.valid_pixels, 1);
        assert_relative_eq!(stats.loss_fraction_percent, 100.0);
    }

    #[test]
    fn fraction_always_in_range() {
        let loss = Raster::filled(4, 4, LOSS);
        let validity = Raster::filled(4, 4, 1u8);
        let (e, r) = epochs();
        let stats = aggregate(&loss, &validity, &e, &r, 1000.0, -0.15).unwrap();
        assert!(stats.loss_fraction_percent >= 0.0 && stats.loss_fraction_percent <= 100.0);
        assert_relative_eq!(stats.loss_fraction_percent, 100.0);
    }

    #[test]
    fn validity_from_channels() {
        let mut r = Raster::filled(2, 2, 0u8);
        let g = Raster::filled(2, 2, 0u8);
        let b = Raster::filled(2, 2, 0u8);
        r.set(0, 1, 120).unwrap();

        let mask = validity_mask(&[r, g, b]).unwrap();
        assert_eq!(mask.get(0, 1).unwrap(), 1);
        assert_eq!(mask.get(0, 0).unwrap(), 0);
        assert_eq!(mask.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn statistics_record_serializes() {
        let (e, r) = epochs();
        let loss = Raster::filled(1, 1, LOSS);
        let validity = Raster::filled(1, 1, 1u8);
        let stats = aggregate(&loss, &validity, &e, &r, 1000.0, -0.15).unwrap();

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["valid_pixels"], 1);
        assert_eq!(json["epoch_early"][0], 2015);
        assert_eq!(json["threshold"], -0.15);
    }
}
