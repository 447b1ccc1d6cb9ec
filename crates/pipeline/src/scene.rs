//! Scene model and the imagery-source seam.
//!
//! A [`Scene`] is one raw multispectral acquisition already sampled onto the
//! analysis grid: digital-number optical bands plus a per-pixel quality-flag
//! band. Where the scenes come from is behind the [`SceneSource`] trait, so
//! the pipeline can run against a remote catalog or a deterministic
//! in-memory source in tests.

use vegloss_core::{Error, Raster, Region, Result};

/// Multiplicative gain for DN -> surface reflectance (Landsat Collection 2
/// Level-2 calibration).
pub const REFLECTANCE_GAIN: f64 = 2.75e-5;

/// Additive offset for DN -> surface reflectance.
pub const REFLECTANCE_OFFSET: f64 = -0.2;

/// Quality-flag bit marking a fill (no observation) pixel.
pub const QA_FILL_BIT: u16 = 1 << 0;

/// Quality-flag bit marking a cloud-contaminated pixel.
pub const QA_CLOUD_BIT: u16 = 1 << 3;

/// Cloud predicate over a quality-flag value.
///
/// A pixel with this bit set contributes no value to temporal reduction.
pub fn is_cloud(qa: u16) -> bool {
    qa & QA_CLOUD_BIT != 0
}

/// Fill predicate over a quality-flag value.
pub fn is_fill(qa: u16) -> bool {
    qa & QA_FILL_BIT != 0
}

/// Rescale a raw digital number to physical reflectance.
pub fn dn_to_reflectance(dn: u16) -> f64 {
    dn as f64 * REFLECTANCE_GAIN + REFLECTANCE_OFFSET
}

// ---------------------------------------------------------------------------
// Epoch
// ---------------------------------------------------------------------------

/// One temporal window of interest, spanning whole calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Epoch {
    pub start_year: u16,
    pub end_year: u16,
}

impl Epoch {
    /// Create a validated epoch. `end_year` must not precede `start_year`.
    pub fn new(start_year: u16, end_year: u16) -> Result<Self> {
        if start_year == 0 || end_year == 0 {
            return Err(Error::invalid_parameter(
                "epoch",
                format!("{start_year}-{end_year}"),
                "years must be positive",
            ));
        }
        if end_year < start_year {
            return Err(Error::invalid_parameter(
                "epoch",
                format!("{start_year}-{end_year}"),
                "end year precedes start year",
            ));
        }
        Ok(Self {
            start_year,
            end_year,
        })
    }

    /// Date-range string bounding this epoch, `"{start}-01-01/{end}-12-31"`.
    pub fn datetime_range(&self) -> String {
        format!("{}-01-01/{}-12-31", self.start_year, self.end_year)
    }

    /// Whether two epochs share any calendar year.
    ///
    /// Overlap is permitted by design; callers may warn but must not fail.
    pub fn overlaps(&self, other: &Epoch) -> bool {
        self.start_year <= other.end_year && other.start_year <= self.end_year
    }

    /// Year pair for the statistics record.
    pub fn as_pair(&self) -> (u16, u16) {
        (self.start_year, self.end_year)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year)
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Digital-number optical bands of one scene, all on the analysis grid.
#[derive(Debug, Clone)]
pub struct SceneBands {
    pub blue: Raster<u16>,
    pub green: Raster<u16>,
    pub red: Raster<u16>,
    pub nir: Raster<u16>,
}

/// One raw acquisition: DN bands plus the quality-flag band.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Source identifier of the acquisition.
    pub id: String,
    /// ISO 8601 acquisition datetime.
    pub datetime: String,
    /// Scene-level reported cloud cover, percent.
    pub cloud_cover: f64,
    /// Raw digital-number bands.
    pub bands: SceneBands,
    /// Per-pixel quality flags.
    pub qa: Raster<u16>,
}

impl Scene {
    /// Grid shape shared by all bands of this scene.
    pub fn shape(&self) -> (usize, usize) {
        self.bands.red.shape()
    }

    /// Check that every band shares one grid shape.
    pub fn check_consistent(&self) -> Result<()> {
        let shape = self.bands.red.shape();
        for (name, raster) in [
            ("blue", &self.bands.blue),
            ("green", &self.bands.green),
            ("nir", &self.bands.nir),
        ] {
            if raster.shape() != shape {
                return Err(Error::Upstream(format!(
                    "scene '{}': band '{}' shape {:?} does not match red band {:?}",
                    self.id,
                    name,
                    raster.shape(),
                    shape
                )));
            }
        }
        if self.qa.shape() != shape {
            return Err(Error::Upstream(format!(
                "scene '{}': qa shape {:?} does not match bands {:?}",
                self.id,
                self.qa.shape(),
                shape
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

/// A source of raw scenes for a region and epoch.
///
/// Implementations filter by region intersection, epoch date bounds and the
/// scene-level cloud-cover ceiling. Returning an empty vector means "no
/// matching scenes" and is not an error; transport or decode failures map to
/// [`Error::Upstream`].
pub trait SceneSource {
    fn query(&self, region: &Region, epoch: &Epoch, cloud_cover_max: f64) -> Result<Vec<Scene>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn epoch_validation() {
        assert!(Epoch::new(2015, 2016).is_ok());
        assert!(Epoch::new(2016, 2015).is_err());
        assert!(Epoch::new(0, 2015).is_err());
    }

    #[test]
    fn epoch_datetime_range() {
        let e = Epoch::new(2015, 2016).unwrap();
        assert_eq!(e.datetime_range(), "2015-01-01/2016-12-31");
    }

    #[test]
    fn epoch_overlap() {
        let a = Epoch::new(2015, 2016).unwrap();
        let b = Epoch::new(2016, 2017).unwrap();
        let c = Epoch::new(2022, 2023).unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn cloud_bit_predicate() {
        assert!(is_cloud(0b0000_1000));
        assert!(!is_cloud(0b0000_0100));
        // Cloud bit set among other flags still counts
        assert!(is_cloud(0b1010_1010));
    }

    #[test]
    fn fill_bit_predicate() {
        assert!(is_fill(0b0000_0001));
        assert!(!is_fill(0b0000_1000));
    }

    #[test]
    fn reflectance_rescale() {
        // DN 7273 is roughly 0.0 reflectance under the C2 L2 transform
        assert_relative_eq!(dn_to_reflectance(0), -0.2);
        let mid = dn_to_reflectance(7273);
        assert!(mid.abs() < 1e-3, "expected ~0, got {mid}");
    }
}
