//! Pipeline orchestrator.
//!
//! Sequences the stages for one batch two-epoch comparison:
//! composite (early, recent) -> index (early, recent) -> classify ->
//! true-color render of the recent composite -> validity mask -> aggregate.
//!
//! Single pass, no retries: catalog failures surface to the caller as
//! [`vegloss_core::Error::Upstream`]; "no matching scenes" flows through as
//! nodata and completes with zero valid pixels in the statistics.

use tracing::{info, warn};
use vegloss_core::{Raster, RasterElement, Region, Result};

use crate::change::{classify, ChangeParams};
use crate::composite::{build_composite, Composite, CompositeParams};
use crate::index::ndvi;
use crate::scene::{Epoch, SceneSource};
use crate::stats::{aggregate, validity_mask, LossStatistics};

/// Reflectance value rendered as full channel intensity in the true-color
/// stretch. The standard display stretch for surface reflectance.
const TRUE_COLOR_MAX_REFLECTANCE: f64 = 0.3;

/// Full parameter set for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineParams {
    pub early_epoch: Epoch,
    pub recent_epoch: Epoch,
    pub cloud_cover_max: f64,
    pub resolution_m: f64,
    pub threshold: f64,
}

impl PipelineParams {
    /// Fail fast on out-of-range values before any remote query.
    pub fn validate(&self) -> Result<()> {
        self.composite_params().validate()?;
        self.change_params().validate()?;
        Ok(())
    }

    fn composite_params(&self) -> CompositeParams {
        CompositeParams {
            cloud_cover_max: self.cloud_cover_max,
            resolution_m: self.resolution_m,
        }
    }

    fn change_params(&self) -> ChangeParams {
        ChangeParams {
            threshold: self.threshold,
        }
    }
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            early_epoch: Epoch {
                start_year: 2015,
                end_year: 2016,
            },
            recent_epoch: Epoch {
                start_year: 2022,
                end_year: 2023,
            },
            cloud_cover_max: 20.0,
            resolution_m: 1000.0,
            threshold: -0.15,
        }
    }
}

/// True-color rendering of a composite, one u8 raster per channel.
#[derive(Debug, Clone)]
pub struct TrueColor {
    pub red: Raster<u8>,
    pub green: Raster<u8>,
    pub blue: Raster<u8>,
}

impl TrueColor {
    pub fn shape(&self) -> (usize, usize) {
        self.red.shape()
    }

    pub fn channels(&self) -> [Raster<u8>; 3] {
        [self.red.clone(), self.green.clone(), self.blue.clone()]
    }
}

/// Everything the rendering collaborator needs from one run.
#[derive(Debug, Clone)]
pub struct ChangeAssessment {
    /// Signed index delta, recent minus early.
    pub delta: Raster<f64>,
    /// Authoritative loss mask.
    pub loss: Raster<u8>,
    /// True-color rendering of the recent composite.
    pub recent_rgb: TrueColor,
    /// Affected-area statistics.
    pub stats: LossStatistics,
}

/// Run the full change-detection pipeline over one region.
pub fn run<S: SceneSource>(
    source: &S,
    region: &Region,
    params: &PipelineParams,
) -> Result<ChangeAssessment> {
    params.validate()?;

    if params.early_epoch.overlaps(&params.recent_epoch) {
        // Permitted, but usually a configuration slip worth flagging.
        warn!(
            early = %params.early_epoch,
            recent = %params.recent_epoch,
            "epoch date ranges overlap"
        );
    }

    let composite_params = params.composite_params();

    info!(region = region.name(), epoch = %params.early_epoch, "building early composite");
    let early = build_composite(source, region, &params.early_epoch, &composite_params)?;
    info!(region = region.name(), epoch = %params.recent_epoch, "building recent composite");
    let recent = build_composite(source, region, &params.recent_epoch, &composite_params)?;

    let early_index = ndvi(&early)?;
    let recent_index = ndvi(&recent)?;

    let (delta, loss) = classify(&early_index, &recent_index, &params.change_params())?;

    let recent_rgb = true_color(&recent);
    let validity = validity_mask(&recent_rgb.channels())?;

    let stats = aggregate(
        &loss,
        &validity,
        &params.early_epoch,
        &params.recent_epoch,
        params.resolution_m,
        params.threshold,
    )?;

    info!(
        loss_pixels = stats.loss_pixels,
        valid_pixels = stats.valid_pixels,
        loss_fraction_percent = stats.loss_fraction_percent,
        "pipeline complete"
    );

    Ok(ChangeAssessment {
        delta,
        loss,
        recent_rgb,
        stats,
    })
}

/// Render a composite to true color: reflectance clamped to
/// [0, [`TRUE_COLOR_MAX_REFLECTANCE`]] and scaled to u8. Nodata renders 0.
pub fn true_color(composite: &Composite) -> TrueColor {
    TrueColor {
        red: stretch_channel(&composite.red),
        green: stretch_channel(&composite.green),
        blue: stretch_channel(&composite.blue),
    }
}

fn stretch_channel(band: &Raster<f64>) -> Raster<u8> {
    let (rows, cols) = band.shape();
    let nodata = band.nodata();
    let mut out = band.with_same_meta::<u8>(rows, cols);

    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { band.get_unchecked(row, col) };
            if v.is_nodata(nodata) {
                continue; // stays 0
            }
            let t = (v / TRUE_COLOR_MAX_REFLECTANCE).clamp(0.0, 1.0);
            let byte = (t * 255.0).round() as u8;
            // zero is reserved for "no rendered data"
            out.data_mut()[(row, col)] = byte.max(1);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Composite;
    use vegloss_core::Raster;

    fn composite_of(value: f64) -> Composite {
        let mut band = Raster::filled(2, 2, value);
        band.set_nodata(Some(f64::NAN));
        Composite {
            epoch: Epoch::new(2015, 2016).unwrap(),
            blue: band.clone(),
            green: band.clone(),
            red: band.clone(),
            nir: band,
        }
    }

    #[test]
    fn true_color_stretch() {
        // 0.15 reflectance = mid stretch
        let tc = true_color(&composite_of(0.15));
        let v = tc.red.get(0, 0).unwrap();
        assert_eq!(v, 128);
    }

    #[test]
    fn true_color_clamps_high_reflectance() {
        let tc = true_color(&composite_of(0.9));
        assert_eq!(tc.green.get(0, 0).unwrap(), 255);
    }

    #[test]
    fn nodata_renders_zero() {
        let tc = true_color(&composite_of(f64::NAN));
        assert_eq!(tc.blue.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn valid_but_dark_pixel_is_distinguishable_from_nodata() {
        // reflectance 0.0 renders as 1, not 0
        let tc = true_color(&composite_of(0.0));
        assert_eq!(tc.red.get(0, 0).unwrap(), 1);
    }

    #[test]
    fn params_validation_rejects_bad_values() {
        let mut p = PipelineParams::default();
        p.cloud_cover_max = -5.0;
        assert!(p.validate().is_err());

        let mut p = PipelineParams::default();
        p.resolution_m = 0.0;
        assert!(p.validate().is_err());

        let mut p = PipelineParams::default();
        p.threshold = f64::INFINITY;
        assert!(p.validate().is_err());
    }
}
