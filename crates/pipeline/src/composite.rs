//! Temporal composite construction.
//!
//! Reduces a filtered scene collection to one representative reflectance
//! raster per band: cloud-masked, rescaled to physical reflectance, reduced
//! pixel-wise by the median, and clipped to the region boundary.
//!
//! The median is used instead of the mean because it is robust against
//! residual cloud and shadow contamination that the quality flags miss.

use rayon::prelude::*;
use tracing::{debug, info};
use vegloss_core::{Error, GridSpec, Raster, Region, Result};

use crate::scene::{dn_to_reflectance, is_cloud, is_fill, Epoch, Scene, SceneSource};

/// Parameters controlling composite construction.
#[derive(Debug, Clone, Copy)]
pub struct CompositeParams {
    /// Scene-level cloud-cover ceiling, percent.
    pub cloud_cover_max: f64,
    /// Ground-sample distance of the analysis grid, meters.
    pub resolution_m: f64,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            cloud_cover_max: 20.0,
            resolution_m: 1000.0,
        }
    }
}

impl CompositeParams {
    /// Fail fast on out-of-range values before any scene query is issued.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.cloud_cover_max) {
            return Err(Error::invalid_parameter(
                "cloud_cover_max",
                self.cloud_cover_max,
                "must be a percentage in [0, 100]",
            ));
        }
        if !self.resolution_m.is_finite() || self.resolution_m <= 0.0 {
            return Err(Error::invalid_parameter(
                "resolution_m",
                self.resolution_m,
                "must be a positive ground-sample distance",
            ));
        }
        Ok(())
    }
}

/// One reflectance composite: a single multi-band raster on the analysis
/// grid, NaN where no valid observation exists.
#[derive(Debug, Clone)]
pub struct Composite {
    pub epoch: Epoch,
    pub blue: Raster<f64>,
    pub green: Raster<f64>,
    pub red: Raster<f64>,
    pub nir: Raster<f64>,
}

impl Composite {
    /// Grid shape shared by all bands.
    pub fn shape(&self) -> (usize, usize) {
        self.red.shape()
    }

    /// Whether the composite carries no valid observation at all.
    pub fn is_all_nodata(&self) -> bool {
        self.red.valid_count() == 0 && self.nir.valid_count() == 0
    }
}

/// Build the reflectance composite for one epoch.
///
/// 1. Query the source for scenes intersecting `region` within the epoch's
///    date bounds and under the cloud-cover ceiling.
/// 2. Per scene and pixel: drop cloud/fill-flagged observations, rescale the
///    remaining digital numbers to reflectance.
/// 3. Reduce pixel-wise by the median.
/// 4. Clip to the region boundary (pixel centers outside become nodata).
///
/// An empty scene collection yields a fully masked composite, not an error;
/// downstream stages treat it as valid "no data" input.
pub fn build_composite<S: SceneSource>(
    source: &S,
    region: &Region,
    epoch: &Epoch,
    params: &CompositeParams,
) -> Result<Composite> {
    params.validate()?;
    let grid = GridSpec::from_region(region, params.resolution_m)?;

    let scenes = source.query(region, epoch, params.cloud_cover_max)?;
    for scene in &scenes {
        scene.check_consistent()?;
        if scene.shape() != (grid.rows, grid.cols) {
            return Err(Error::Upstream(format!(
                "scene '{}' shape {:?} does not match analysis grid ({}, {})",
                scene.id,
                scene.shape(),
                grid.rows,
                grid.cols
            )));
        }
    }

    if scenes.is_empty() {
        info!(epoch = %epoch, "no scenes matched the filter; composite is all nodata");
        return Ok(Composite {
            epoch: *epoch,
            blue: grid.raster_nodata(),
            green: grid.raster_nodata(),
            red: grid.raster_nodata(),
            nir: grid.raster_nodata(),
        });
    }

    debug!(epoch = %epoch, scenes = scenes.len(), "reducing scene collection");

    let blue = median_band(&grid, &scenes, region, |s| &s.bands.blue)?;
    let green = median_band(&grid, &scenes, region, |s| &s.bands.green)?;
    let red = median_band(&grid, &scenes, region, |s| &s.bands.red)?;
    let nir = median_band(&grid, &scenes, region, |s| &s.bands.nir)?;

    Ok(Composite {
        epoch: *epoch,
        blue,
        green,
        red,
        nir,
    })
}

/// Median-reduce one band across all scenes, masking clouds and clipping to
/// the region polygon.
fn median_band<'a, F>(
    grid: &GridSpec,
    scenes: &'a [Scene],
    region: &Region,
    band: F,
) -> Result<Raster<f64>>
where
    F: Fn(&'a Scene) -> &'a Raster<u16> + Sync,
{
    let (rows, cols) = (grid.rows, grid.cols);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values: Vec<f64> = Vec::with_capacity(scenes.len());
            for col in 0..cols {
                let (x, y) = grid.transform.pixel_to_geo(col, row);
                if !region.contains(x, y) {
                    continue;
                }

                values.clear();
                for scene in scenes {
                    let qa = unsafe { scene.qa.get_unchecked(row, col) };
                    if is_cloud(qa) || is_fill(qa) {
                        continue;
                    }
                    let dn = unsafe { band(scene).get_unchecked(row, col) };
                    values.push(dn_to_reflectance(dn));
                }

                if !values.is_empty() {
                    row_data[col] = median(&mut values);
                }
            }
            row_data
        })
        .collect();

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(grid.transform);
    raster.set_nodata(Some(f64::NAN));
    Ok(raster)
}

/// Median of a non-empty slice. Reorders the slice.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneBands, QA_CLOUD_BIT};
    use approx::assert_relative_eq;

    /// Deterministic in-memory source with a fixed scene list.
    struct FixedSource {
        scenes: Vec<Scene>,
    }

    impl SceneSource for FixedSource {
        fn query(&self, _: &Region, _: &Epoch, _: f64) -> Result<Vec<Scene>> {
            Ok(self.scenes.clone())
        }
    }

    fn test_region() -> Region {
        // ~4x4 cells at 27830 m resolution over a 1x1 degree box
        Region::from_bbox("t", 10.0, 40.0, 11.0, 41.0).unwrap()
    }

    fn test_grid() -> GridSpec {
        GridSpec::from_region(&test_region(), 27830.0).unwrap()
    }

    fn uniform_scene(id: &str, dn: u16, qa: u16) -> Scene {
        let grid = test_grid();
        let band = || grid.raster_filled(dn);
        Scene {
            id: id.to_string(),
            datetime: "2015-06-01T00:00:00Z".to_string(),
            cloud_cover: 5.0,
            bands: SceneBands {
                blue: band(),
                green: band(),
                red: band(),
                nir: band(),
            },
            qa: grid.raster_filled(qa),
        }
    }

    #[test]
    fn median_odd_and_even() {
        assert_relative_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn empty_collection_yields_all_nodata() {
        let source = FixedSource { scenes: vec![] };
        let epoch = Epoch::new(2015, 2016).unwrap();
        let composite = build_composite(
            &source,
            &test_region(),
            &epoch,
            &CompositeParams::default(),
        )
        .unwrap();

        assert!(composite.is_all_nodata());
    }

    #[test]
    fn median_is_robust_to_outlier_scene() {
        // Two clean scenes at DN 10000 and one outlier at DN 40000.
        let source = FixedSource {
            scenes: vec![
                uniform_scene("a", 10000, 0),
                uniform_scene("b", 10000, 0),
                uniform_scene("c", 40000, 0),
            ],
        };
        let epoch = Epoch::new(2015, 2016).unwrap();
        let composite = build_composite(
            &source,
            &test_region(),
            &epoch,
            &CompositeParams {
                resolution_m: 27830.0,
                ..Default::default()
            },
        )
        .unwrap();

        let expected = dn_to_reflectance(10000);
        // interior pixel
        let v = composite.red.get(1, 1).unwrap();
        assert_relative_eq!(v, expected, epsilon = 1e-12);
    }

    #[test]
    fn cloud_flagged_scene_is_excluded() {
        let source = FixedSource {
            scenes: vec![
                uniform_scene("clear", 10000, 0),
                uniform_scene("cloudy", 60000, QA_CLOUD_BIT),
            ],
        };
        let epoch = Epoch::new(2015, 2016).unwrap();
        let composite = build_composite(
            &source,
            &test_region(),
            &epoch,
            &CompositeParams {
                resolution_m: 27830.0,
                ..Default::default()
            },
        )
        .unwrap();

        let v = composite.nir.get(1, 1).unwrap();
        assert_relative_eq!(v, dn_to_reflectance(10000), epsilon = 1e-12);
    }

    #[test]
    fn all_observations_cloudy_yields_nodata_pixel() {
        let source = FixedSource {
            scenes: vec![uniform_scene("cloudy", 10000, QA_CLOUD_BIT)],
        };
        let epoch = Epoch::new(2015, 2016).unwrap();
        let composite = build_composite(
            &source,
            &test_region(),
            &epoch,
            &CompositeParams {
                resolution_m: 27830.0,
                ..Default::default()
            },
        )
        .unwrap();

        assert!(composite.red.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn rejects_bad_params_before_query() {
        struct PanicSource;
        impl SceneSource for PanicSource {
            fn query(&self, _: &Region, _: &Epoch, _: f64) -> Result<Vec<Scene>> {
                panic!("query must not be issued for invalid parameters");
            }
        }

        let epoch = Epoch::new(2015, 2016).unwrap();
        let bad = CompositeParams {
            cloud_cover_max: 150.0,
            ..Default::default()
        };
        assert!(build_composite(&PanicSource, &test_region(), &epoch, &bad).is_err());

        let bad = CompositeParams {
            resolution_m: -1.0,
            ..Default::default()
        };
        assert!(build_composite(&PanicSource, &test_region(), &epoch, &bad).is_err());
    }

    #[test]
    fn clips_outside_region() {
        // Triangle region inside the bbox: corner pixels fall outside.
        let region = Region::new(
            "tri",
            vec![vec![(10.0, 40.0), (11.0, 40.0), (10.5, 41.0)]],
        )
        .unwrap();
        let grid = GridSpec::from_region(&region, 27830.0).unwrap();

        let band = || grid.raster_filled(10000u16);
        let scene = Scene {
            id: "s".into(),
            datetime: "2015-06-01T00:00:00Z".into(),
            cloud_cover: 0.0,
            bands: SceneBands {
                blue: band(),
                green: band(),
                red: band(),
                nir: band(),
            },
            qa: grid.raster_filled(0u16),
        };
        let source = FixedSource {
            scenes: vec![scene],
        };
        let epoch = Epoch::new(2015, 2016).unwrap();
        let composite = build_composite(
            &source,
            &region,
            &epoch,
            &CompositeParams {
                resolution_m: 27830.0,
                ..Default::default()
            },
        )
        .unwrap();

        // top-right corner pixel center is outside the triangle
        let (rows, cols) = composite.shape();
        assert!(composite.red.get(0, cols - 1).unwrap().is_nan());
        // bottom-center pixel is inside
        assert!(!composite.red.get(rows - 1, cols / 2).unwrap().is_nan());
    }
}
