//! Scene source backed by a STAC catalog.
//!
//! [`CatalogSceneSource`] implements the pipeline's [`SceneSource`] trait:
//! it searches the catalog for Landsat Collection 2 Level-2 items, signs
//! asset hrefs when the catalog requires it, and materializes each band
//! onto the shared analysis grid.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

use vegloss_core::{GeoTransform, GridSpec, Raster, Region};
use vegloss_pipeline::scene::{Epoch, Scene, SceneBands, SceneSource, QA_FILL_BIT};

use crate::blocking::BlockingCatalogClient;
use crate::error::{CatalogError, Result};
use crate::models::{Item, SearchParams};

/// STAC collection holding Landsat Collection 2 Level-2 surface reflectance.
pub const LANDSAT_COLLECTION: &str = "landsat-c2-l2";

const ASSET_BLUE: &str = "blue";
const ASSET_GREEN: &str = "green";
const ASSET_RED: &str = "red";
const ASSET_NIR: &str = "nir08";
const ASSET_QA: &str = "qa_pixel";

// ---------------------------------------------------------------------------
// Band reading
// ---------------------------------------------------------------------------

/// Reads a single band asset and resamples it onto the analysis grid.
///
/// `fill` is the value used for grid cells outside the asset's footprint:
/// `0` for reflectance bands, the QA fill bit for the quality band.
pub trait BandReader {
    fn read_band(&self, href: &str, grid: &GridSpec, fill: u16) -> Result<Raster<u16>>;
}

/// [`BandReader`] that downloads the whole asset over HTTP and decodes it
/// with the `tiff` crate.
///
/// Fine at the coarse grid resolutions this pipeline runs at; a range-read
/// COG reader would be the upgrade path for fine grids.
pub struct HttpBandReader {
    rt: tokio::runtime::Runtime,
    client: reqwest::Client,
}

impl HttpBandReader {
    pub fn new() -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { rt, client })
    }

    fn fetch(&self, href: &str) -> Result<Vec<u8>> {
        self.rt.block_on(async {
            let resp = self
                .client
                .get(href)
                .send()
                .await
                .map_err(|e| CatalogError::Network(format!("band download failed: {e}")))?;

            if !resp.status().is_success() {
                return Err(CatalogError::Network(format!(
                    "band download returned HTTP {}",
                    resp.status()
                )));
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| CatalogError::Network(format!("reading band body: {e}")))?;
            Ok(bytes.to_vec())
        })
    }
}

impl BandReader for HttpBandReader {
    fn read_band(&self, href: &str, grid: &GridSpec, fill: u16) -> Result<Raster<u16>> {
        let bytes = self.fetch(href)?;
        let band = decode_band(&bytes, fill)?;
        Ok(resample_nearest(&band, grid, fill))
    }
}

/// A decoded single-band GeoTIFF in its native grid.
struct DecodedBand {
    data: Vec<u16>,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
}

fn decode_band(bytes: &[u8], fill: u16) -> Result<DecodedBand> {
    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| CatalogError::Decode(format!("TIFF decode error: {e}")))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| CatalogError::Decode(format!("cannot read dimensions: {e}")))?;
    let rows = height as usize;
    let cols = width as usize;

    // Tags must be read before the image data: read_image may advance the
    // decoder past the first IFD.
    let transform = read_geotransform(&mut decoder)?;

    let result = decoder
        .read_image()
        .map_err(|e| CatalogError::Decode(format!("cannot read image data: {e}")))?;

    let data: Vec<u16> = match result {
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as u16).collect(),
        DecodingResult::U16(buf) => buf,
        DecodingResult::U32(buf) => buf
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(fill))
            .collect(),
        DecodingResult::I16(buf) => buf
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(fill))
            .collect(),
        DecodingResult::I32(buf) => buf
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(fill))
            .collect(),
        _ => {
            return Err(CatalogError::Decode(
                "unsupported TIFF pixel format for a band asset".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(CatalogError::Decode(format!(
            "band size mismatch: {} values for {}x{}",
            data.len(),
            rows,
            cols
        )));
    }

    Ok(DecodedBand {
        data,
        rows,
        cols,
        transform,
    })
}

/// Read the geotransform from ModelPixelScaleTag (33550) + ModelTiepointTag
/// (33922).
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(33550))
        .map_err(|_| CatalogError::Decode("band has no pixel scale tag".to_string()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(33922))
        .map_err(|_| CatalogError::Decode("band has no tiepoint tag".to_string()))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(CatalogError::Decode(
            "band geotransform tags are malformed".to_string(),
        ));
    }

    // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Nearest-neighbor resampling onto the analysis grid.
fn resample_nearest(band: &DecodedBand, grid: &GridSpec, fill: u16) -> Raster<u16> {
    let mut out = grid.raster_filled(fill);

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let (x, y) = grid.transform.pixel_to_geo(col, row);
            let (fc, fr) = band.transform.geo_to_pixel(x, y);
            let (sc, sr) = (fc.floor(), fr.floor());

            if sc >= 0.0 && sr >= 0.0 && (sc as usize) < band.cols && (sr as usize) < band.rows {
                let v = band.data[sr as usize * band.cols + sc as usize];
                out.data_mut()[(row, col)] = v;
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Scene source
// ---------------------------------------------------------------------------

/// [`SceneSource`] implementation over a STAC catalog.
pub struct CatalogSceneSource<R: BandReader> {
    client: BlockingCatalogClient,
    reader: R,
    grid: GridSpec,
}

impl<R: BandReader> CatalogSceneSource<R> {
    /// Create a source that materializes scenes onto `grid`.
    ///
    /// The grid must be the same one the pipeline derives from the region
    /// and resolution, or composite assembly will reject the scenes.
    pub fn new(client: BlockingCatalogClient, reader: R, grid: GridSpec) -> Self {
        Self {
            client,
            reader,
            grid,
        }
    }

    fn load_scene(&self, item: &Item) -> Result<Option<Scene>> {
        let hrefs = match (
            item.asset(ASSET_BLUE),
            item.asset(ASSET_GREEN),
            item.asset(ASSET_RED),
            item.asset(ASSET_NIR),
            item.asset(ASSET_QA),
        ) {
            (Some(b), Some(g), Some(r), Some(n), Some(q)) => {
                [&b.href, &g.href, &r.href, &n.href, &q.href]
            }
            _ => {
                warn!(item = %item.id, "item is missing band assets, skipping");
                return Ok(None);
            }
        };

        let mut signed = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            signed.push(self.client.sign_asset_href(href)?);
        }

        let blue = self.reader.read_band(&signed[0], &self.grid, 0)?;
        let green = self.reader.read_band(&signed[1], &self.grid, 0)?;
        let red = self.reader.read_band(&signed[2], &self.grid, 0)?;
        let nir = self.reader.read_band(&signed[3], &self.grid, 0)?;
        let qa = self.reader.read_band(&signed[4], &self.grid, QA_FILL_BIT)?;

        Ok(Some(Scene {
            id: item.id.clone(),
            datetime: item.properties.datetime.clone().unwrap_or_default(),
            cloud_cover: item.cloud_cover().unwrap_or(0.0),
            bands: SceneBands {
                blue,
                green,
                red,
                nir,
            },
            qa,
        }))
    }
}

impl<R: BandReader> SceneSource for CatalogSceneSource<R> {
    fn query(
        &self,
        region: &Region,
        epoch: &Epoch,
        cloud_cover_max: f64,
    ) -> vegloss_core::Result<Vec<Scene>> {
        let (west, south, east, north) = region.bbox();
        let params = SearchParams::new()
            .bbox(west, south, east, north)
            .datetime(&epoch.datetime_range())
            .collections(&[LANDSAT_COLLECTION]);

        let items = self.client.search_all(&params)?;
        debug!(epoch = %epoch, items = items.len(), "catalog returned items");

        let mut scenes = Vec::new();
        for item in &items {
            let Some(cover) = item.cloud_cover() else {
                warn!(item = %item.id, "item has no cloud cover property, skipping");
                continue;
            };
            if cover > cloud_cover_max {
                continue;
            }
            if let Some(scene) = self.load_scene(item)? {
                scenes.push(scene);
            }
        }

        Ok(scenes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use vegloss_core::Region;

    fn grid_10x10() -> GridSpec {
        let region = Region::from_bbox("t", 10.0, 40.0, 11.0, 41.0).unwrap();
        GridSpec::from_region(&region, 11132.0).unwrap()
    }

    #[test]
    fn resample_identity_grid() {
        let grid = grid_10x10();
        let band = DecodedBand {
            data: (0..100).map(|v| v as u16).collect(),
            rows: 10,
            cols: 10,
            transform: grid.transform,
        };

        let out = resample_nearest(&band, &grid, 999);
        assert_eq!(out.get(0, 0).unwrap(), 0);
        assert_eq!(out.get(9, 9).unwrap(), 99);
        assert_eq!(out.get(3, 7).unwrap(), 37);
    }

    #[test]
    fn resample_fills_outside_footprint() {
        let grid = grid_10x10();
        // Source covers only the western half of the grid
        let band = DecodedBand {
            data: vec![7u16; 100],
            rows: 10,
            cols: 10,
            transform: GeoTransform::new(10.0, 41.0, 0.05, -0.1),
        };

        let out = resample_nearest(&band, &grid, 0);
        assert_eq!(out.get(0, 0).unwrap(), 7);
        assert_eq!(out.get(0, 9).unwrap(), 0);
    }

    /// Build a minimal little-endian GeoTIFF by hand: a 4x3 Gray16 strip
    /// with ModelPixelScaleTag and ModelTiepointTag.
    fn geotiff_fixture() -> Vec<u8> {
        let mut buf = Vec::new();

        // Header: byte order, magic, offset of the first IFD (104).
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&104u32.to_le_bytes());

        // Pixel data at offset 8: 12 u16 values, one strip.
        for v in 0..12u16 {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        // ModelPixelScale values at offset 32.
        for v in [0.25f64, 0.25, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        // ModelTiepoint values at offset 56: raster (0,0,0) -> geo (10,41,0).
        for v in [0.0f64, 0.0, 0.0, 10.0, 41.0, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        // IFD at offset 104.
        assert_eq!(buf.len(), 104);
        let entries: [(u16, u16, u32, u32); 12] = [
            (256, 3, 1, 4),       // ImageWidth
            (257, 3, 1, 3),       // ImageLength
            (258, 3, 1, 16),      // BitsPerSample
            (259, 3, 1, 1),       // Compression: none
            (262, 3, 1, 1),       // Photometric: BlackIsZero
            (273, 4, 1, 8),       // StripOffsets
            (277, 3, 1, 1),       // SamplesPerPixel
            (278, 4, 1, 3),       // RowsPerStrip
            (279, 4, 1, 24),      // StripByteCounts
            (339, 3, 1, 1),       // SampleFormat: unsigned
            (33550, 12, 3, 32),   // ModelPixelScaleTag
            (33922, 12, 6, 56),   // ModelTiepointTag
        ];
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, field_type, count, value) in entries {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&field_type.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&0u32.to_le_bytes()); // no next IFD

        buf
    }

    #[test]
    fn decode_reads_pixels_and_geotransform() {
        let band = decode_band(&geotiff_fixture(), 0).unwrap();
        assert_eq!((band.rows, band.cols), (3, 4));
        assert_eq!(band.data, (0..12).collect::<Vec<u16>>());
        assert_eq!(band.transform.origin_x, 10.0);
        assert_eq!(band.transform.origin_y, 41.0);
        assert_eq!(band.transform.pixel_width, 0.25);
        assert_eq!(band.transform.pixel_height, -0.25);
    }

    #[test]
    fn decode_rejects_missing_geo_tags() {
        use tiff::encoder::colortype::Gray16;
        use tiff::encoder::TiffEncoder;

        let data: Vec<u16> = vec![0; 4];
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            encoder.write_image::<Gray16>(2, 2, &data).unwrap();
        }

        assert!(decode_band(&buf, 0).is_err());
    }
}
