//! Raster-to-RGBA rendering using color schemes.

use image::{Rgba, RgbaImage};

use vegloss_core::{Raster, RasterElement};
use vegloss_pipeline::{TrueColor, LOSS};

use crate::scheme::{evaluate, ColorScheme, Rgb};

/// Overlay color for loss pixels (opaque red).
pub const LOSS_COLOR: Rgba<u8> = Rgba([227, 26, 28, 255]);

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme to use.
    pub scheme: ColorScheme,
    /// Minimum value for normalization. Values below this are clamped.
    pub min: f64,
    /// Maximum value for normalization. Values above this are clamped.
    pub max: f64,
    /// Color for nodata pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    /// Create params with explicit min/max range.
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns a `Vec<u8>` of length `rows * cols * 4` in row-major order.
/// Nodata pixels are rendered with `params.nodata_color`.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &ColormapParams) -> Vec<u8> {
    let rows = raster.rows();
    let cols = raster.cols();
    let nodata = raster.nodata();
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };

    let mut rgba = vec![0u8; rows * cols * 4];

    for (i, val) in raster.data().iter().enumerate() {
        let offset = i * 4;

        if val.is_nodata(nodata) {
            rgba[offset..offset + 4].copy_from_slice(&params.nodata_color);
            continue;
        }

        match val.to_f64() {
            Some(v) if v.is_finite() => {
                let t = (v - params.min) * inv_range;
                let Rgb { r, g, b } = evaluate(params.scheme, t);
                rgba[offset] = r;
                rgba[offset + 1] = g;
                rgba[offset + 2] = b;
                rgba[offset + 3] = 255;
            }
            _ => {
                rgba[offset..offset + 4].copy_from_slice(&params.nodata_color);
            }
        }
    }

    rgba
}

/// Convert stretched true-color channels to an opaque RGBA image.
///
/// Channel value 0 marks nodata and renders transparent black.
pub fn true_color_to_image(tc: &TrueColor) -> RgbaImage {
    let (red, green, blue) = (&tc.red, &tc.green, &tc.blue);
    let (rows, cols) = tc.shape();
    let mut img = RgbaImage::new(cols as u32, rows as u32);

    for row in 0..rows {
        for col in 0..cols {
            let r = red.data()[(row, col)];
            let g = green.data()[(row, col)];
            let b = blue.data()[(row, col)];
            let px = if r == 0 && g == 0 && b == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([r, g, b, 255])
            };
            img.put_pixel(col as u32, row as u32, px);
        }
    }

    img
}

/// Paint loss pixels onto an image in place.
///
/// The image must have the same dimensions as the mask. Only pixels
/// classified as loss are touched.
pub fn overlay_loss(img: &mut RgbaImage, loss: &Raster<u8>) {
    let (rows, cols) = loss.shape();
    debug_assert_eq!(img.width() as usize, cols);
    debug_assert_eq!(img.height() as usize, rows);

    for row in 0..rows {
        for col in 0..cols {
            if loss.data()[(row, col)] == LOSS {
                img.put_pixel(col as u32, row as u32, LOSS_COLOR);
            }
        }
    }
}
