//! Two-panel assessment figure.
//!
//! Left panel: recent true-color composite with loss pixels painted red.
//! Right panel: signed NDVI delta under the diverging colormap. Below the
//! panels sit a delta colorbar, a loss swatch, and a scale bar; a north
//! arrow marks orientation. All annotation is graphical; numbers live in
//! the JSON statistics sidecar the CLI writes next to the figure.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::debug;

use vegloss_pipeline::ChangeAssessment;

use crate::error::{RenderError, Result};
use crate::render::{overlay_loss, raster_to_rgba, true_color_to_image, ColormapParams, LOSS_COLOR};
use crate::scheme::{evaluate, ColorScheme};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([40, 40, 40, 255]);
const NODATA_GRAY: [u8; 4] = [210, 210, 210, 255];

/// Figure layout parameters.
#[derive(Debug, Clone)]
pub struct FigureParams {
    /// Integer upscaling factor for the raster panels.
    pub scale: u32,
    /// Outer margin in output pixels.
    pub margin: u32,
    /// Gap between the two panels.
    pub gutter: u32,
    /// Symmetric delta colormap range: values map [-range, +range].
    pub delta_range: f64,
}

impl Default for FigureParams {
    fn default() -> Self {
        Self {
            scale: 4,
            margin: 12,
            gutter: 10,
            delta_range: 0.5,
        }
    }
}

/// Compose the two-panel loss figure for an assessment.
///
/// `resolution_m` is the ground-sample distance of the analysis grid and
/// drives the scale bar length.
pub fn render_figure(
    assessment: &ChangeAssessment,
    resolution_m: f64,
    params: &FigureParams,
) -> Result<RgbaImage> {
    if params.scale == 0 {
        return Err(RenderError::Layout("scale factor must be nonzero".into()));
    }

    let (rows, cols) = assessment.delta.shape();
    if rows == 0 || cols == 0 {
        return Err(RenderError::Layout("assessment rasters are empty".into()));
    }

    // Left: true color + loss overlay
    let mut left = true_color_to_image(&assessment.recent_rgb);
    overlay_loss(&mut left, &assessment.loss);

    // Right: signed delta under the diverging scheme
    let mut delta_params =
        ColormapParams::with_range(ColorScheme::Delta, -params.delta_range, params.delta_range);
    delta_params.nodata_color = NODATA_GRAY;
    let delta_rgba = raster_to_rgba(&assessment.delta, &delta_params);
    let right = RgbaImage::from_raw(cols as u32, rows as u32, delta_rgba)
        .ok_or_else(|| RenderError::Layout("delta buffer size mismatch".into()))?;

    let panel_w = cols as u32 * params.scale;
    let panel_h = rows as u32 * params.scale;
    let left = imageops::resize(&left, panel_w, panel_h, FilterType::Nearest);
    let right = imageops::resize(&right, panel_w, panel_h, FilterType::Nearest);

    // Layout: margin | header | panels | footer | margin
    let header_h = 16;
    let footer_h = 26;
    let width = params.margin * 2 + panel_w * 2 + params.gutter;
    let height = params.margin * 2 + header_h + panel_h + footer_h;

    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    let panels_y = params.margin + header_h;
    let left_x = params.margin;
    let right_x = params.margin + panel_w + params.gutter;
    imageops::overlay(&mut canvas, &left, left_x as i64, panels_y as i64);
    imageops::overlay(&mut canvas, &right, right_x as i64, panels_y as i64);

    draw_north_arrow(&mut canvas, width - params.margin - 12, params.margin, 12);

    let footer_y = panels_y + panel_h + 6;
    draw_colorbar(&mut canvas, right_x, footer_y, panel_w, 10);
    draw_loss_swatch(&mut canvas, left_x, footer_y, 10);
    draw_scale_bar(
        &mut canvas,
        left_x + 18,
        footer_y + 3,
        panel_w.saturating_sub(18).max(8),
        resolution_m / params.scale as f64,
    );

    debug!(width, height, "figure composed");
    Ok(canvas)
}

/// Write a figure to a PNG file.
pub fn write_png(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save(path)?;
    Ok(())
}

// ── Annotation primitives ───────────────────────────────────────────

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for yy in y..(y + h).min(img.height()) {
        for xx in x..(x + w).min(img.width()) {
            img.put_pixel(xx, yy, color);
        }
    }
}

/// Horizontal gradient bar for the delta scheme, low (loss) on the left.
fn draw_colorbar(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32) {
    for i in 0..w {
        let t = i as f64 / (w.saturating_sub(1)).max(1) as f64;
        let c = evaluate(ColorScheme::Delta, t);
        fill_rect(img, x + i, y, 1, h, Rgba([c.r, c.g, c.b, 255]));
    }
    // thin frame
    fill_rect(img, x, y, w, 1, INK);
    fill_rect(img, x, y + h - 1, w, 1, INK);
    fill_rect(img, x, y, 1, h, INK);
    fill_rect(img, x + w - 1, y, 1, h, INK);
}

/// Small framed square in the loss overlay color.
fn draw_loss_swatch(img: &mut RgbaImage, x: u32, y: u32, size: u32) {
    fill_rect(img, x, y, size, size, LOSS_COLOR);
    fill_rect(img, x, y, size, 1, INK);
    fill_rect(img, x, y + size - 1, size, 1, INK);
    fill_rect(img, x, y, 1, size, INK);
    fill_rect(img, x + size - 1, y, 1, size, INK);
}

/// Scale bar sized to a round kilometre distance.
///
/// `meters_per_pixel` is the ground distance of one output pixel.
fn draw_scale_bar(img: &mut RgbaImage, x: u32, y: u32, max_w: u32, meters_per_pixel: f64) {
    const NICE_KM: &[f64] = &[1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0];

    let budget_px = (max_w / 3).max(8) as f64;
    let mut bar_m = NICE_KM[0] * 1000.0;
    for &km in NICE_KM {
        let m = km * 1000.0;
        if m / meters_per_pixel <= budget_px {
            bar_m = m;
        }
    }

    let bar_px = ((bar_m / meters_per_pixel).round() as u32).clamp(2, max_w);
    fill_rect(img, x, y + 3, bar_px, 3, INK);
    // end ticks
    fill_rect(img, x, y, 1, 9, INK);
    fill_rect(img, x + bar_px - 1, y, 1, 9, INK);
}

/// Upward-pointing triangle.
fn draw_north_arrow(img: &mut RgbaImage, x: u32, y: u32, size: u32) {
    let half = size / 2;
    for row in 0..size {
        let spread = (row * half) / size.max(1);
        let start = x + half - spread;
        fill_rect(img, start, y + row, spread * 2 + 1, 1, INK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegloss_core::Raster;
    use vegloss_pipeline::{ChangeAssessment, LossStatistics, TrueColor};

    fn tiny_assessment() -> ChangeAssessment {
        let mut delta = Raster::<f64>::filled(4, 4, -0.02);
        delta.set_nodata(Some(f64::NAN));
        delta.set(0, 0, -0.6).unwrap();
        delta.set(3, 3, f64::NAN).unwrap();

        let mut loss = Raster::<u8>::filled(4, 4, 0);
        loss.set_nodata(Some(vegloss_pipeline::NO_DATA));
        loss.set(0, 0, vegloss_pipeline::LOSS).unwrap();
        loss.set(3, 3, vegloss_pipeline::NO_DATA).unwrap();

        ChangeAssessment {
            delta,
            loss,
            recent_rgb: TrueColor {
                red: Raster::filled(4, 4, 90),
                green: Raster::filled(4, 4, 120),
                blue: Raster::filled(4, 4, 80),
            },
            stats: LossStatistics {
                loss_pixels: 1,
                valid_pixels: 15,
                loss_fraction_percent: 100.0 / 15.0,
                epoch_early: (2015, 2016),
                epoch_recent: (2022, 2023),
                resolution_m: 1000.0,
                threshold: -0.15,
            },
        }
    }

    #[test]
    fn figure_has_expected_dimensions() {
        let params = FigureParams::default();
        let img = render_figure(&tiny_assessment(), 1000.0, &params).unwrap();

        let panel = 4 * params.scale;
        assert_eq!(img.width(), params.margin * 2 + panel * 2 + params.gutter);
        assert_eq!(img.height(), params.margin * 2 + 16 + panel + 26);
    }

    #[test]
    fn loss_pixel_is_painted_red() {
        let params = FigureParams::default();
        let img = render_figure(&tiny_assessment(), 1000.0, &params).unwrap();

        // Top-left cell of the left panel, scaled
        let x = params.margin + 1;
        let y = params.margin + 16 + 1;
        assert_eq!(*img.get_pixel(x, y), LOSS_COLOR);
    }

    #[test]
    fn zero_scale_is_rejected() {
        let params = FigureParams {
            scale: 0,
            ..FigureParams::default()
        };
        assert!(render_figure(&tiny_assessment(), 1000.0, &params).is_err());
    }

    #[test]
    fn colorbar_runs_red_to_green() {
        let mut img = RgbaImage::from_pixel(40, 14, BACKGROUND);
        draw_colorbar(&mut img, 0, 0, 40, 10);
        let left = img.get_pixel(1, 5);
        let right = img.get_pixel(38, 5);
        assert!(left[0] > left[1], "left end should be red-dominant");
        assert!(right[1] > right[0], "right end should be green-dominant");
    }
}
