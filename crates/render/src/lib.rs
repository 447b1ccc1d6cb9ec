//! # Vegloss Render
//!
//! Colormap rendering and figure composition for vegetation-loss
//! assessments: raster-to-RGBA conversion via multi-stop color schemes,
//! loss-mask overlays on true-color imagery, and a two-panel PNG figure
//! with legend, scale bar, and north arrow.

mod error;
mod figure;
mod render;
mod scheme;

pub use error::{RenderError, Result};
pub use figure::{render_figure, write_png, FigureParams};
pub use render::{overlay_loss, raster_to_rgba, true_color_to_image, ColormapParams, LOSS_COLOR};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
