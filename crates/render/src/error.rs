//! Error types for rendering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("figure layout error: {0}")]
    Layout(String),

    #[error("core error: {0}")]
    Core(#[from] vegloss_core::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
