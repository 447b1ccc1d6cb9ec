//! Error types for catalog access.

use thiserror::Error;

/// Errors produced by remote catalog and boundary access.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("boundary lookup failed for '{name}': {reason}")]
    Boundary { name: String, reason: String },

    #[error("asset decode failed: {0}")]
    Decode(String),

    #[error("core error: {0}")]
    Core(#[from] vegloss_core::Error),
}

impl From<CatalogError> for vegloss_core::Error {
    /// Collapse catalog failures into the pipeline's upstream-failure kind.
    /// Core errors pass through unchanged; an unresolvable boundary name is
    /// a configuration problem, not a remote failure.
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Core(inner) => inner,
            CatalogError::Boundary { name, reason } => {
                vegloss_core::Error::invalid_parameter("region", name, reason)
            }
            other => vegloss_core::Error::Upstream(other.to_string()),
        }
    }
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
