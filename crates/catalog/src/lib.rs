//! # Vegloss Catalog
//!
//! Remote imagery access for the vegloss pipeline: STAC item search,
//! administrative-boundary lookup, and a [`SceneSource`] implementation
//! that materializes catalog assets onto the analysis grid.
//!
//! The pipeline itself never talks to the network; everything remote lives
//! behind this crate.
//!
//! [`SceneSource`]: vegloss_pipeline::SceneSource

pub mod blocking;
pub mod boundary;
pub mod client;
pub mod error;
pub mod models;
pub mod source;

pub use blocking::BlockingCatalogClient;
pub use boundary::lookup_region;
pub use client::{Catalog, CatalogClient, CatalogClientOptions};
pub use error::{CatalogError, Result};
pub use models::{Item, ItemCollection, SearchParams};
pub use source::{BandReader, CatalogSceneSource, HttpBandReader, LANDSAT_COLLECTION};
