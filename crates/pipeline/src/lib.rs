//! # Vegloss Pipeline
//!
//! Two-epoch vegetation-loss detection over a geographic region.
//!
//! The pipeline builds a cloud-filtered median composite per epoch, derives
//! the normalized vegetation index for each, classifies the signed index
//! delta against a loss threshold, and aggregates affected-area statistics:
//!
//! - **composite**: scene filtering, cloud masking, reflectance rescaling,
//!   pixel-wise median reduction, region clipping
//! - **index**: normalized difference vegetation index
//! - **change**: index delta and threshold classification
//! - **stats**: loss/valid pixel counts and loss fraction
//! - **run**: the orchestrator sequencing the stages

pub mod change;
pub mod composite;
pub mod index;
pub mod run;
pub mod scene;
pub mod stats;

pub use change::{classify, ChangeParams, LOSS, NOT_LOSS, NO_DATA};
pub use composite::{build_composite, Composite, CompositeParams};
pub use index::ndvi;
pub use run::{run, ChangeAssessment, PipelineParams, TrueColor};
pub use scene::{is_cloud, is_fill, Epoch, Scene, SceneBands, SceneSource};
pub use stats::{aggregate, validity_mask, LossStatistics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::change::{classify, ChangeParams};
    pub use crate::composite::{build_composite, Composite, CompositeParams};
    pub use crate::index::ndvi;
    pub use crate::run::{run, ChangeAssessment, PipelineParams};
    pub use crate::scene::{Epoch, Scene, SceneSource};
    pub use crate::stats::{aggregate, LossStatistics};
    pub use vegloss_core::prelude::*;
}
