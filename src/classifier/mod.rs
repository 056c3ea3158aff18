pub mod aggregate;
pub mod clustering;
pub mod config;
pub mod motion;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod track;
pub mod windowing;

pub use clustering::{Dbscan, SpatialClusterer};
pub use config::{CanonicalPolicy, ClassifierConfig, ConfigOverrides};
pub use pipeline::{run_pipeline, PipelineOutput};
