//! Classification of Wi-Fi sightings into static access points and mobile
//! tracks.
//!
//! A mission's sightings flow Normalizer -> WindowSegmenter ->
//! MotionClassifier -> {StaticLocationAggregator, TrackBuilder} ->
//! QualityGate, and the two result tables are committed atomically.

pub mod analyze;
pub mod classifier;
pub mod db;
pub mod error;
pub mod utils;

pub use analyze::{analyze, analyze_with, AnalyzeRequest};
pub use classifier::{CanonicalPolicy, ClassifierConfig, ConfigOverrides, Dbscan, SpatialClusterer};
pub use db::models::{AnalysisSummary, Sighting, StaticLocation, TimeRange, TrackPoint};
pub use db::Database;
pub use error::{AnalysisError, DeviceError};

/// Initialize logging (reads RUST_LOG env var, Info by default).
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
