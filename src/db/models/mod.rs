pub mod analysis_run;
pub mod sighting;
pub mod static_location;
pub mod track_point;

pub use analysis_run::AnalysisSummary;
pub use sighting::{Session, Sighting, TimeRange};
pub use static_location::StaticLocation;
pub use track_point::TrackPoint;
