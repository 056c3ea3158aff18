//! Error types for the analysis run.

use thiserror::Error;

/// Fatal conditions. Any of these aborts the run before results are committed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no sightings found for mission '{mission}'")]
    MissingMissionData { mission: String },

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("analysis worker failed: {0}")]
    Worker(String),
}

/// A failure confined to one device. The device is skipped and the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("degenerate geometry for {device_id}: {detail}")]
    DegenerateGeometry { device_id: String, detail: String },

    #[error("signal weights for {device_id} sum to zero")]
    ZeroSignalWeight { device_id: String },

    #[error("clusterer output unusable for {device_id}: {detail}")]
    InvalidClustering { device_id: String, detail: String },

    #[error("processing {device_id} panicked: {detail}")]
    Panicked { device_id: String, detail: String },
}

impl DeviceError {
    pub fn device_id(&self) -> &str {
        match self {
            DeviceError::DegenerateGeometry { device_id, .. } => device_id,
            DeviceError::ZeroSignalWeight { device_id } => device_id,
            DeviceError::InvalidClustering { device_id, .. } => device_id,
            DeviceError::Panicked { device_id, .. } => device_id,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
