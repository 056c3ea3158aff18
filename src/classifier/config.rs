use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Which cluster becomes a device's single static location when its
/// stationary windows fall into several disjoint places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalPolicy {
    /// Greatest `n_obs`, ties broken by the latest `last_seen`.
    MostObservations,
    /// Latest `last_seen`, ties broken by the greatest `n_obs`.
    MostRecent,
}

impl CanonicalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalPolicy::MostObservations => "most_observations",
            CanonicalPolicy::MostRecent => "most_recent",
        }
    }
}

/// Configuration for the classifier pipeline with tunable thresholds.
///
/// Built once per run and passed by reference into every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Silence (s) that closes a visibility window.
    pub t_max_gap_secs: i64,

    /// Minimum sightings per window; shorter windows are discarded.
    pub min_window_len: usize,

    /// Maximum diameter (m) of a stationary window, also the clustering radius.
    pub r_stationary_m: f64,

    /// Mobile decimation: keep a point this far (m) from the last kept one...
    pub mobile_decim_d_m: f64,
    /// ...or this long (s) after it.
    pub mobile_decim_t_secs: i64,

    /// Speed cap (m/s) enforced on mobile tracks.
    pub max_speed_ms: f64,

    /// DBSCAN core-point threshold for merging stationary windows.
    pub cluster_min_points: usize,

    pub canonical_policy: CanonicalPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            t_max_gap_secs: 120,
            min_window_len: 1,
            r_stationary_m: 350.0,
            mobile_decim_d_m: 100.0,
            mobile_decim_t_secs: 30,
            max_speed_ms: 200_000.0 / 3600.0,
            cluster_min_points: 1,
            canonical_policy: CanonicalPolicy::MostObservations,
        }
    }
}

impl ClassifierConfig {
    pub const PRESET_NAMES: [&'static str; 2] = ["driving", "walking"];

    /// Vehicle survey thresholds (the defaults).
    pub fn driving() -> Self {
        Self::default()
    }

    /// Pedestrian survey thresholds.
    pub fn walking() -> Self {
        Self {
            t_max_gap_secs: 60,
            min_window_len: 1,
            r_stationary_m: 50.0,
            mobile_decim_d_m: 10.0,
            mobile_decim_t_secs: 5,
            max_speed_ms: 8_000.0 / 3600.0,
            ..Self::default()
        }
    }

    pub fn preset(name: &str) -> Result<Self, AnalysisError> {
        match name.to_ascii_lowercase().as_str() {
            "driving" => Ok(Self::driving()),
            "walking" => Ok(Self::walking()),
            other => Err(AnalysisError::Configuration(format!(
                "unknown preset '{other}' (expected one of: {})",
                Self::PRESET_NAMES.join(", ")
            ))),
        }
    }

    /// Returns a copy with every `Some` override applied.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut config = self.clone();
        if let Some(v) = overrides.t_max_gap_secs {
            config.t_max_gap_secs = v;
        }
        if let Some(v) = overrides.min_window_len {
            config.min_window_len = v;
        }
        if let Some(v) = overrides.r_stationary_m {
            config.r_stationary_m = v;
        }
        if let Some(v) = overrides.mobile_decim_d_m {
            config.mobile_decim_d_m = v;
        }
        if let Some(v) = overrides.mobile_decim_t_secs {
            config.mobile_decim_t_secs = v;
        }
        if let Some(v) = overrides.max_speed_ms {
            config.max_speed_ms = v;
        }
        if let Some(v) = overrides.cluster_min_points {
            config.cluster_min_points = v;
        }
        if let Some(v) = overrides.canonical_policy {
            config.canonical_policy = v;
        }
        config
    }

    /// Rejects non-positive, non-finite and contradictory thresholds.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let mut problems = Vec::new();

        if self.mobile_decim_d_m == 0.0 && self.mobile_decim_t_secs == 0 {
            problems.push(
                "mobile_decim_d_m and mobile_decim_t_secs are both 0, every point would be kept"
                    .to_string(),
            );
        }
        if self.t_max_gap_secs <= 0 {
            problems.push(format!("t_max_gap_secs must be positive, got {}", self.t_max_gap_secs));
        }
        if self.min_window_len == 0 {
            problems.push("min_window_len must be at least 1".to_string());
        }
        if self.mobile_decim_t_secs <= 0 {
            problems.push(format!(
                "mobile_decim_t_secs must be positive, got {}",
                self.mobile_decim_t_secs
            ));
        }
        if self.cluster_min_points == 0 {
            problems.push("cluster_min_points must be at least 1".to_string());
        }
        for (name, value) in [
            ("r_stationary_m", self.r_stationary_m),
            ("mobile_decim_d_m", self.mobile_decim_d_m),
            ("max_speed_ms", self.max_speed_ms),
        ] {
            if !value.is_finite() || value <= 0.0 {
                problems.push(format!("{name} must be a positive number, got {value}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::Configuration(problems.join("; ")))
        }
    }
}

/// Partial configuration layered over a preset, usually read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub t_max_gap_secs: Option<i64>,
    #[serde(default)]
    pub min_window_len: Option<usize>,
    #[serde(default)]
    pub r_stationary_m: Option<f64>,
    #[serde(default)]
    pub mobile_decim_d_m: Option<f64>,
    #[serde(default)]
    pub mobile_decim_t_secs: Option<i64>,
    #[serde(default)]
    pub max_speed_ms: Option<f64>,
    #[serde(default)]
    pub cluster_min_points: Option<usize>,
    #[serde(default)]
    pub canonical_policy: Option<CanonicalPolicy>,
}

impl ConfigOverrides {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read overrides from {}", path.display()))?;
        let overrides: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse overrides in {}", path.display()))?;
        Ok(overrides)
    }

    /// Fields set in `other` win over fields set in `self`.
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            t_max_gap_secs: other.t_max_gap_secs.or(self.t_max_gap_secs),
            min_window_len: other.min_window_len.or(self.min_window_len),
            r_stationary_m: other.r_stationary_m.or(self.r_stationary_m),
            mobile_decim_d_m: other.mobile_decim_d_m.or(self.mobile_decim_d_m),
            mobile_decim_t_secs: other.mobile_decim_t_secs.or(self.mobile_decim_t_secs),
            max_speed_ms: other.max_speed_ms.or(self.max_speed_ms),
            cluster_min_points: other.cluster_min_points.or(self.cluster_min_points),
            canonical_policy: other.canonical_policy.or(self.canonical_policy),
        }
    }
}
