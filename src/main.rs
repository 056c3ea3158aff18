//! wf-analyzer CLI
//!
//! Usage:
//!   wf-analyzer analyze alpha --from 2024-05-01T08:00:00Z --preset walking
//!   wf-analyzer --db ./missions/alpha.sqlite analyze alpha --config overrides.toml
//!   wf-analyzer presets

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use log::error;

use wf_analyzer_lib::{
    analyze, init_logging, AnalysisError, AnalyzeRequest, CanonicalPolicy, ClassifierConfig,
    ConfigOverrides, Database, TimeRange,
};

/// Classify a mission's sightings into static access points and mobile tracks
#[derive(Parser, Debug)]
#[command(name = "wf-analyzer")]
#[command(about = "Derive static access points and mobile tracks from Wi-Fi sightings")]
struct Cli {
    /// Path to the mission SQLite database (defaults to wf_<MISSION>.sqlite)
    #[arg(long, env = "WF_DB", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the classifier and replace the mission's derived tables
    Analyze {
        /// Mission name
        mission: String,

        /// Only use sightings at or after this RFC 3339 time
        #[arg(long)]
        from: Option<String>,

        /// Only use sightings at or before this RFC 3339 time
        #[arg(long)]
        to: Option<String>,

        /// Named threshold preset
        #[arg(long, default_value = "driving")]
        preset: String,

        /// TOML file with threshold overrides
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        t_max_gap: Option<i64>,

        #[arg(long)]
        min_window_len: Option<usize>,

        #[arg(long)]
        r_stationary: Option<f64>,

        #[arg(long)]
        decim_distance: Option<f64>,

        #[arg(long)]
        decim_time: Option<i64>,

        /// Speed cap for mobile tracks (m/s)
        #[arg(long)]
        max_speed: Option<f64>,

        /// Canonical cluster policy: most_observations or most_recent
        #[arg(long)]
        canonical_policy: Option<String>,
    },

    /// Print the built-in presets as TOML
    Presets,
}

fn parse_time(value: Option<&str>, flag: &str) -> Result<Option<i64>> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.timestamp())
                .with_context(|| format!("invalid {flag} time '{raw}'"))
        })
        .transpose()
}

fn parse_policy(value: Option<&str>) -> Result<Option<CanonicalPolicy>, AnalysisError> {
    match value {
        None => Ok(None),
        Some("most_observations") => Ok(Some(CanonicalPolicy::MostObservations)),
        Some("most_recent") => Ok(Some(CanonicalPolicy::MostRecent)),
        Some(other) => Err(AnalysisError::Configuration(format!(
            "unknown canonical policy '{other}'"
        ))),
    }
}

fn print_presets() -> Result<()> {
    for name in ClassifierConfig::PRESET_NAMES {
        let config = ClassifierConfig::preset(name)?;
        println!("# {name}");
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    preset: &str,
    config_file: Option<&PathBuf>,
    t_max_gap: Option<i64>,
    min_window_len: Option<usize>,
    r_stationary: Option<f64>,
    decim_distance: Option<f64>,
    decim_time: Option<i64>,
    max_speed: Option<f64>,
    canonical_policy: Option<&str>,
) -> Result<ClassifierConfig, AnalysisError> {
    let base = ClassifierConfig::preset(preset)?;
    let from_file = match config_file {
        Some(path) => ConfigOverrides::load(path)
            .map_err(|err| AnalysisError::Configuration(format!("{err:#}")))?,
        None => ConfigOverrides::default(),
    };
    let from_flags = ConfigOverrides {
        t_max_gap_secs: t_max_gap,
        min_window_len,
        r_stationary_m: r_stationary,
        mobile_decim_d_m: decim_distance,
        mobile_decim_t_secs: decim_time,
        max_speed_ms: max_speed,
        cluster_min_points: None,
        canonical_policy: parse_policy(canonical_policy)?,
    };
    let config = base.with_overrides(&from_file.merge(from_flags));
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), AnalysisError> {
    match cli.command {
        Commands::Presets => print_presets().map_err(AnalysisError::from),
        Commands::Analyze {
            mission,
            from,
            to,
            preset,
            config,
            t_max_gap,
            min_window_len,
            r_stationary,
            decim_distance,
            decim_time,
            max_speed,
            canonical_policy,
        } => {
            let classifier_config = build_config(
                &preset,
                config.as_ref(),
                t_max_gap,
                min_window_len,
                r_stationary,
                decim_distance,
                decim_time,
                max_speed,
                canonical_policy.as_deref(),
            )?;
            let time_range = TimeRange {
                from: parse_time(from.as_deref(), "--from")
                    .map_err(|err| AnalysisError::Configuration(format!("{err:#}")))?,
                to: parse_time(to.as_deref(), "--to")
                    .map_err(|err| AnalysisError::Configuration(format!("{err:#}")))?,
            };

            let db_path = cli
                .db
                .unwrap_or_else(|| PathBuf::from(format!("wf_{mission}.sqlite")));
            let database = Database::new(db_path)?;

            let request = AnalyzeRequest::new(mission).with_time_range(time_range);
            let summary = analyze(&database, &request, &classifier_config).await?;

            let report = serde_json::to_string_pretty(&summary)
                .context("failed to serialize run summary")?;
            println!("{report}");
            println!(
                "{} devices processed, {} skipped, {} quality flags",
                summary.devices_processed,
                summary.devices_skipped,
                summary.quality_flags()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Analysis failed: {err}");
            eprintln!("error: {err}");
            eprintln!("analysis aborted: no results committed, previous results left untouched");
            ExitCode::FAILURE
        }
    }
}
