//! End-to-end tests for the analyze operation
//!
//! Each test seeds a fresh SQLite mission database in a temp directory,
//! runs the classifier and reads the committed tables back.

use std::sync::Arc;

use tempfile::TempDir;
use wf_analyzer_lib::db::models::Session;
use wf_analyzer_lib::utils::geo::{haversine_m, GeoPoint};
use wf_analyzer_lib::{
    analyze, analyze_with, AnalysisError, AnalyzeRequest, ClassifierConfig, Database, Sighting,
    SpatialClusterer, TimeRange, TrackPoint,
};

const MISSION: &str = "alpha";

async fn mission_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::new(dir.path().join("wf_alpha.sqlite")).expect("open db");
    db.insert_session(&Session {
        id: "session-1".to_string(),
        mission: MISSION.to_string(),
        src_file: "capture-1.kismet".to_string(),
        sha256: "0f".repeat(32),
        start_ts: 0,
        end_ts: 2_000,
    })
    .await
    .expect("insert session");
    (dir, db)
}

fn sighting(device: &str, ts: i64, lat: Option<f64>, lon: Option<f64>) -> Sighting {
    Sighting {
        id: None,
        device_id: device.to_string(),
        session_id: "session-1".to_string(),
        timestamp: ts,
        lat,
        lon,
        signal_dbm: Some(-62.0),
        channel: Some(6),
        frequency: Some(2_437_000),
    }
}

fn at(device: &str, ts: i64, lat: f64, lon: f64) -> Sighting {
    sighting(device, ts, Some(lat), Some(lon))
}

/// D1: two stationary windows at the same spot.
fn scenario_a() -> Vec<Sighting> {
    vec![
        at("D1", 0, 1.0, 1.0),
        at("D1", 60, 1.0005, 1.0005),
        at("D1", 500, 1.0, 1.0),
    ]
}

/// D2: ~1 km north over 10 minutes, one sighting every 10 s.
fn scenario_b() -> Vec<Sighting> {
    (0..=60)
        .map(|i| at("D2", i * 10, 2.0 + i as f64 * 0.00015, 2.0))
        .collect()
}

/// D3: never positioned.
fn scenario_c() -> Vec<Sighting> {
    vec![
        sighting("D3", 0, None, None),
        sighting("D3", 10, Some(3.0), None),
        sighting("D3", 20, None, Some(3.0)),
    ]
}

/// D4: a steady drive with one 5 km jump lasting two seconds.
fn scenario_d() -> Vec<Sighting> {
    let mut out: Vec<Sighting> = (0..=60)
        .map(|i| at("D4", i * 10, 4.0 + i as f64 * 0.00015, 4.0))
        .collect();
    out.push(at("D4", 302, 4.045, 4.0));
    out
}

fn speed(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let d = haversine_m(GeoPoint::new(a.lat, a.lon), GeoPoint::new(b.lat, b.lon));
    d / (b.timestamp - a.timestamp).max(1) as f64
}

#[tokio::test]
async fn scenario_a_merges_windows_into_one_static_location() {
    let (_dir, db) = mission_db().await;
    db.insert_sightings(&scenario_a()).await.unwrap();

    let summary = analyze(&db, &AnalyzeRequest::new(MISSION), &ClassifierConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.devices_processed, 1);
    assert_eq!(summary.static_locations, 1);

    let locations = db.get_static_locations(MISSION).await.unwrap();
    assert_eq!(locations.len(), 1);
    let d1 = &locations[0];
    assert_eq!(d1.device_id, "D1");
    assert_eq!(d1.n_obs, 3);
    assert_eq!(d1.first_seen, 0);
    assert_eq!(d1.last_seen, 500);
    assert!(!d1.loc_error_flag);
    assert!(db.get_mobile_tracks(MISSION).await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_b_decimates_a_mobile_track() {
    let (_dir, db) = mission_db().await;
    db.insert_sightings(&scenario_b()).await.unwrap();

    let config = ClassifierConfig::default();
    analyze(&db, &AnalyzeRequest::new(MISSION), &config).await.unwrap();

    assert!(db.get_static_locations(MISSION).await.unwrap().is_empty());
    let track = db.get_mobile_tracks(MISSION).await.unwrap();
    assert!(track.len() >= 2 && track.len() < 61, "kept {}", track.len());
    assert_eq!(track[0].timestamp, 0);
    for pair in track.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
        let d = haversine_m(
            GeoPoint::new(pair[0].lat, pair[0].lon),
            GeoPoint::new(pair[1].lat, pair[1].lon),
        );
        let dt = pair[1].timestamp - pair[0].timestamp;
        assert!(d >= config.mobile_decim_d_m || dt >= config.mobile_decim_t_secs);
    }
}

#[tokio::test]
async fn scenario_c_unpositioned_device_is_absent() {
    let (_dir, db) = mission_db().await;
    let mut input = scenario_c();
    input.extend(scenario_a());
    db.insert_sightings(&input).await.unwrap();

    let summary = analyze(&db, &AnalyzeRequest::new(MISSION), &ClassifierConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.sightings_loaded, 6);
    assert_eq!(summary.sightings_normalized, 3);
    assert_eq!(summary.devices_skipped, 0);

    let locations = db.get_static_locations(MISSION).await.unwrap();
    assert!(locations.iter().all(|l| l.device_id != "D3"));
    let track = db.get_mobile_tracks(MISSION).await.unwrap();
    assert!(track.iter().all(|p| p.device_id != "D3"));
}

#[tokio::test]
async fn scenario_d_speed_outlier_removed_and_track_stays_decimated() {
    let (_dir, db) = mission_db().await;
    db.insert_sightings(&scenario_d()).await.unwrap();

    let config = ClassifierConfig::default();
    let summary = analyze(&db, &AnalyzeRequest::new(MISSION), &config).await.unwrap();
    assert_eq!(summary.speed_removals, 1);
    assert_eq!(summary.quality_flags(), 1);

    let track = db.get_mobile_tracks(MISSION).await.unwrap();
    let times: Vec<i64> = track.iter().map(|p| p.timestamp).collect();
    assert!(!times.contains(&302));
    // 16 m and 10 s after 300 once the jump is gone.
    assert!(!times.contains(&310));
    assert!(times.contains(&300));
    assert!(times.contains(&340));
    for pair in track.windows(2) {
        assert!(speed(&pair[0], &pair[1]) <= config.max_speed_ms);
        let d = haversine_m(
            GeoPoint::new(pair[0].lat, pair[0].lon),
            GeoPoint::new(pair[1].lat, pair[1].lon),
        );
        let dt = pair[1].timestamp - pair[0].timestamp;
        assert!(
            d >= config.mobile_decim_d_m || dt >= config.mobile_decim_t_secs,
            "{} -> {}: {:.0} m in {} s",
            pair[0].timestamp,
            pair[1].timestamp,
            d,
            dt
        );
    }
}

#[tokio::test]
async fn rerun_produces_identical_tables() {
    let (_dir, db) = mission_db().await;
    let mut input = scenario_a();
    input.extend(scenario_b());
    input.extend(scenario_c());
    input.extend(scenario_d());
    // Exact duplicates collapse during normalization.
    input.extend(scenario_a());
    db.insert_sightings(&input).await.unwrap();

    let config = ClassifierConfig::default();
    let request = AnalyzeRequest::new(MISSION);

    let first = analyze(&db, &request, &config).await.unwrap();
    let static_1 = serde_json::to_string(&db.get_static_locations(MISSION).await.unwrap()).unwrap();
    let track_1 = serde_json::to_string(&db.get_mobile_tracks(MISSION).await.unwrap()).unwrap();

    let second = analyze(&db, &request, &config).await.unwrap();
    let static_2 = serde_json::to_string(&db.get_static_locations(MISSION).await.unwrap()).unwrap();
    let track_2 = serde_json::to_string(&db.get_mobile_tracks(MISSION).await.unwrap()).unwrap();

    assert_eq!(static_1, static_2);
    assert_eq!(track_1, track_2);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.track_points, second.track_points);
    assert_eq!(db.get_runs(MISSION).await.unwrap().len(), 2);

    let d1 = db
        .get_static_locations(MISSION)
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.device_id == "D1")
        .unwrap();
    assert_eq!(d1.n_obs, 3);
}

#[tokio::test]
async fn time_range_limits_the_input() {
    let (_dir, db) = mission_db().await;
    db.insert_sightings(&scenario_a()).await.unwrap();

    let request = AnalyzeRequest::new(MISSION).with_time_range(TimeRange {
        from: None,
        to: Some(60),
    });
    let summary = analyze(&db, &request, &ClassifierConfig::default()).await.unwrap();
    assert_eq!(summary.sightings_loaded, 2);

    let locations = db.get_static_locations(MISSION).await.unwrap();
    assert_eq!(locations[0].n_obs, 2);
    assert_eq!(locations[0].last_seen, 60);
}

#[tokio::test]
async fn invalid_config_aborts_without_touching_results() {
    let (_dir, db) = mission_db().await;
    db.insert_sightings(&scenario_a()).await.unwrap();
    analyze(&db, &AnalyzeRequest::new(MISSION), &ClassifierConfig::default())
        .await
        .unwrap();

    let bad = ClassifierConfig {
        mobile_decim_d_m: 0.0,
        mobile_decim_t_secs: 0,
        ..ClassifierConfig::default()
    };
    let err = analyze(&db, &AnalyzeRequest::new(MISSION), &bad).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Configuration(_)));

    assert_eq!(db.get_static_locations(MISSION).await.unwrap().len(), 1);
    assert_eq!(db.get_runs(MISSION).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_or_empty_mission_is_fatal() {
    let (_dir, db) = mission_db().await;

    let err = analyze(&db, &AnalyzeRequest::new("bravo"), &ClassifierConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::MissingMissionData { ref mission } if mission == "bravo"));

    // Known mission, but nothing was ever sighted.
    let err = analyze(&db, &AnalyzeRequest::new(MISSION), &ClassifierConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::MissingMissionData { .. }));
    assert!(db.get_runs(MISSION).await.unwrap().is_empty());
}

#[tokio::test]
async fn degenerate_device_is_skipped_not_fatal() {
    let (_dir, db) = mission_db().await;
    let mut input = scenario_a();
    input.push(at("BAD", 0, f64::INFINITY, 1.0));
    input.push(at("BAD", 5, 1.0, 1.0));
    db.insert_sightings(&input).await.unwrap();

    let summary = analyze(&db, &AnalyzeRequest::new(MISSION), &ClassifierConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.devices_processed, 1);
    assert_eq!(summary.devices_skipped, 1);

    let locations = db.get_static_locations(MISSION).await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].device_id, "D1");
}

/// Treats every window as its own place.
struct Singletons;

impl SpatialClusterer for Singletons {
    fn cluster(&self, points: &[GeoPoint], _radius_m: f64) -> Vec<Option<usize>> {
        (0..points.len()).map(Some).collect()
    }
}

#[tokio::test]
async fn clustering_strategy_is_pluggable() {
    let (_dir, db) = mission_db().await;
    db.insert_sightings(&scenario_a()).await.unwrap();

    analyze_with(
        &db,
        &AnalyzeRequest::new(MISSION),
        &ClassifierConfig::default(),
        Arc::new(Singletons),
    )
    .await
    .unwrap();

    let locations = db.get_static_locations(MISSION).await.unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].n_clusters, 2);
    // The two-sighting window outweighs the single revisit.
    assert_eq!(locations[0].n_obs, 2);
    assert_eq!(locations[0].last_seen, 60);
}

/// Returns one assignment too many.
struct OffByOne;

impl SpatialClusterer for OffByOne {
    fn cluster(&self, points: &[GeoPoint], _radius_m: f64) -> Vec<Option<usize>> {
        vec![Some(0); points.len() + 1]
    }
}

#[tokio::test]
async fn malformed_clusterer_output_skips_only_that_device() {
    let (_dir, db) = mission_db().await;
    let mut input = scenario_a();
    input.extend(scenario_b());
    db.insert_sightings(&input).await.unwrap();

    let summary = analyze_with(
        &db,
        &AnalyzeRequest::new(MISSION),
        &ClassifierConfig::default(),
        Arc::new(OffByOne),
    )
    .await
    .unwrap();
    assert_eq!(summary.devices_skipped, 1);
    assert_eq!(summary.devices_processed, 1);

    assert!(db.get_static_locations(MISSION).await.unwrap().is_empty());
    let track = db.get_mobile_tracks(MISSION).await.unwrap();
    assert!(track.len() >= 2);
    assert!(track.iter().all(|p| p.device_id == "D2"));
}
