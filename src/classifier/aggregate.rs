use std::cmp::Ordering;

use crate::classifier::clustering::{ClusterAssignments, SpatialClusterer};
use crate::classifier::config::{CanonicalPolicy, ClassifierConfig};
use crate::classifier::windowing::VisibilityWindow;
use crate::db::models::StaticLocation;
use crate::error::DeviceError;
use crate::log_warn;
use crate::utils::geo::{diameter_m, signal_weight, weighted_centroid, GeoPoint};

const ENABLE_LOGS: bool = true;

/// A stationary window collapsed to its signal-weighted centroid.
#[derive(Debug, Clone, Copy)]
struct WindowSummary {
    centroid: GeoPoint,
    weight: f64,
    start_time: i64,
    end_time: i64,
    n_obs: i64,
}

/// One physical place a device was seen stationary at.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCluster {
    pub centroid: GeoPoint,
    pub loc_error_m: f64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub n_obs: i64,
}

fn summarize(window: &VisibilityWindow) -> Result<WindowSummary, DeviceError> {
    let weighted = window
        .points
        .iter()
        .map(|p| (p.point, signal_weight(p.signal_dbm)));
    let weight: f64 = window.points.iter().map(|p| signal_weight(p.signal_dbm)).sum();
    let centroid = weighted_centroid(weighted).ok_or_else(|| DeviceError::ZeroSignalWeight {
        device_id: window.device_id.clone(),
    })?;

    Ok(WindowSummary {
        centroid,
        weight,
        start_time: window.start_time,
        end_time: window.end_time,
        n_obs: window.sighting_count() as i64,
    })
}

/// One assignment per window, every cluster id below the window count.
fn check_assignments(
    device_id: &str,
    assignments: &ClusterAssignments,
    n_windows: usize,
) -> Result<(), DeviceError> {
    if assignments.len() != n_windows {
        return Err(DeviceError::InvalidClustering {
            device_id: device_id.to_string(),
            detail: format!("{} assignments for {} windows", assignments.len(), n_windows),
        });
    }
    if let Some(id) = assignments.iter().flatten().find(|&&id| id >= n_windows) {
        return Err(DeviceError::InvalidClustering {
            device_id: device_id.to_string(),
            detail: format!("cluster id {id} out of range for {n_windows} windows"),
        });
    }
    Ok(())
}

/// Merge a device's stationary windows into physical-location clusters.
///
/// Clusters come back in order of first appearance. Windows the clusterer
/// leaves as noise become clusters of their own so no sighting is lost.
pub fn cluster_stationary_windows(
    device_id: &str,
    windows: &[VisibilityWindow],
    config: &ClassifierConfig,
    clusterer: &dyn SpatialClusterer,
) -> Result<Vec<StaticCluster>, DeviceError> {
    let summaries = windows.iter().map(summarize).collect::<Result<Vec<_>, _>>()?;
    let centroids: Vec<GeoPoint> = summaries.iter().map(|s| s.centroid).collect();

    let assignments = clusterer.cluster(&centroids, config.r_stationary_m);
    check_assignments(device_id, &assignments, centroids.len())?;
    let mut next_id = assignments.iter().flatten().max().map_or(0, |max| max + 1);
    let cluster_ids: Vec<usize> = assignments
        .into_iter()
        .map(|assignment| {
            assignment.unwrap_or_else(|| {
                let id = next_id;
                next_id += 1;
                id
            })
        })
        .collect();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); next_id];
    for (window_idx, cluster_id) in cluster_ids.iter().enumerate() {
        members[*cluster_id].push(window_idx);
    }

    members
        .into_iter()
        .filter(|m| !m.is_empty())
        .map(|member_windows| {
            let centroid = weighted_centroid(
                member_windows
                    .iter()
                    .map(|&i| (summaries[i].centroid, summaries[i].weight)),
            )
            .ok_or_else(|| DeviceError::ZeroSignalWeight {
                device_id: device_id.to_string(),
            })?;

            let raw_points: Vec<GeoPoint> = member_windows
                .iter()
                .flat_map(|&i| windows[i].points.iter().map(|p| p.point))
                .collect();
            let diameter = diameter_m(&raw_points);
            if diameter.is_nan() {
                return Err(DeviceError::DegenerateGeometry {
                    device_id: device_id.to_string(),
                    detail: "undefined distance inside stationary cluster".to_string(),
                });
            }

            Ok(StaticCluster {
                centroid,
                loc_error_m: diameter / 2.0,
                first_seen: member_windows.iter().map(|&i| summaries[i].start_time).min().unwrap_or(0),
                last_seen: member_windows.iter().map(|&i| summaries[i].end_time).max().unwrap_or(0),
                n_obs: member_windows.iter().map(|&i| summaries[i].n_obs).sum(),
            })
        })
        .collect()
}

/// Total order used to pick the canonical cluster; the greatest wins.
fn canonical_order(a: &StaticCluster, b: &StaticCluster, policy: CanonicalPolicy) -> Ordering {
    let primary = match policy {
        CanonicalPolicy::MostObservations => a.n_obs.cmp(&b.n_obs).then(a.last_seen.cmp(&b.last_seen)),
        CanonicalPolicy::MostRecent => a.last_seen.cmp(&b.last_seen).then(a.n_obs.cmp(&b.n_obs)),
    };
    // Remaining ties resolve to the earliest, then southernmost/westernmost cluster.
    primary
        .then(b.first_seen.cmp(&a.first_seen))
        .then(b.centroid.lat.total_cmp(&a.centroid.lat))
        .then(b.centroid.lon.total_cmp(&a.centroid.lon))
}

/// Reduce a device's stationary windows to its single canonical location.
///
/// Returns `Ok(None)` when the device has no stationary windows. When the
/// windows form several disjoint clusters, the one ranked highest by
/// `config.canonical_policy` is kept, the others are logged, and the count
/// is recorded in `n_clusters`.
pub fn aggregate_device(
    device_id: &str,
    windows: &[VisibilityWindow],
    config: &ClassifierConfig,
    clusterer: &dyn SpatialClusterer,
) -> Result<Option<StaticLocation>, DeviceError> {
    if windows.is_empty() {
        return Ok(None);
    }

    let clusters = cluster_stationary_windows(device_id, windows, config, clusterer)?;
    let n_clusters = clusters.len();
    let Some(canonical) = clusters
        .iter()
        .max_by(|a, b| canonical_order(a, b, config.canonical_policy))
        .cloned()
    else {
        return Ok(None);
    };

    if n_clusters > 1 {
        let discarded: Vec<String> = clusters
            .iter()
            .filter(|c| **c != canonical)
            .map(|c| format!("({:.6}, {:.6}) n_obs={}", c.centroid.lat, c.centroid.lon, c.n_obs))
            .collect();
        log_warn!(
            "Device {} has {} stationary clusters; keeping ({:.6}, {:.6}) n_obs={} by {} and discarding {}",
            device_id,
            n_clusters,
            canonical.centroid.lat,
            canonical.centroid.lon,
            canonical.n_obs,
            config.canonical_policy.as_str(),
            discarded.join(", ")
        );
    }

    Ok(Some(StaticLocation {
        device_id: device_id.to_string(),
        lat_mean: canonical.centroid.lat,
        lon_mean: canonical.centroid.lon,
        loc_error_m: canonical.loc_error_m,
        first_seen: canonical.first_seen,
        last_seen: canonical.last_seen,
        n_obs: canonical.n_obs,
        n_clusters: n_clusters as i64,
        loc_error_flag: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::clustering::Dbscan;
    use crate::classifier::windowing::WindowPoint;

    fn window(start: i64, points: &[(f64, f64, f64)]) -> VisibilityWindow {
        let points: Vec<WindowPoint> = points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon, rssi))| WindowPoint {
                timestamp: start + i as i64 * 10,
                point: GeoPoint::new(lat, lon),
                signal_dbm: rssi,
            })
            .collect();
        VisibilityWindow {
            device_id: "D".to_string(),
            start_time: start,
            end_time: points.last().map_or(start, |p| p.timestamp),
            points,
        }
    }

    #[test]
    fn test_scenario_a_merges_into_one_location() {
        let config = ClassifierConfig::default();
        let windows = vec![
            window(0, &[(1.0, 1.0, -60.0), (1.0005, 1.0005, -60.0)]),
            window(500, &[(1.0, 1.0, -60.0)]),
        ];
        let location = aggregate_device("D1", &windows, &config, &Dbscan::default())
            .unwrap()
            .unwrap();
        assert_eq!(location.n_obs, 3);
        assert_eq!(location.n_clusters, 1);
        assert_eq!(location.first_seen, 0);
        assert_eq!(location.last_seen, 500);
        assert!(location.loc_error_m > 30.0 && location.loc_error_m < 60.0);
        assert!((location.lat_mean - 1.000167).abs() < 1e-5);
    }

    #[test]
    fn test_weighting_follows_signal_strength() {
        let config = ClassifierConfig::default();
        let windows = vec![window(0, &[(0.0, 0.0, -30.0), (0.002, 0.0, -90.0)])];
        let location = aggregate_device("D", &windows, &config, &Dbscan::default())
            .unwrap()
            .unwrap();
        assert!(location.lat_mean < 0.0001);
    }

    #[test]
    fn test_canonical_cluster_has_most_observations() {
        let config = ClassifierConfig::default();
        let windows = vec![
            window(0, &[(0.0, 0.0, -60.0), (0.0, 0.0001, -60.0), (0.0, 0.0, -60.0)]),
            window(1_000, &[(1.0, 1.0, -60.0)]),
        ];
        let location = aggregate_device("D", &windows, &config, &Dbscan::default())
            .unwrap()
            .unwrap();
        assert_eq!(location.n_clusters, 2);
        assert_eq!(location.n_obs, 3);
        assert!(location.lat_mean.abs() < 0.001);
    }

    #[test]
    fn test_tie_goes_to_most_recent() {
        let config = ClassifierConfig::default();
        let windows = vec![
            window(0, &[(0.0, 0.0, -60.0)]),
            window(1_000, &[(1.0, 1.0, -60.0)]),
        ];
        let location = aggregate_device("D", &windows, &config, &Dbscan::default())
            .unwrap()
            .unwrap();
        assert_eq!(location.last_seen, 1_000);
        assert!((location.lat_mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_most_recent_policy() {
        let config = ClassifierConfig {
            canonical_policy: CanonicalPolicy::MostRecent,
            ..ClassifierConfig::default()
        };
        let windows = vec![
            window(0, &[(0.0, 0.0, -60.0), (0.0, 0.0, -60.0), (0.0, 0.0, -60.0)]),
            window(1_000, &[(1.0, 1.0, -60.0)]),
        ];
        let location = aggregate_device("D", &windows, &config, &Dbscan::default())
            .unwrap()
            .unwrap();
        assert_eq!(location.n_obs, 1);
        assert_eq!(location.last_seen, 1_000);
    }

    #[test]
    fn test_noise_windows_become_their_own_clusters() {
        let config = ClassifierConfig::default();
        let windows = vec![
            window(0, &[(0.0, 0.0, -60.0)]),
            window(500, &[(0.0, 0.0001, -60.0)]),
            window(1_000, &[(3.0, 3.0, -60.0)]),
        ];
        let clusters = cluster_stationary_windows("D", &windows, &config, &Dbscan::new(2)).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.iter().map(|c| c.n_obs).sum::<i64>(), 3);
    }

    struct ExtraAssignment;

    impl SpatialClusterer for ExtraAssignment {
        fn cluster(&self, points: &[GeoPoint], _radius_m: f64) -> ClusterAssignments {
            vec![Some(0); points.len() + 1]
        }
    }

    struct FarClusterId;

    impl SpatialClusterer for FarClusterId {
        fn cluster(&self, points: &[GeoPoint], _radius_m: f64) -> ClusterAssignments {
            vec![Some(usize::MAX); points.len()]
        }
    }

    #[test]
    fn test_malformed_clusterer_output_is_device_failure() {
        let config = ClassifierConfig::default();
        let windows = vec![
            window(0, &[(0.0, 0.0, -60.0)]),
            window(1_000, &[(0.0, 0.0, -60.0)]),
        ];

        let err = aggregate_device("D", &windows, &config, &ExtraAssignment).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidClustering { .. }));

        let err = aggregate_device("D", &windows, &config, &FarClusterId).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidClustering { .. }));
    }

    #[test]
    fn test_unusable_signal_is_device_failure() {
        let config = ClassifierConfig::default();
        let windows = vec![window(0, &[(0.0, 0.0, f64::NAN)])];
        let err = aggregate_device("D", &windows, &config, &Dbscan::default()).unwrap_err();
        assert!(matches!(err, DeviceError::ZeroSignalWeight { .. }));
    }

    #[test]
    fn test_no_windows_no_location() {
        let config = ClassifierConfig::default();
        assert!(aggregate_device("D", &[], &config, &Dbscan::default()).unwrap().is_none());
    }
}
