//! Density-based grouping of stationary window centroids.
//!
//! The aggregator only depends on [`SpatialClusterer`]; [`Dbscan`] is the
//! implementation the pipeline uses by default.

use std::collections::VecDeque;

use crate::utils::geo::{haversine_m, GeoPoint};

/// Cluster id per input point, `None` for noise.
pub type ClusterAssignments = Vec<Option<usize>>;

/// Given points and a radius, assign each point to a cluster.
///
/// Implementations must be deterministic for a given input order and must
/// number clusters densely from zero.
pub trait SpatialClusterer: Send + Sync {
    fn cluster(&self, points: &[GeoPoint], radius_m: f64) -> ClusterAssignments;
}

/// DBSCAN over haversine distance.
///
/// With `min_points == 1` every point is a core point and clusters are the
/// connected components of the "within radius" graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dbscan {
    pub min_points: usize,
}

impl Default for Dbscan {
    fn default() -> Self {
        Self { min_points: 1 }
    }
}

impl Dbscan {
    pub fn new(min_points: usize) -> Self {
        Self {
            min_points: min_points.max(1),
        }
    }

    /// Indices within `radius_m` of `points[idx]`, the point itself included.
    fn region_query(points: &[GeoPoint], idx: usize, radius_m: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| haversine_m(points[idx], **p) <= radius_m)
            .map(|(j, _)| j)
            .collect()
    }
}

impl SpatialClusterer for Dbscan {
    fn cluster(&self, points: &[GeoPoint], radius_m: f64) -> ClusterAssignments {
        let mut assignments: ClusterAssignments = vec![None; points.len()];
        let mut visited = vec![false; points.len()];
        let mut next_cluster = 0;

        for idx in 0..points.len() {
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            let neighbours = Self::region_query(points, idx, radius_m);
            if neighbours.len() < self.min_points {
                // Noise for now; a later core point may still claim it.
                continue;
            }

            let cluster = next_cluster;
            next_cluster += 1;
            assignments[idx] = Some(cluster);

            let mut queue: VecDeque<usize> = neighbours.into_iter().collect();
            while let Some(j) = queue.pop_front() {
                if assignments[j].is_none() {
                    assignments[j] = Some(cluster);
                }
                if visited[j] {
                    continue;
                }
                visited[j] = true;

                let expansion = Self::region_query(points, j, radius_m);
                if expansion.len() >= self.min_points {
                    queue.extend(expansion);
                }
            }
        }

        assignments
    }
}
