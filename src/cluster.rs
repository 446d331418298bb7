// Copyright (c) 2025 - Riverwatch Project
//! Spatial/temporal clustering of anomalies
//!
//! Agglomerative single-linkage on great-circle proximity: anomalies are
//! visited in input order; each unassigned anomaly seeds a cluster and
//! greedily absorbs every other unassigned anomaly within the spatial
//! radius of the seed. The temporal window is anchored at the newest
//! reading in the batch, which keeps clustering deterministic with respect
//! to its input.
//!
//! Invariants established here and relied on downstream:
//!
//! 1. every pairwise distance within a cluster is at most twice the spatial
//!    radius (single-linkage bound through the seed)
//! 2. clusters are disjoint
//! 3. every member's timestamp is within the temporal window of the newest
//!    member

use chrono::Duration as ChronoDuration;
use tracing::debug;

use crate::domain::{Anomaly, Centroid, Cluster, SourceKind};
use crate::geo::great_circle_km;

/// Groups anomalies into localized clusters
#[derive(Debug, Clone)]
pub struct Clusterer {
    spatial_radius_km: f64,
    temporal_window: ChronoDuration,
    min_cluster_size: usize,
}

impl Clusterer {
    pub fn new(spatial_radius_km: f64, temporal_window_hours: i64, min_cluster_size: usize) -> Self {
        Self {
            spatial_radius_km,
            temporal_window: ChronoDuration::hours(temporal_window_hours),
            min_cluster_size,
        }
    }

    /// Cluster anomalies; ties broken by input order.
    ///
    /// Clusters smaller than `min_cluster_size` are discarded, and their
    /// members do not re-enter later clusters.
    pub fn cluster(&self, anomalies: &[Anomaly]) -> Vec<Cluster> {
        let Some(newest) = anomalies.iter().map(|a| a.reading.timestamp).max() else {
            return Vec::new();
        };
        let cutoff = newest - self.temporal_window;

        // Anomalies without coordinates cannot be clustered; the detector
        // already drops them, this keeps the invariant local.
        let eligible: Vec<(&Anomaly, f64, f64)> = anomalies
            .iter()
            .filter(|a| a.reading.timestamp >= cutoff)
            .filter_map(|a| {
                a.reading
                    .location
                    .as_ref()
                    .map(|loc| (a, loc.lat, loc.lon))
            })
            .collect();

        let mut assigned = vec![false; eligible.len()];
        let mut clusters = Vec::new();

        for i in 0..eligible.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let (seed, seed_lat, seed_lon) = eligible[i];
            let mut members = vec![seed.clone()];

            for j in (i + 1)..eligible.len() {
                if assigned[j] {
                    continue;
                }
                let (candidate, lat, lon) = eligible[j];
                // Inclusive bound: exactly at the radius joins the cluster
                if great_circle_km(seed_lat, seed_lon, lat, lon) <= self.spatial_radius_km {
                    assigned[j] = true;
                    members.push(candidate.clone());
                }
            }

            if members.len() >= self.min_cluster_size {
                clusters.push(build_cluster(members));
            }
        }

        debug!(
            anomalies = anomalies.len(),
            clusters = clusters.len(),
            "clustered anomalies"
        );
        clusters
    }
}

fn build_cluster(members: Vec<Anomaly>) -> Cluster {
    let n = members.len() as f64;
    let lat = members
        .iter()
        .filter_map(|a| a.reading.location.as_ref())
        .map(|l| l.lat)
        .sum::<f64>()
        / n;
    let lon = members
        .iter()
        .filter_map(|a| a.reading.location.as_ref())
        .map(|l| l.lon)
        .sum::<f64>()
        / n;

    let eastings: Vec<f64> = members
        .iter()
        .filter_map(|a| a.reading.location.as_ref())
        .filter_map(|l| l.easting)
        .collect();
    let northings: Vec<f64> = members
        .iter()
        .filter_map(|a| a.reading.location.as_ref())
        .filter_map(|l| l.northing)
        .collect();
    let easting = (!eastings.is_empty())
        .then(|| eastings.iter().sum::<f64>() / eastings.len() as f64);
    let northing = (!northings.is_empty())
        .then(|| northings.iter().sum::<f64>() / northings.len() as f64);

    let window_start = members
        .iter()
        .map(|a| a.reading.timestamp)
        .min()
        .expect("cluster members are non-empty");
    let window_end = members
        .iter()
        .map(|a| a.reading.timestamp)
        .max()
        .expect("cluster members are non-empty");

    let source_kind = SourceKind::from_sources(members.iter().map(|a| a.reading.source));

    Cluster {
        members,
        centroid: Centroid {
            lat,
            lon,
            easting,
            northing,
        },
        source_kind,
        window_start,
        window_end,
    }
}
