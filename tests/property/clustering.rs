// Copyright (c) 2025 - Riverwatch Project
//! Property-Based Tests for Clustering
//!
//! Verifies the clustering invariants relied on downstream: pairwise
//! distance bound, disjointness, temporal window membership and the minimum
//! cluster size, for arbitrary anomaly batches.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;

use riverwatch::cluster::Clusterer;
use riverwatch::domain::{Anomaly, Reading, ReadingLocation, Source};
use riverwatch::geo::great_circle_km;

const RADIUS_KM: f64 = 10.0;
const WINDOW_HOURS: i64 = 24;
const MIN_CLUSTER_SIZE: usize = 2;

fn make_anomaly(index: usize, lat: f64, lon: f64, offset_secs: i64, value: f64) -> Anomaly {
    let base = Utc.with_ymd_and_hms(2026, 1, 19, 0, 0, 0).unwrap();
    Anomaly {
        reading: Reading {
            source: if index % 2 == 0 {
                Source::Flood
            } else {
                Source::Hydrology
            },
            station_id: format!("station-{}", index),
            parameter: "level".to_string(),
            value,
            timestamp: base + ChronoDuration::seconds(offset_secs),
            location: Some(ReadingLocation {
                lat,
                lon,
                easting: None,
                northing: None,
                label: format!("station-{}", index),
            }),
        },
        threshold: 3.0,
        exceedance: (value - 3.0) / 3.0,
    }
}

/// Arbitrary anomaly batches over a ~500x350 km region and a 48h span,
/// with unique station ids
fn arb_anomalies() -> impl Strategy<Value = Vec<Anomaly>> {
    prop::collection::vec(
        (
            50.0..55.0f64,
            -5.0..0.0f64,
            0i64..(48 * 3600),
            3.01f64..10.0,
        ),
        0..40,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (lat, lon, secs, value))| make_anomaly(i, lat, lon, secs, value))
            .collect()
    })
}

proptest! {
    #[test]
    fn pairwise_distance_is_bounded_by_twice_the_radius(anomalies in arb_anomalies()) {
        let clusterer = Clusterer::new(RADIUS_KM, WINDOW_HOURS, MIN_CLUSTER_SIZE);
        for cluster in clusterer.cluster(&anomalies) {
            for a in &cluster.members {
                for b in &cluster.members {
                    let la = a.reading.location.as_ref().unwrap();
                    let lb = b.reading.location.as_ref().unwrap();
                    let distance = great_circle_km(la.lat, la.lon, lb.lat, lb.lon);
                    prop_assert!(
                        distance <= 2.0 * RADIUS_KM + 1e-6,
                        "pairwise distance {} exceeds single-linkage bound",
                        distance
                    );
                }
            }
        }
    }

    #[test]
    fn every_anomaly_lands_in_at_most_one_cluster(anomalies in arb_anomalies()) {
        let clusterer = Clusterer::new(RADIUS_KM, WINDOW_HOURS, MIN_CLUSTER_SIZE);
        let mut seen = std::collections::HashSet::new();
        for cluster in clusterer.cluster(&anomalies) {
            for member in &cluster.members {
                prop_assert!(
                    seen.insert(member.reading.station_id.clone()),
                    "station {} appears in two clusters",
                    member.reading.station_id
                );
            }
        }
    }

    #[test]
    fn members_lie_within_the_temporal_window(anomalies in arb_anomalies()) {
        let clusterer = Clusterer::new(RADIUS_KM, WINDOW_HOURS, MIN_CLUSTER_SIZE);
        let window = ChronoDuration::hours(WINDOW_HOURS);
        for cluster in clusterer.cluster(&anomalies) {
            let newest = cluster
                .members
                .iter()
                .map(|m| m.reading.timestamp)
                .max()
                .unwrap();
            for member in &cluster.members {
                prop_assert!(newest - member.reading.timestamp <= window);
            }
        }
    }

    #[test]
    fn clusters_meet_the_minimum_size(anomalies in arb_anomalies()) {
        let clusterer = Clusterer::new(RADIUS_KM, WINDOW_HOURS, MIN_CLUSTER_SIZE);
        for cluster in clusterer.cluster(&anomalies) {
            prop_assert!(cluster.members.len() >= MIN_CLUSTER_SIZE);
        }
    }

    #[test]
    fn centroid_lies_inside_the_members_bounding_box(anomalies in arb_anomalies()) {
        let clusterer = Clusterer::new(RADIUS_KM, WINDOW_HOURS, MIN_CLUSTER_SIZE);
        for cluster in clusterer.cluster(&anomalies) {
            let lats: Vec<f64> = cluster
                .members
                .iter()
                .map(|m| m.reading.location.as_ref().unwrap().lat)
                .collect();
            let lons: Vec<f64> = cluster
                .members
                .iter()
                .map(|m| m.reading.location.as_ref().unwrap().lon)
                .collect();
            let min_lat = lats.iter().copied().fold(f64::INFINITY, f64::min);
            let max_lat = lats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min_lon = lons.iter().copied().fold(f64::INFINITY, f64::min);
            let max_lon = lons.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(cluster.centroid.lat >= min_lat - 1e-9);
            prop_assert!(cluster.centroid.lat <= max_lat + 1e-9);
            prop_assert!(cluster.centroid.lon >= min_lon - 1e-9);
            prop_assert!(cluster.centroid.lon <= max_lon + 1e-9);
        }
    }
}
