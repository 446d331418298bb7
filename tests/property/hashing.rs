// Copyright (c) 2025 - Riverwatch Project
//! Property-Based Tests for Content Hashing and Priority
//!
//! The content hash must be invariant under member reordering, and the
//! priority must be a pure function of the cluster's anomalies.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;

use riverwatch::compose::{priority_for, PriorityFractions};
use riverwatch::domain::{content_hash, Anomaly, Centroid, Cluster, Priority, Reading, ReadingLocation, Source, SourceKind};

fn make_anomaly(index: usize, offset_secs: i64, value: f64) -> Anomaly {
    let base = Utc.with_ymd_and_hms(2026, 1, 19, 0, 0, 0).unwrap();
    Anomaly {
        reading: Reading {
            source: Source::Flood,
            station_id: format!("station-{}", index),
            parameter: "level".to_string(),
            value,
            timestamp: base + ChronoDuration::seconds(offset_secs),
            location: Some(ReadingLocation {
                lat: 51.1,
                lon: -2.85,
                easting: None,
                northing: None,
                label: format!("station-{}", index),
            }),
        },
        threshold: 3.0,
        exceedance: (value - 3.0) / 3.0,
    }
}

fn arb_members() -> impl Strategy<Value = Vec<Anomaly>> {
    prop::collection::vec((0i64..86_400, 3.01f64..10.0), 1..20).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (secs, value))| make_anomaly(i, secs, value))
            .collect()
    })
}

fn arb_members_and_permutation() -> impl Strategy<Value = (Vec<Anomaly>, Vec<Anomaly>)> {
    arb_members().prop_flat_map(|members| {
        let original = members.clone();
        (Just(original), Just(members).prop_shuffle())
    })
}

fn cluster_of(members: Vec<Anomaly>) -> Cluster {
    let window_start = members.iter().map(|m| m.reading.timestamp).min().unwrap();
    let window_end = members.iter().map(|m| m.reading.timestamp).max().unwrap();
    Cluster {
        members,
        centroid: Centroid {
            lat: 51.1,
            lon: -2.85,
            easting: None,
            northing: None,
        },
        source_kind: SourceKind::Flood,
        window_start,
        window_end,
    }
}

proptest! {
    #[test]
    fn content_hash_is_invariant_under_member_order(
        (original, shuffled) in arb_members_and_permutation()
    ) {
        let a = content_hash(SourceKind::Flood, Priority::Medium, &original);
        let b = content_hash(SourceKind::Flood, Priority::Medium, &shuffled);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn content_hash_distinguishes_source_kinds(members in arb_members()) {
        let flood = content_hash(SourceKind::Flood, Priority::Medium, &members);
        let mixed = content_hash(SourceKind::Mixed, Priority::Medium, &members);
        prop_assert_ne!(flood, mixed);
    }

    #[test]
    fn priority_is_pure_and_order_independent(
        (original, shuffled) in arb_members_and_permutation()
    ) {
        let fractions = PriorityFractions::default();
        let a = priority_for(&cluster_of(original), &fractions);
        let b = priority_for(&cluster_of(shuffled), &fractions);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn priority_matches_worst_exceedance(members in arb_members()) {
        let fractions = PriorityFractions::default();
        let worst = members
            .iter()
            .map(|m| m.exceedance.abs())
            .fold(0.0f64, f64::max);
        let expected = if worst >= fractions.high {
            Priority::High
        } else if worst >= fractions.medium {
            Priority::Medium
        } else {
            Priority::Low
        };
        prop_assert_eq!(priority_for(&cluster_of(members), &fractions), expected);
    }
}
