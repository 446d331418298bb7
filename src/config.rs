// Copyright (c) 2025 - Riverwatch Project
//! Pipeline tuning knobs
//!
//! Connection-level configuration (URLs, credentials, timeouts) lives next to
//! the component it configures; this module holds the cross-cutting knobs the
//! orchestrator threads through the cycle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cross-cutting pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Interval between cycle starts
    #[serde(with = "duration_secs")]
    pub schedule_interval: Duration,

    /// Wall-clock budget for one cycle
    #[serde(with = "duration_secs")]
    pub cycle_deadline: Duration,

    /// Spatial clustering radius (km, inclusive bound)
    pub spatial_radius_km: f64,

    /// Temporal clustering window, anchored at the newest reading
    pub temporal_window_hours: i64,

    /// Minimum anomalies per retained cluster
    pub min_cluster_size: usize,

    /// Permit search radius around a cluster centroid (km)
    pub permit_search_radius_km: f64,

    /// Rainfall correlation radius around a cluster centroid (km)
    pub rainfall_radius_km: f64,

    /// Rainfall correlation window, anchored at cycle start
    pub rainfall_window_hours: i64,

    /// Two incidents with equal content_hash within this window are the same event
    pub dedup_window_hours: i64,

    /// Maximum clusters enriched concurrently
    pub max_cluster_fanout: usize,

    /// Neighbour count for the similarity search at persist time
    pub similarity_k: usize,

    /// Minimum cosine similarity for a neighbour to count
    pub similarity_min_score: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schedule_interval: Duration::from_secs(7200),
            cycle_deadline: Duration::from_secs(600),
            spatial_radius_km: 10.0,
            temporal_window_hours: 24,
            min_cluster_size: 2,
            permit_search_radius_km: 1.0,
            rainfall_radius_km: 10.0,
            rainfall_window_hours: 24,
            dedup_window_hours: 24,
            max_cluster_fanout: 8,
            similarity_k: 5,
            similarity_min_score: 0.75,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
