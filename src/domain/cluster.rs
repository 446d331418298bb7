// Copyright (c) 2025 - Riverwatch Project
//! Clusters of anomalous readings
//!
//! Clusters are values flowing through the pipeline; they have no persistent
//! identity. Membership invariants (pairwise distance, temporal window) are
//! established by the clusterer and relied on downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::reading::Anomaly;
use super::station::Source;

/// Classification of a cluster (and the incident derived from it) by the
/// sources of its member readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Flood,
    Hydrology,
    Mixed,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Flood => "flood",
            SourceKind::Hydrology => "hydrology",
            SourceKind::Mixed => "mixed",
        }
    }

    /// Derive the kind from member sources; `Mixed` unless uniform
    pub fn from_sources<I: IntoIterator<Item = Source>>(sources: I) -> Self {
        let mut kind = None;
        for source in sources {
            let this = match source {
                Source::Flood => SourceKind::Flood,
                Source::Hydrology => SourceKind::Hydrology,
                // Rainfall readings bypass detection and never form clusters
                Source::Rainfall => return SourceKind::Mixed,
            };
            match kind {
                None => kind = Some(this),
                Some(k) if k != this => return SourceKind::Mixed,
                Some(_) => {}
            }
        }
        kind.unwrap_or(SourceKind::Mixed)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster centroid: arithmetic mean of member coordinates
///
/// Easting/northing are averaged over the members that carry them; absent
/// when no member does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
    pub easting: Option<f64>,
    pub northing: Option<f64>,
}

/// A non-empty set of anomalies passing the spatial and temporal predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub members: Vec<Anomaly>,
    pub centroid: Centroid,
    pub source_kind: SourceKind,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl Cluster {
    /// Distinct station ids across members, sorted
    pub fn station_ids(&self) -> BTreeSet<&str> {
        self.members
            .iter()
            .map(|a| a.reading.station_id.as_str())
            .collect()
    }

    pub fn peak_value(&self) -> f64 {
        self.members
            .iter()
            .map(|a| a.reading.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean_value(&self) -> f64 {
        let sum: f64 = self.members.iter().map(|a| a.reading.value).sum();
        sum / self.members.len() as f64
    }

    /// Largest exceedance fraction across members
    pub fn max_exceedance(&self) -> f64 {
        self.members
            .iter()
            .map(|a| a.exceedance.abs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_flood_members_yield_flood_kind() {
        let kind = SourceKind::from_sources([Source::Flood, Source::Flood]);
        assert_eq!(kind, SourceKind::Flood);
    }

    #[test]
    fn mixed_members_yield_mixed_kind() {
        let kind = SourceKind::from_sources([Source::Flood, Source::Hydrology]);
        assert_eq!(kind, SourceKind::Mixed);
    }

    #[test]
    fn source_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceKind::Mixed).unwrap(),
            "\"mixed\""
        );
    }
}
