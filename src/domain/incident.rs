// Copyright (c) 2025 - Riverwatch Project
//! Incidents: the persisted unit of work
//!
//! An incident has two identities: `incident_id`, a fresh UUID minted at
//! composition time, and `content_hash`, a SHA-256 fingerprint of the
//! cluster's essential anomaly tuple used for deduplication. Two incidents
//! with the same content hash inside the dedup window are the same event.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use super::cluster::{Centroid, SourceKind};
use super::permit::Permit;
use super::rainfall::RainfallSummary;
use super::reading::{Anomaly, Reading};

/// Incident priority, derived deterministically from the cluster alone
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted record derived from one cluster plus its enrichments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: Uuid,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub priority: Priority,
    pub source_kind: SourceKind,
    pub centroid: Centroid,
    pub summary_text: String,
    pub suggested_actions: Vec<String>,
    pub readings: Vec<Reading>,
    pub permits: Vec<Permit>,
    pub rainfall: RainfallSummary,
    pub run_id: Uuid,
}

/// SHA-256 fingerprint of a cluster's essential anomaly tuple.
///
/// Hashes the UTF-8 bytes of
/// `source_kind | priority | sorted((station_id, iso_timestamp, parameter, round(value, 3)))`.
/// Member order and field mutations below millimetre precision do not change
/// the hash; priority and source kind do.
pub fn content_hash(source_kind: SourceKind, priority: Priority, anomalies: &[Anomaly]) -> String {
    let mut tuples: Vec<String> = anomalies
        .iter()
        .map(|a| {
            format!(
                "({},{},{},{:.3})",
                a.reading.station_id,
                a.reading
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                a.reading.parameter,
                a.reading.value,
            )
        })
        .collect();
    tuples.sort();

    let canonical = format!("{}|{}|{}", source_kind, priority, tuples.join(";"));
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}
