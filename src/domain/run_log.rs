// Copyright (c) 2025 - Riverwatch Project
//! Per-cycle run log
//!
//! One [`AgentRunLog`] is written per cycle, successful or not. It is the
//! user-visible failure surface: stage errors land here, never as aborted
//! cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::station::Source;

/// Pipeline stage an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Flood,
    Hydrology,
    Rainfall,
    Permits,
    Embedding,
    Similarity,
    DocumentStore,
    GraphStore,
    RunLog,
    Cycle,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Flood => "flood",
            Stage::Hydrology => "hydrology",
            Stage::Rainfall => "rainfall",
            Stage::Permits => "permits",
            Stage::Embedding => "embedding",
            Stage::Similarity => "similarity",
            Stage::DocumentStore => "document_store",
            Stage::GraphStore => "graph_store",
            Stage::RunLog => "run_log",
            Stage::Cycle => "cycle",
        }
    }

    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Flood => Stage::Flood,
            Source::Hydrology => Stage::Hydrology,
            Source::Rainfall => Stage::Rainfall,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured stage failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Readings fetched per upstream source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingCounts {
    pub flood: u64,
    pub hydrology: u64,
    pub rainfall: u64,
}

impl ReadingCounts {
    pub fn record(&mut self, source: Source, count: u64) {
        match source {
            Source::Flood => self.flood = count,
            Source::Hydrology => self.hydrology = count,
            Source::Rainfall => self.rainfall = count,
        }
    }

    pub fn total(&self) -> u64 {
        self.flood + self.hydrology + self.rainfall
    }
}

/// Per-cluster summary carried in the run log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterBreakdown {
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub station_count: u64,
}

/// Similarity-search statistics across the cycle's persisted incidents
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityStats {
    pub searches: u64,
    pub avg_score: Option<f64>,
    pub best_score: Option<f64>,
}

/// Successful writes per downstream store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreWrites {
    pub document: u64,
    pub vector: u64,
    pub graph: u64,
}

/// External API calls issued during the cycle, counted per attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCallCounts {
    pub flood: u64,
    pub hydrology: u64,
    pub rainfall: u64,
    pub permits: u64,
    pub geocode: u64,
    pub embedding: u64,
}

/// Durable record of one pipeline cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub stations_fetched: u64,
    pub readings_fetched: ReadingCounts,
    pub clusters_found: u64,
    pub clusters: Vec<ClusterBreakdown>,
    pub similarity: SimilarityStats,
    pub incidents_created: u64,
    pub incidents_duplicate: u64,
    pub incident_ids_created: Vec<Uuid>,
    pub incident_ids_duplicate: Vec<Uuid>,
    pub store_writes: StoreWrites,
    pub errors: Vec<StageError>,
    pub api_calls: ApiCallCounts,
}

impl AgentRunLog {
    /// Zeroed log for a cycle that just started
    pub fn started(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            duration_seconds: 0.0,
            stations_fetched: 0,
            readings_fetched: ReadingCounts::default(),
            clusters_found: 0,
            clusters: Vec::new(),
            similarity: SimilarityStats::default(),
            incidents_created: 0,
            incidents_duplicate: 0,
            incident_ids_created: Vec::new(),
            incident_ids_duplicate: Vec::new(),
            store_writes: StoreWrites::default(),
            errors: Vec::new(),
            api_calls: ApiCallCounts::default(),
        }
    }

    pub fn push_error(&mut self, stage: Stage, message: impl Into<String>) {
        self.errors.push(StageError {
            stage,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::DocumentStore).unwrap(),
            "\"document_store\""
        );
        assert_eq!(serde_json::to_string(&Stage::Hydrology).unwrap(), "\"hydrology\"");
    }

    #[test]
    fn started_log_is_all_zeros() {
        let log = AgentRunLog::started(Uuid::now_v7(), Utc::now());
        assert_eq!(log.readings_fetched.total(), 0);
        assert_eq!(log.clusters_found, 0);
        assert_eq!(log.incidents_created, 0);
        assert!(log.errors.is_empty());
    }

    #[test]
    fn reading_counts_record_per_source() {
        let mut counts = ReadingCounts::default();
        counts.record(Source::Flood, 12);
        counts.record(Source::Rainfall, 30);
        assert_eq!(counts.total(), 42);
    }
}
