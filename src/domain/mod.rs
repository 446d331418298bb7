// Copyright (c) 2025 - Riverwatch Project
//! Telemetry Domain Models
//!
//! Core domain concepts for the detection-to-persistence pipeline. Every
//! stage boundary exchanges these explicit record types; nothing loosely
//! typed flows between stages.
//!
//! # Values flowing through a cycle
//!
//! - [`Station`] - monitoring station metadata, read-only within the core
//! - [`Reading`] - one measurement, carrying its station's geometry
//! - [`Anomaly`] - a reading that exceeded its detection threshold
//! - [`Cluster`] - anomalies grouped by spatial and temporal proximity
//! - [`Permit`] - regulatory-permit context near a cluster centroid
//! - [`RainfallSummary`] - rainfall aggregated around a centroid
//!
//! # Persisted records
//!
//! - [`Incident`] - the unit of work written to all three stores
//! - [`AgentRunLog`] - one durable record per cycle

pub mod cluster;
pub mod incident;
pub mod permit;
pub mod rainfall;
pub mod reading;
pub mod run_log;
pub mod station;

// Re-export the domain vocabulary
pub use cluster::{Centroid, Cluster, SourceKind};
pub use incident::{content_hash, Incident, Priority};
pub use permit::{Permit, PermitCategory};
pub use rainfall::{RainfallCategory, RainfallSummary};
pub use reading::{Anomaly, Reading, ReadingLocation};
pub use run_log::{
    AgentRunLog, ApiCallCounts, ClusterBreakdown, ReadingCounts, SimilarityStats, Stage,
    StageError, StoreWrites,
};
pub use station::{Source, Station};
