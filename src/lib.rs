//! Environmental telemetry incident pipeline
//!
//! This library ingests environmental telemetry (river level, flow,
//! rainfall) from public HTTP APIs, detects anomalous readings, groups them
//! into localized incidents, enriches each incident with regulatory-permit
//! context and rainfall correlation, and persists the result into three
//! cooperating stores.
//!
//! # Architecture
//!
//! One scheduled cycle is a discrete snapshot:
//!
//! ```text
//! Fetchers ──→ Detector ──→ Clusterer ──→ Enrichment ──→ Composer
//!                                                           │
//!                    Document store ←── store_if_new ←──────┘
//!                      (commit point)        │
//!                              ┌─────────────┴─────────────┐
//!                        Vector index                 Graph store
//!                       (best effort,                (best effort,
//!                        idempotent)                  idempotent)
//! ```
//!
//! # Modules
//!
//! - [`domain`] - typed records exchanged between stages
//! - [`fetch`] - upstream readings fetchers with retry
//! - [`detect`] - anomaly classification
//! - [`cluster`] - spatial/temporal clustering
//! - [`enrich`] - permit search and rainfall correlation
//! - [`compose`] - incident composition and summarisation
//! - [`stores`] - document, vector and graph store adapters
//! - [`orchestrator`] - the per-cycle state machine and scheduler
//! - [`errors`] - error types
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use riverwatch::stores::{connect_mongo, MongoConfig, MongoStationDirectory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = connect_mongo(&MongoConfig::default()).await?;
//!     let stations = MongoStationDirectory::new(&database);
//!
//!     // Wire fetchers, stores and the orchestrator...
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod cluster;
pub mod compose;
pub mod config;
pub mod detect;
pub mod domain;
pub mod enrich;
pub mod errors;
pub mod fetch;
pub mod geo;
pub mod metrics;
pub mod orchestrator;
pub mod stores;

// Re-export commonly used types
pub use cluster::Clusterer;
pub use compose::{IncidentComposer, PriorityFractions, Summariser, TemplateSummariser};
pub use config::PipelineConfig;
pub use detect::{AnomalyDetector, AnomalyThresholds, ThresholdDetector};
pub use domain::{
    AgentRunLog, Anomaly, Cluster, Incident, Permit, Priority, RainfallSummary, Reading, Source,
    SourceKind, Station,
};
pub use enrich::{PermitSearcher, RainfallCorrelator};
pub use errors::{PipelineError, PipelineResult};
pub use fetch::{LatestReadingsFetcher, ReadingFetcher, RetryPolicy};
pub use metrics::ApiCallCounters;
pub use orchestrator::CycleOrchestrator;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
