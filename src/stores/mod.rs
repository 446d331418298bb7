// Copyright (c) 2025 - Riverwatch Project
//! Store adapters
//!
//! Three cooperating stores with different durability and identity
//! semantics:
//!
//! - **Document store** (MongoDB): incidents and run logs. The incident
//!   insert is the commit point for a cluster.
//! - **Vector index** (PostgreSQL + pgvector): one embedding per incident,
//!   keyed by incident id, cosine metric.
//! - **Graph store** (Neo4j): incident / station / permit relationship view.
//!
//! Vector and graph writes are best-effort with idempotent replay; a failed
//! write is recorded as a stage error and re-attempting on a later cycle is
//! harmless because every write is keyed by incident id.

pub mod graph;
pub mod incidents;
pub mod run_logs;
pub mod similarity;
pub mod stations;

use crate::errors::PipelineResult;

pub use graph::{GraphConfig, GraphStore, Neo4jGraphStore};
pub use incidents::{IncidentStore, MongoIncidentStore, StoreOutcome};
pub use run_logs::{MongoRunLogStore, RunLogStore};
pub use similarity::{
    EmbeddingClient, EmbeddingConfig, HttpEmbeddingClient, PgSimilarityIndex, SimilarHit,
    SimilarityIndex,
};
pub use stations::{MongoStationDirectory, StationDirectory};

/// Connection configuration for the document store
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection string, e.g. "mongodb://localhost:27017"
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "riverwatch".to_string(),
        }
    }
}

/// Connect to the document store and select the configured database
pub async fn connect_mongo(config: &MongoConfig) -> PipelineResult<mongodb::Database> {
    let client = mongodb::Client::with_uri_str(&config.uri).await?;
    Ok(client.database(&config.database))
}
