// Copyright (c) 2025 - Riverwatch Project
//! Run log persistence
//!
//! One write per cycle. Recording must never fail the cycle: the
//! orchestrator logs a recording failure and moves on.

use async_trait::async_trait;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Collection, Database, IndexModel};

use crate::domain::AgentRunLog;
use crate::errors::{PipelineError, PipelineResult};

/// Captures per-cycle metrics
#[async_trait]
pub trait RunLogStore: Send + Sync {
    async fn record(&self, log: &AgentRunLog) -> PipelineResult<()>;
}

/// MongoDB-backed run log store
pub struct MongoRunLogStore {
    collection: Collection<Document>,
}

impl MongoRunLogStore {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection("run_logs"),
        }
    }

    /// Create the dashboard's listing index. Idempotent.
    pub async fn initialize(&self) -> PipelineResult<()> {
        let listing = IndexModel::builder()
            .keys(doc! { "started_at": -1 })
            .build();
        self.collection.create_index(listing).await?;
        Ok(())
    }
}

#[async_trait]
impl RunLogStore for MongoRunLogStore {
    async fn record(&self, log: &AgentRunLog) -> PipelineResult<()> {
        let mut document =
            bson::to_document(log).map_err(|e| PipelineError::Serialization(e.to_string()))?;
        document.insert(
            "started_at",
            Bson::DateTime(bson::DateTime::from_chrono(log.started_at)),
        );
        self.collection.insert_one(document).await?;
        Ok(())
    }
}
