// Copyright (c) 2025 - Riverwatch Project
//! Incident document store with deduplication
//!
//! The dedup contract: two incidents with equal `content_hash` whose
//! `created_at` fall within the dedup window must not both persist; the
//! second occurrence reports the original's id. The check and insert are
//! serialised behind one async lock; cycles never overlap, so contention
//! is limited to the fan-in within a single cycle.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Incident;
use crate::errors::{PipelineError, PipelineResult};

/// Result of a conditional store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOutcome {
    /// Whether a new document was written
    pub stored: bool,
    /// The id now representing this content: the incident's own id when
    /// stored, the pre-existing incident's id when deduplicated
    pub effective_id: Uuid,
}

/// Durable incident store
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Write the incident unless an equal-content incident exists within
    /// the dedup window.
    async fn store_if_new(&self, incident: &Incident) -> PipelineResult<StoreOutcome>;

    /// Incidents created at or after `since`, newest first. Dashboard
    /// support; not on the hot path.
    async fn recent(&self, since: DateTime<Utc>) -> PipelineResult<Vec<Incident>>;
}

/// MongoDB-backed incident store
pub struct MongoIncidentStore {
    database: Database,
    collection: Collection<Document>,
    dedup_window: ChronoDuration,
    write_lock: Mutex<()>,
}

impl MongoIncidentStore {
    pub fn new(database: &Database, dedup_window_hours: i64) -> Self {
        Self {
            database: database.clone(),
            collection: database.collection("incidents"),
            dedup_window: ChronoDuration::hours(dedup_window_hours),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the dedup and retention indexes. Idempotent.
    pub async fn initialize(&self) -> PipelineResult<()> {
        let dedup = IndexModel::builder()
            .keys(doc! { "content_hash": 1, "created_at": -1 })
            .options(IndexOptions::builder().name("content_hash_window".to_string()).build())
            .build();
        let retention = IndexModel::builder()
            .keys(doc! { "created_at": -1 })
            .build();
        self.collection.create_index(dedup).await?;
        self.collection.create_index(retention).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> PipelineResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

/// Serialise an incident, swapping `created_at` for a native BSON date so
/// the dedup window query can range over it
fn incident_to_document(incident: &Incident) -> PipelineResult<Document> {
    let mut document = bson::to_document(incident)
        .map_err(|e| PipelineError::Serialization(e.to_string()))?;
    document.insert(
        "created_at",
        Bson::DateTime(bson::DateTime::from_chrono(incident.created_at)),
    );
    Ok(document)
}

fn incident_from_document(mut document: Document) -> PipelineResult<Incident> {
    document.remove("_id");
    if let Some(Bson::DateTime(dt)) = document.get("created_at") {
        let rfc3339 = dt
            .to_chrono()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        document.insert("created_at", rfc3339);
    }
    bson::from_document(document).map_err(|e| PipelineError::Serialization(e.to_string()))
}

#[async_trait]
impl IncidentStore for MongoIncidentStore {
    async fn store_if_new(&self, incident: &Incident) -> PipelineResult<StoreOutcome> {
        let _guard = self.write_lock.lock().await;

        let window_start = incident.created_at - self.dedup_window;
        let filter = doc! {
            "content_hash": &incident.content_hash,
            "created_at": { "$gte": Bson::DateTime(bson::DateTime::from_chrono(window_start)) },
        };

        if let Some(existing) = self.collection.find_one(filter).await? {
            let existing_id = existing
                .get_str("incident_id")
                .ok()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| {
                    PipelineError::Serialization(
                        "stored incident has no parseable incident_id".to_string(),
                    )
                })?;
            debug!(
                content_hash = %incident.content_hash,
                existing_id = %existing_id,
                "duplicate incident suppressed"
            );
            return Ok(StoreOutcome {
                stored: false,
                effective_id: existing_id,
            });
        }

        self.collection
            .insert_one(incident_to_document(incident)?)
            .await?;
        debug!(incident_id = %incident.incident_id, "incident stored");

        Ok(StoreOutcome {
            stored: true,
            effective_id: incident.incident_id,
        })
    }

    async fn recent(&self, since: DateTime<Utc>) -> PipelineResult<Vec<Incident>> {
        let filter = doc! {
            "created_at": { "$gte": Bson::DateTime(bson::DateTime::from_chrono(since)) },
        };
        let mut cursor = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?;

        let mut incidents = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            incidents.push(incident_from_document(document)?);
        }
        Ok(incidents)
    }
}
