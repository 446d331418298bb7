// Copyright (c) 2025 - Riverwatch Project
//! Neo4j relationship view
//!
//! Projects incidents into a property graph:
//!
//! ```text
//! (Incident)-[:MEASURED_AT]->(Station)
//! (Incident)-[:NEAR_PERMIT {distance_km}]->(Permit)
//! (Incident)-[:SIMILAR_TO {score}]->(Incident)
//! ```
//!
//! All writes use MERGE semantics keyed by the stable identities
//! (incident_id, (source, station_id), permit_id); node properties are set
//! on create only, so replaying an ingest never overwrites existing nodes.

use async_trait::async_trait;
use neo4rs::{Graph, Query};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Incident, ReadingLocation, Source};
use crate::errors::{PipelineError, PipelineResult};

use super::similarity::SimilarHit;

/// Neo4j connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Bolt URI, e.g. "bolt://localhost:7687"
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Optional database name (defaults to "neo4j")
    pub database: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "".to_string(),
            password: "".to_string(),
            database: None,
        }
    }
}

/// Writes the incident/station/permit relationship view
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Merge the incident and its station/permit neighbourhood. Idempotent:
    /// node and edge counts are unchanged on replay.
    async fn ingest(&self, incident: &Incident) -> PipelineResult<()>;

    /// Record similarity edges from a newly persisted incident to its
    /// neighbours. Optional enrichment; failures are stage errors.
    async fn link_similar(&self, incident_id: Uuid, hits: &[SimilarHit]) -> PipelineResult<()>;
}

/// Neo4j-backed graph store
pub struct Neo4jGraphStore {
    graph: Arc<Graph>,
}

impl Neo4jGraphStore {
    pub async fn connect(config: GraphConfig) -> PipelineResult<Self> {
        info!("Connecting to Neo4j at {}", config.uri);

        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .map_err(|e| PipelineError::StoreUnavailable(format!("neo4j connect: {}", e)))?;

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Create uniqueness constraints. Idempotent.
    pub async fn initialize_schema(&self) -> PipelineResult<()> {
        let constraints = [
            "CREATE CONSTRAINT IF NOT EXISTS FOR (i:Incident) REQUIRE i.incident_id IS UNIQUE",
            "CREATE CONSTRAINT IF NOT EXISTS FOR (s:Station) REQUIRE (s.source, s.station_id) IS UNIQUE",
            "CREATE CONSTRAINT IF NOT EXISTS FOR (p:Permit) REQUIRE p.permit_id IS UNIQUE",
        ];
        for constraint in constraints {
            self.graph.run(Query::new(constraint.to_string())).await?;
        }
        Ok(())
    }

    pub async fn health_check(&self) -> PipelineResult<()> {
        self.graph.run(Query::new("RETURN 1".to_string())).await?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn ingest(&self, incident: &Incident) -> PipelineResult<()> {
        let incident_id = incident.incident_id.to_string();

        let incident_query = Query::new(
            r#"
            MERGE (i:Incident {incident_id: $incident_id})
            ON CREATE SET i.content_hash = $content_hash,
                i.created_at = $created_at,
                i.priority = $priority,
                i.source_kind = $source_kind,
                i.centroid_lat = $lat,
                i.centroid_lon = $lon,
                i.summary = $summary,
                i.run_id = $run_id
            "#
            .to_string(),
        )
        .param("incident_id", incident_id.clone())
        .param("content_hash", incident.content_hash.clone())
        .param("created_at", incident.created_at.to_rfc3339())
        .param("priority", incident.priority.as_str())
        .param("source_kind", incident.source_kind.as_str())
        .param("lat", incident.centroid.lat)
        .param("lon", incident.centroid.lon)
        .param("summary", incident.summary_text.clone())
        .param("run_id", incident.run_id.to_string());

        self.graph.run(incident_query).await?;

        // One MEASURED_AT edge per distinct station
        let mut stations: BTreeMap<(Source, &str), Option<&ReadingLocation>> = BTreeMap::new();
        for reading in &incident.readings {
            stations
                .entry((reading.source, reading.station_id.as_str()))
                .or_insert(reading.location.as_ref());
        }

        for ((source, station_id), location) in stations {
            let station_query = Query::new(
                r#"
                MERGE (s:Station {source: $source, station_id: $station_id})
                ON CREATE SET s.lat = $lat, s.lon = $lon, s.label = $label
                WITH s
                MATCH (i:Incident {incident_id: $incident_id})
                MERGE (i)-[:MEASURED_AT]->(s)
                "#
                .to_string(),
            )
            .param("source", source.as_str())
            .param("station_id", station_id)
            .param("lat", location.map(|l| l.lat).unwrap_or_default())
            .param("lon", location.map(|l| l.lon).unwrap_or_default())
            .param("label", location.map(|l| l.label.clone()).unwrap_or_default())
            .param("incident_id", incident_id.clone());

            self.graph.run(station_query).await?;
        }

        for permit in &incident.permits {
            let permit_query = Query::new(
                r#"
                MERGE (p:Permit {permit_id: $permit_id})
                ON CREATE SET p.operator = $operator,
                    p.type = $permit_type,
                    p.category = $category,
                    p.address = $address
                WITH p
                MATCH (i:Incident {incident_id: $incident_id})
                MERGE (i)-[r:NEAR_PERMIT]->(p)
                SET r.distance_km = $distance_km
                "#
                .to_string(),
            )
            .param("permit_id", permit.permit_id.clone())
            .param("operator", permit.operator.clone())
            .param("permit_type", permit.permit_type.clone())
            .param("category", permit.category.as_str())
            .param("address", permit.site_address.clone())
            .param("incident_id", incident_id.clone())
            .param("distance_km", permit.distance_km);

            self.graph.run(permit_query).await?;
        }

        debug!(incident_id = %incident_id, "incident projected to graph");
        Ok(())
    }

    async fn link_similar(&self, incident_id: Uuid, hits: &[SimilarHit]) -> PipelineResult<()> {
        for hit in hits {
            let query = Query::new(
                r#"
                MATCH (a:Incident {incident_id: $from_id})
                MATCH (b:Incident {incident_id: $to_id})
                MERGE (a)-[r:SIMILAR_TO]->(b)
                SET r.score = $score
                "#
                .to_string(),
            )
            .param("from_id", incident_id.to_string())
            .param("to_id", hit.incident_id.to_string())
            .param("score", hit.score);

            self.graph.run(query).await?;
        }
        Ok(())
    }
}
