// Copyright (c) 2025 - Riverwatch Project
//! In-memory doubles for the pipeline's store and fetcher seams
//!
//! Each double honours the contract of the trait it stands in for
//! (dedup windows, idempotency, batch lookup semantics) so orchestrator
//! tests exercise the real sequencing logic against fast fakes.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use riverwatch::domain::{AgentRunLog, Centroid, Incident, Permit, Reading, Source, Station};
use riverwatch::enrich::PermitSearch;
use riverwatch::errors::{PipelineError, PipelineResult};
use riverwatch::fetch::ReadingFetcher;
use riverwatch::stores::{
    GraphStore, IncidentStore, RunLogStore, SimilarHit, SimilarityIndex, StationDirectory,
    StoreOutcome,
};

/// Station directory backed by a fixed map
pub struct StaticStationDirectory {
    stations: HashMap<(Source, String), Station>,
}

impl StaticStationDirectory {
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        Self {
            stations: stations
                .into_iter()
                .map(|s| ((s.source, s.station_id.clone()), s))
                .collect(),
        }
    }
}

#[async_trait]
impl StationDirectory for StaticStationDirectory {
    async fn lookup_batch(
        &self,
        source: Source,
        station_ids: &[String],
    ) -> PipelineResult<HashMap<String, Station>> {
        Ok(station_ids
            .iter()
            .filter_map(|id| {
                self.stations
                    .get(&(source, id.clone()))
                    .map(|s| (id.clone(), s.clone()))
            })
            .collect())
    }
}

/// Fetcher that returns a fixed batch of readings
pub struct StaticFetcher {
    source: Source,
    readings: Vec<Reading>,
}

impl StaticFetcher {
    pub fn new(source: Source, readings: Vec<Reading>) -> Self {
        Self { source, readings }
    }

    pub fn empty(source: Source) -> Self {
        Self::new(source, Vec::new())
    }
}

#[async_trait]
impl ReadingFetcher for StaticFetcher {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_latest(&self) -> PipelineResult<Vec<Reading>> {
        Ok(self.readings.clone())
    }
}

/// Fetcher that always fails terminally
pub struct FailingFetcher {
    source: Source,
    message: String,
}

impl FailingFetcher {
    pub fn new(source: Source, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }
}

#[async_trait]
impl ReadingFetcher for FailingFetcher {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_latest(&self) -> PipelineResult<Vec<Reading>> {
        Err(PipelineError::TerminalUpstream(self.message.clone()))
    }
}

/// Permit searcher answering from a fixed list
pub struct StaticPermitSearch {
    permits: Vec<Permit>,
    pub calls: AtomicU64,
}

impl StaticPermitSearch {
    pub fn new(permits: Vec<Permit>) -> Self {
        Self {
            permits,
            calls: AtomicU64::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl PermitSearch for StaticPermitSearch {
    async fn search_near(
        &self,
        _centroid: &Centroid,
        _radius_km: f64,
    ) -> PipelineResult<Vec<Permit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.permits.clone())
    }
}

/// Permit searcher that never answers; used to test cancellation
pub struct StalledPermitSearch;

#[async_trait]
impl PermitSearch for StalledPermitSearch {
    async fn search_near(
        &self,
        _centroid: &Centroid,
        _radius_km: f64,
    ) -> PipelineResult<Vec<Permit>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Incident store with the same dedup semantics as the MongoDB adapter
pub struct InMemoryIncidentStore {
    incidents: Mutex<Vec<Incident>>,
    dedup_window: ChronoDuration,
}

impl InMemoryIncidentStore {
    pub fn new(dedup_window_hours: i64) -> Self {
        Self {
            incidents: Mutex::new(Vec::new()),
            dedup_window: ChronoDuration::hours(dedup_window_hours),
        }
    }

    pub async fn stored(&self) -> Vec<Incident> {
        self.incidents.lock().await.clone()
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn store_if_new(&self, incident: &Incident) -> PipelineResult<StoreOutcome> {
        let mut incidents = self.incidents.lock().await;
        let window_start = incident.created_at - self.dedup_window;
        if let Some(existing) = incidents
            .iter()
            .find(|i| i.content_hash == incident.content_hash && i.created_at >= window_start)
        {
            return Ok(StoreOutcome {
                stored: false,
                effective_id: existing.incident_id,
            });
        }
        incidents.push(incident.clone());
        Ok(StoreOutcome {
            stored: true,
            effective_id: incident.incident_id,
        })
    }

    async fn recent(&self, since: DateTime<Utc>) -> PipelineResult<Vec<Incident>> {
        let mut incidents: Vec<Incident> = self
            .incidents
            .lock()
            .await
            .iter()
            .filter(|i| i.created_at >= since)
            .cloned()
            .collect();
        incidents.sort_by_key(|i| std::cmp::Reverse(i.created_at));
        Ok(incidents)
    }
}

/// Similarity index that counts embedding-service calls and rows
pub struct RecordingSimilarityIndex {
    rows: Mutex<HashMap<Uuid, String>>,
    hits: Vec<SimilarHit>,
    pub embed_calls: AtomicU64,
    pub queries: AtomicU64,
}

impl RecordingSimilarityIndex {
    pub fn new() -> Self {
        Self::with_hits(Vec::new())
    }

    pub fn with_hits(hits: Vec<SimilarHit>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            hits,
            embed_calls: AtomicU64::new(0),
            queries: AtomicU64::new(0),
        }
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl SimilarityIndex for RecordingSimilarityIndex {
    async fn embed_and_store(&self, incident: &Incident) -> PipelineResult<bool> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&incident.incident_id) {
            return Ok(false);
        }
        // The embedding service is only consulted for new rows
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        rows.insert(incident.incident_id, incident.summary_text.clone());
        Ok(true)
    }

    async fn query(
        &self,
        _text: &str,
        k: usize,
        min_score: f64,
    ) -> PipelineResult<Vec<SimilarHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .hits
            .iter()
            .filter(|h| h.score >= min_score)
            .take(k)
            .copied()
            .collect())
    }
}

/// Graph store tracking merged nodes and edges by identity
pub struct RecordingGraphStore {
    incidents: Mutex<HashSet<Uuid>>,
    stations: Mutex<HashSet<(Source, String)>>,
    permits: Mutex<HashSet<String>>,
    similar_edges: Mutex<HashSet<(Uuid, Uuid)>>,
    pub ingest_calls: AtomicU64,
}

impl RecordingGraphStore {
    pub fn new() -> Self {
        Self {
            incidents: Mutex::new(HashSet::new()),
            stations: Mutex::new(HashSet::new()),
            permits: Mutex::new(HashSet::new()),
            similar_edges: Mutex::new(HashSet::new()),
            ingest_calls: AtomicU64::new(0),
        }
    }

    pub async fn incident_count(&self) -> usize {
        self.incidents.lock().await.len()
    }

    pub async fn station_count(&self) -> usize {
        self.stations.lock().await.len()
    }

    pub async fn permit_count(&self) -> usize {
        self.permits.lock().await.len()
    }

    pub async fn similar_edge_count(&self) -> usize {
        self.similar_edges.lock().await.len()
    }
}

#[async_trait]
impl GraphStore for RecordingGraphStore {
    async fn ingest(&self, incident: &Incident) -> PipelineResult<()> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        self.incidents.lock().await.insert(incident.incident_id);
        let mut stations = self.stations.lock().await;
        for reading in &incident.readings {
            stations.insert((reading.source, reading.station_id.clone()));
        }
        let mut permits = self.permits.lock().await;
        for permit in &incident.permits {
            permits.insert(permit.permit_id.clone());
        }
        Ok(())
    }

    async fn link_similar(&self, incident_id: Uuid, hits: &[SimilarHit]) -> PipelineResult<()> {
        let mut edges = self.similar_edges.lock().await;
        for hit in hits {
            edges.insert((incident_id, hit.incident_id));
        }
        Ok(())
    }
}

/// Run log store capturing every recorded log
pub struct CapturingRunLogStore {
    logs: Mutex<Vec<AgentRunLog>>,
}

impl CapturingRunLogStore {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(Vec::new()),
        }
    }

    pub async fn recorded(&self) -> Vec<AgentRunLog> {
        self.logs.lock().await.clone()
    }
}

#[async_trait]
impl RunLogStore for CapturingRunLogStore {
    async fn record(&self, log: &AgentRunLog) -> PipelineResult<()> {
        self.logs.lock().await.push(log.clone());
        Ok(())
    }
}

/// Convenience alias bundle for orchestrator construction in tests
pub struct TestStores {
    pub incidents: Arc<InMemoryIncidentStore>,
    pub similarity: Arc<RecordingSimilarityIndex>,
    pub graph: Arc<RecordingGraphStore>,
    pub run_logs: Arc<CapturingRunLogStore>,
}

impl TestStores {
    pub fn new() -> Self {
        Self {
            incidents: Arc::new(InMemoryIncidentStore::new(24)),
            similarity: Arc::new(RecordingSimilarityIndex::new()),
            graph: Arc::new(RecordingGraphStore::new()),
            run_logs: Arc::new(CapturingRunLogStore::new()),
        }
    }
}
