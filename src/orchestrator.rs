// Copyright (c) 2025 - Riverwatch Project
//! Cycle orchestration
//!
//! Drives one cycle end-to-end and composes the run log:
//!
//! ```text
//! START → FETCH → DETECT → CLUSTER → ENRICH → COMPOSE → PERSIST → LOG → END
//! ```
//!
//! The three fetchers run concurrently under the cycle deadline. Per-cluster
//! enrichment fans out across clusters, bounded by a semaphore to protect
//! the permit register. Persistence runs sequentially through the document
//! store (the commit point); vector and graph writes fan out per incident
//! after a successful insert.
//!
//! No error inside a single stage terminates the cycle: the orchestrator
//! captures it in the run log and continues. Cancellation (deadline or
//! shutdown) short-circuits to LOG with whatever is in hand.

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cluster::Clusterer;
use crate::compose::IncidentComposer;
use crate::config::PipelineConfig;
use crate::detect::AnomalyDetector;
use crate::domain::{
    AgentRunLog, Cluster, ClusterBreakdown, Incident, Permit, RainfallSummary, Reading, Source,
    Stage,
};
use crate::enrich::{PermitSearch, RainfallCorrelator};
use crate::errors::{PipelineError, PipelineResult};
use crate::fetch::ReadingFetcher;
use crate::metrics::ApiCallCounters;
use crate::stores::{GraphStore, IncidentStore, RunLogStore, SimilarityIndex};

/// One-cycle budget for store retries: each store gets a single immediate
/// retry per cycle, after which its failures are recorded and skipped
#[derive(Debug, Default)]
struct StoreRetryBudget {
    document: bool,
    vector: bool,
    graph: bool,
}

/// Sequences the pipeline components within one run
pub struct CycleOrchestrator {
    pub fetchers: Vec<Arc<dyn ReadingFetcher>>,
    pub detector: Arc<dyn AnomalyDetector>,
    pub clusterer: Clusterer,
    pub permits: Arc<dyn PermitSearch>,
    pub rainfall: RainfallCorrelator,
    pub composer: Arc<IncidentComposer>,
    pub incidents: Arc<dyn IncidentStore>,
    pub similarity: Arc<dyn SimilarityIndex>,
    pub graph: Arc<dyn GraphStore>,
    pub run_logs: Arc<dyn RunLogStore>,
    pub counters: Arc<ApiCallCounters>,
    pub config: PipelineConfig,
}

impl CycleOrchestrator {
    /// Run one cycle. Always returns a run log; the log is also persisted
    /// via the run log store (best effort).
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> AgentRunLog {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let started = Instant::now();
        let mut log = AgentRunLog::started(run_id, started_at);
        let api_baseline = self.counters.snapshot();

        info!(run_id = %run_id, "cycle started");

        // The cycle's own deadline cascades through a child token; a
        // process shutdown cancels the parent and reaches it the same way.
        let cycle_cancel = cancel.child_token();
        let deadline = {
            let token = cycle_cancel.clone();
            let budget = self.config.cycle_deadline;
            tokio::spawn(async move {
                tokio::time::sleep(budget).await;
                warn!("cycle deadline exceeded, cancelling");
                token.cancel();
            })
        };

        if let Err(err) = self.drive(&mut log, run_id, &cycle_cancel).await {
            warn!(run_id = %run_id, error = %err, "cycle ended early");
            log.push_error(Stage::Cycle, err.to_string());
        }
        deadline.abort();

        log.duration_seconds = started.elapsed().as_secs_f64();
        log.api_calls = self.counters.delta_since(&api_baseline);

        // Run log recording never fails the cycle
        if let Err(err) = self.run_logs.record(&log).await {
            error!(run_id = %run_id, error = %err, "failed to record run log");
        }

        info!(
            run_id = %run_id,
            readings = log.readings_fetched.total(),
            clusters = log.clusters_found,
            created = log.incidents_created,
            duplicate = log.incidents_duplicate,
            errors = log.errors.len(),
            duration_s = log.duration_seconds,
            "cycle finished"
        );
        log
    }

    /// FETCH through PERSIST. Stage errors land in `log`; only
    /// cancellation propagates as `Err`.
    async fn drive(
        &self,
        log: &mut AgentRunLog,
        run_id: Uuid,
        cancel: &CancellationToken,
    ) -> PipelineResult<()> {
        // FETCH: all sources concurrently, sharing the cycle deadline
        let fetches = self.fetchers.iter().map(|fetcher| {
            let cancel = cancel.clone();
            async move {
                let source = fetcher.source();
                let result = tokio::select! {
                    _ = cancel.cancelled() => {
                        Err(PipelineError::CycleAborted("fetch cancelled".to_string()))
                    }
                    result = fetcher.fetch_latest() => result,
                };
                (source, result)
            }
        });

        let mut detectable: Vec<Reading> = Vec::new();
        let mut rain_readings: Vec<Reading> = Vec::new();
        for (source, result) in join_all(fetches).await {
            match result {
                Ok(readings) => {
                    log.readings_fetched.record(source, readings.len() as u64);
                    // Rainfall bypasses detection; it only feeds correlation
                    if source == Source::Rainfall {
                        rain_readings = readings;
                    } else {
                        detectable.extend(readings);
                    }
                }
                Err(PipelineError::CycleAborted(msg)) => {
                    return Err(PipelineError::CycleAborted(msg));
                }
                Err(err) => {
                    warn!(source = %source, error = %err, "fetch failed");
                    log.push_error(Stage::for_source(source), err.to_string());
                }
            }
        }

        let stations: HashSet<(Source, &str)> = detectable
            .iter()
            .chain(rain_readings.iter())
            .map(|r| (r.source, r.station_id.as_str()))
            .collect();
        log.stations_fetched = stations.len() as u64;
        drop(stations);

        if cancel.is_cancelled() {
            return Err(PipelineError::CycleAborted("after fetch".to_string()));
        }

        // DETECT
        let anomalies = self.detector.classify(&detectable);
        debug!(anomalies = anomalies.len(), "detection complete");

        // CLUSTER
        let clusters = self.clusterer.cluster(&anomalies);
        log.clusters_found = clusters.len() as u64;
        for cluster in &clusters {
            log.clusters.push(ClusterBreakdown {
                centroid_lat: cluster.centroid.lat,
                centroid_lon: cluster.centroid.lon,
                station_count: cluster.station_ids().len() as u64,
            });
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::CycleAborted("after cluster".to_string()));
        }

        // ENRICH: bounded fan-out across clusters
        let enriched = self
            .enrich_clusters(clusters, Arc::new(rain_readings), cancel)
            .await;

        // COMPOSE and PERSIST
        let mut retries = StoreRetryBudget::default();
        let mut similarity_scores: Vec<f64> = Vec::new();

        for outcome in enriched {
            if cancel.is_cancelled() {
                return Err(PipelineError::CycleAborted("during persist".to_string()));
            }

            let (cluster, permits, rainfall) = match outcome {
                EnrichOutcome::Ready(cluster, permits, rainfall) => (cluster, permits, rainfall),
                EnrichOutcome::Aborted => {
                    return Err(PipelineError::CycleAborted("during enrich".to_string()));
                }
                EnrichOutcome::PermitsFailed(cluster, rainfall, err) => {
                    log.push_error(Stage::Permits, err.to_string());
                    // Permit context degrades to empty; the incident still
                    // composes
                    (cluster, Vec::new(), rainfall)
                }
            };

            let incident = self
                .composer
                .compose(&cluster, permits, rainfall, run_id, Utc::now())
                .await;

            self.persist_incident(log, &incident, &mut retries, &mut similarity_scores)
                .await;
        }

        if !similarity_scores.is_empty() {
            let sum: f64 = similarity_scores.iter().sum();
            log.similarity.avg_score = Some(sum / similarity_scores.len() as f64);
            log.similarity.best_score = similarity_scores.iter().copied().reduce(f64::max);
        }

        Ok(())
    }

    async fn enrich_clusters(
        &self,
        clusters: Vec<Cluster>,
        rain_readings: Arc<Vec<Reading>>,
        cancel: &CancellationToken,
    ) -> Vec<EnrichOutcome> {
        let fanout = Arc::new(Semaphore::new(self.config.max_cluster_fanout.max(1)));
        let now = Utc::now();

        let tasks = clusters.into_iter().map(|cluster| {
            let fanout = Arc::clone(&fanout);
            let rain_readings = Arc::clone(&rain_readings);
            let cancel = cancel.clone();
            async move {
                let _slot = match fanout.acquire().await {
                    Ok(slot) => slot,
                    Err(_) => return EnrichOutcome::Aborted,
                };

                // Rainfall correlation is in-memory and effectively free;
                // the permit search is the guarded external call.
                let rainfall =
                    self.rainfall
                        .summarise(&cluster.centroid, &rain_readings, now);

                let permits = tokio::select! {
                    _ = cancel.cancelled() => return EnrichOutcome::Aborted,
                    result = self.permits.search_near(
                        &cluster.centroid,
                        self.config.permit_search_radius_km,
                    ) => result,
                };

                match permits {
                    Ok(permits) => EnrichOutcome::Ready(cluster, permits, rainfall),
                    Err(err) => EnrichOutcome::PermitsFailed(cluster, rainfall, err),
                }
            }
        });

        join_all(tasks).await
    }

    /// PERSIST one incident: document store decides store-vs-skip; vector
    /// and graph writes fan out in parallel only for newly stored incidents.
    async fn persist_incident(
        &self,
        log: &mut AgentRunLog,
        incident: &Incident,
        retries: &mut StoreRetryBudget,
        similarity_scores: &mut Vec<f64>,
    ) {
        let stored = {
            let first = self.incidents.store_if_new(incident).await;
            match first {
                Err(ref err) if err.is_transient() && !retries.document => {
                    retries.document = true;
                    warn!(error = %err, "document store failed, retrying once");
                    self.incidents.store_if_new(incident).await
                }
                other => other,
            }
        };

        let outcome = match stored {
            Ok(outcome) => outcome,
            Err(err) => {
                log.push_error(Stage::DocumentStore, err.to_string());
                return;
            }
        };

        if !outcome.stored {
            log.incidents_duplicate += 1;
            log.incident_ids_duplicate.push(outcome.effective_id);
            debug!(
                incident_id = %outcome.effective_id,
                "duplicate incident, skipping vector and graph writes"
            );
            return;
        }

        log.incidents_created += 1;
        log.incident_ids_created.push(outcome.effective_id);
        log.store_writes.document += 1;

        // Similarity enrichment: neighbours are queried before this
        // incident's own embedding lands, so an incident never matches
        // itself.
        let neighbours = match self
            .similarity
            .query(
                &incident.summary_text,
                self.config.similarity_k,
                self.config.similarity_min_score,
            )
            .await
        {
            Ok(hits) => {
                log.similarity.searches += 1;
                similarity_scores.extend(hits.iter().map(|h| h.score));
                hits
            }
            Err(err) => {
                log.push_error(Stage::Similarity, err.to_string());
                Vec::new()
            }
        };

        let vector_budget = !retries.vector;
        let graph_budget = !retries.graph;

        let embed = async {
            match self.similarity.embed_and_store(incident).await {
                Err(ref err) if err.is_transient() && vector_budget => {
                    warn!(error = %err, "vector store failed, retrying once");
                    (self.similarity.embed_and_store(incident).await, true)
                }
                other => (other, false),
            }
        };
        let ingest = async {
            match self.graph.ingest(incident).await {
                Err(ref err) if err.is_transient() && graph_budget => {
                    warn!(error = %err, "graph store failed, retrying once");
                    (self.graph.ingest(incident).await, true)
                }
                other => (other, false),
            }
        };
        let ((embed_result, embed_retried), (ingest_result, ingest_retried)) =
            tokio::join!(embed, ingest);
        retries.vector |= embed_retried;
        retries.graph |= ingest_retried;

        match embed_result {
            Ok(true) => log.store_writes.vector += 1,
            Ok(false) => {}
            Err(err) => log.push_error(Stage::Embedding, err.to_string()),
        }

        match ingest_result {
            Ok(()) => {
                log.store_writes.graph += 1;
                if !neighbours.is_empty() {
                    if let Err(err) = self
                        .graph
                        .link_similar(incident.incident_id, &neighbours)
                        .await
                    {
                        log.push_error(Stage::GraphStore, err.to_string());
                    }
                }
            }
            Err(err) => log.push_error(Stage::GraphStore, err.to_string()),
        }
    }

    /// Scheduling loop: cycles never overlap, missed ticks are not queued,
    /// and a shutdown signal aborts the in-flight cycle cooperatively (its
    /// partial run log still gets written).
    pub async fn run_scheduled(self: Arc<Self>, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.schedule_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_s = self.config.schedule_interval.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            // Run the cycle on its own task so a panic is contained and
            // still produces a run log with a terminal error entry.
            let orchestrator = Arc::clone(&self);
            let cycle_cancel = shutdown.clone();
            let handle =
                tokio::spawn(async move { orchestrator.run_cycle(&cycle_cancel).await });

            match handle.await {
                Ok(_) => {}
                Err(join_err) => {
                    error!(error = %join_err, "cycle task failed");
                    let mut log = AgentRunLog::started(Uuid::now_v7(), Utc::now());
                    log.push_error(Stage::Cycle, format!("cycle task failed: {}", join_err));
                    if let Err(err) = self.run_logs.record(&log).await {
                        error!(error = %err, "failed to record failure run log");
                    }
                }
            }

            if shutdown.is_cancelled() {
                break;
            }
        }

        info!("scheduler stopped");
    }
}

/// Result of enriching one cluster
enum EnrichOutcome {
    Ready(Cluster, Vec<Permit>, RainfallSummary),
    PermitsFailed(Cluster, RainfallSummary, PipelineError),
    Aborted,
}
