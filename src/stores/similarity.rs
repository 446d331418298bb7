// Copyright (c) 2025 - Riverwatch Project
//! Vector similarity index
//!
//! PostgreSQL with the pgvector extension, cosine metric, one row per
//! incident keyed by incident id. `embed_and_store` is idempotent: when a
//! row already exists the embedding service is not called at all.

use async_trait::async_trait;
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::Incident;
use crate::errors::{PipelineError, PipelineResult};
use crate::fetch::{with_retry, RetryPolicy};
use crate::metrics::ApiCallCounters;

/// Configuration for the external embedding service
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Service root of an OpenAI-compatible embeddings API
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Expected embedding dimensionality; fixed at index creation
    pub dim: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl EmbeddingConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            dim: 1536,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Produces fixed-dimension embeddings for summary text
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> PipelineResult<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// HTTP client for an OpenAI-compatible embeddings endpoint
pub struct HttpEmbeddingClient {
    config: EmbeddingConfig,
    client: reqwest::Client,
    counters: Arc<ApiCallCounters>,
}

impl HttpEmbeddingClient {
    pub fn new(
        config: EmbeddingConfig,
        client: reqwest::Client,
        counters: Arc<ApiCallCounters>,
    ) -> Self {
        Self {
            config,
            client,
            counters,
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> PipelineResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.base_url);

        let response = with_retry(&self.config.retry, "embedding", || {
            let url = url.clone();
            async move {
                self.counters.record_embedding();

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.config.api_key)
                    .timeout(self.config.timeout)
                    .json(&EmbeddingRequest {
                        model: &self.config.model,
                        input: [text],
                    })
                    .send()
                    .await
                    .map_err(PipelineError::from)?;

                let status = response.status();
                if status.is_server_error() {
                    return Err(PipelineError::TransientUpstream(format!(
                        "embedding service returned {}",
                        status
                    )));
                }
                if status.is_client_error() {
                    return Err(PipelineError::TerminalUpstream(format!(
                        "embedding service returned {}",
                        status
                    )));
                }

                response
                    .json::<EmbeddingResponse>()
                    .await
                    .map_err(PipelineError::from)
            }
        })
        .await
        .map_err(|e| PipelineError::EmbeddingFailure(e.to_string()))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                PipelineError::EmbeddingFailure("service returned no embedding".to_string())
            })?;

        if embedding.len() != self.config.dim {
            return Err(PipelineError::EmbeddingFailure(format!(
                "expected {} dimensions, got {}",
                self.config.dim,
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarHit {
    pub incident_id: Uuid,
    pub score: f64,
}

/// Vector index over incident summaries
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Embed and store the incident's summary, keyed by incident id.
    /// Returns whether a new row was written; a no-op (row exists) does not
    /// call the embedding service.
    async fn embed_and_store(&self, incident: &Incident) -> PipelineResult<bool>;

    /// Up to `k` nearest neighbours with cosine similarity at least
    /// `min_score`, best first.
    async fn query(&self, text: &str, k: usize, min_score: f64)
        -> PipelineResult<Vec<SimilarHit>>;
}

/// pgvector-backed similarity index
pub struct PgSimilarityIndex {
    client: Arc<Mutex<Client>>,
    table: String,
    dim: usize,
    embedder: Arc<dyn EmbeddingClient>,
}

impl PgSimilarityIndex {
    /// Connect and validate the table name.
    ///
    /// The table name is interpolated into DDL and queries, so it must be a
    /// plain SQL identifier.
    pub async fn connect(
        connection_string: &str,
        table: &str,
        dim: usize,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> PipelineResult<Self> {
        validate_identifier(table)?;

        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| PipelineError::StoreUnavailable(format!("postgres connect: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection error");
            }
        });

        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            table: table.to_string(),
            dim,
            embedder,
        })
    }

    /// Ensure extension, table and cosine index exist. Idempotent.
    pub async fn initialize(&self) -> PipelineResult<()> {
        let client = self.client.lock().await;

        client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await?;

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                summary TEXT NOT NULL,
                embedding vector({})
            )",
            self.table, self.dim
        );
        client.execute(&create_table, &[]).await?;

        // Index creation can fail on an empty table; the sequential scan is
        // correct until it succeeds.
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {}_embedding_idx ON {} \
             USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)",
            self.table, self.table
        );
        let _ = client.execute(&create_index, &[]).await;

        Ok(())
    }

    pub async fn health_check(&self) -> PipelineResult<()> {
        let client = self.client.lock().await;
        client.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}

#[async_trait]
impl SimilarityIndex for PgSimilarityIndex {
    async fn embed_and_store(&self, incident: &Incident) -> PipelineResult<bool> {
        let id = incident.incident_id.to_string();

        // Existence check first: the idempotency contract forbids calling
        // the embedding service for an already-indexed incident.
        {
            let client = self.client.lock().await;
            let exists = client
                .query_opt(
                    &format!("SELECT 1 FROM {} WHERE id = $1", self.table),
                    &[&id],
                )
                .await?;
            if exists.is_some() {
                debug!(incident_id = %id, "embedding already present");
                return Ok(false);
            }
        }

        let embedding = self.embedder.embed(&incident.summary_text).await?;
        let vector = Vector::from(embedding);

        let client = self.client.lock().await;
        let written = client
            .execute(
                &format!(
                    "INSERT INTO {} (id, run_id, summary, embedding) \
                     VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO NOTHING",
                    self.table
                ),
                &[
                    &id,
                    &incident.run_id.to_string(),
                    &incident.summary_text,
                    &vector,
                ],
            )
            .await?;

        Ok(written > 0)
    }

    async fn query(
        &self,
        text: &str,
        k: usize,
        min_score: f64,
    ) -> PipelineResult<Vec<SimilarHit>> {
        let embedding = self.embedder.embed(text).await?;
        let vector = Vector::from(embedding);

        let client = self.client.lock().await;
        let rows = client
            .query(
                &format!(
                    "SELECT id, 1 - (embedding <=> $1) AS score FROM {} \
                     ORDER BY embedding <=> $1 LIMIT $2",
                    self.table
                ),
                &[&vector, &(k as i64)],
            )
            .await?;

        let mut hits = Vec::new();
        for row in rows {
            let id: String = row.get("id");
            let score: f64 = row.get("score");
            if score < min_score {
                continue;
            }
            let incident_id = Uuid::parse_str(&id).map_err(|e| {
                PipelineError::Serialization(format!("bad incident id in index: {}", e))
            })?;
            hits.push(SimilarHit { incident_id, score });
        }
        Ok(hits)
    }
}

/// Validate a PostgreSQL identifier: leading letter or underscore, then
/// letters, digits and underscores, at most 63 bytes
fn validate_identifier(name: &str) -> PipelineResult<()> {
    if name.is_empty() || name.len() > 63 {
        return Err(PipelineError::Configuration(format!(
            "invalid table name: {:?}",
            name
        )));
    }
    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PipelineError::Configuration(format!(
            "invalid table name: {:?}",
            name
        )));
    }
    Ok(())
}
