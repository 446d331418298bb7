// Copyright (c) 2025 - Riverwatch Project
//! Riverwatch Agent Service
//!
//! Runs the detection-to-persistence pipeline on a periodic schedule:
//! fetch readings, detect anomalies, cluster, enrich with permits and
//! rainfall, compose incidents, persist to the document / vector / graph
//! stores, and record one run log per cycle.
//!
//! Run with: cargo run --bin riverwatch-agent
//!
//! Prerequisites:
//! 1. MongoDB reachable (MONGO_URI, default mongodb://localhost:27017)
//! 2. PostgreSQL with pgvector (PG_CONN)
//! 3. Neo4j reachable (NEO4J_URI / NEO4J_USER / NEO4J_PASSWORD)
//! 4. Embedding service key set (EMBEDDING_API_KEY)

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use riverwatch::compose::{IncidentComposer, PriorityFractions, TemplateSummariser};
use riverwatch::detect::{AnomalyThresholds, ThresholdDetector};
use riverwatch::enrich::{GeocodeConfig, PermitSearcher, PermitsConfig, RainfallCorrelator, RainfallThresholds};
use riverwatch::fetch::{FetcherConfig, LatestReadingsFetcher, ReadingFetcher};
use riverwatch::metrics::ApiCallCounters;
use riverwatch::orchestrator::CycleOrchestrator;
use riverwatch::stores::{
    connect_mongo, EmbeddingConfig, GraphConfig, HttpEmbeddingClient, MongoConfig,
    MongoIncidentStore, MongoRunLogStore, MongoStationDirectory, Neo4jGraphStore,
    PgSimilarityIndex,
};
use riverwatch::{Clusterer, PipelineConfig, Source};

/// Configuration for the agent service
#[derive(Debug, Clone)]
struct AgentConfig {
    flood_base: String,
    hydrology_base: String,
    rainfall_base: String,
    permits_base: String,
    geocode_base: String,
    embedding_base: String,
    embedding_api_key: String,
    mongo: MongoConfig,
    pg_conn: String,
    graph: GraphConfig,
    pipeline: PipelineConfig,
    thresholds: AnomalyThresholds,
}

impl AgentConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let flood_base = env_or(
            "FLOOD_BASE_URL",
            "https://environment.data.gov.uk/flood-monitoring",
        );
        let hydrology_base = env_or(
            "HYDROLOGY_BASE_URL",
            "https://environment.data.gov.uk/hydrology",
        );
        let rainfall_base = env_or("RAINFALL_BASE_URL", &flood_base);
        let permits_base = env_or(
            "PERMITS_BASE_URL",
            "https://environment.data.gov.uk/public-register",
        );
        let geocode_base = env_or("GEOCODE_BASE_URL", "https://api.postcodes.io");
        let embedding_base = env_or("EMBEDDING_BASE_URL", "https://api.openai.com/v1");
        let embedding_api_key =
            std::env::var("EMBEDDING_API_KEY").context("EMBEDDING_API_KEY not set")?;

        let mongo = MongoConfig {
            uri: env_or("MONGO_URI", "mongodb://localhost:27017"),
            database: env_or("MONGO_DATABASE", "riverwatch"),
        };
        let pg_conn = env_or(
            "PG_CONN",
            "host=localhost user=postgres dbname=riverwatch",
        );
        let graph = GraphConfig {
            uri: env_or("NEO4J_URI", "bolt://localhost:7687"),
            user: env_or("NEO4J_USER", "neo4j"),
            password: std::env::var("NEO4J_PASSWORD").unwrap_or_default(),
            database: std::env::var("NEO4J_DATABASE").ok(),
        };

        let mut pipeline = PipelineConfig::default();
        if let Some(secs) = env_parse::<u64>("SCHEDULE_INTERVAL_SECONDS") {
            pipeline.schedule_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("CYCLE_DEADLINE_SECONDS") {
            pipeline.cycle_deadline = Duration::from_secs(secs);
        }
        if let Some(km) = env_parse::<f64>("SPATIAL_RADIUS_KM") {
            pipeline.spatial_radius_km = km;
        }
        if let Some(hours) = env_parse::<i64>("TEMPORAL_WINDOW_HOURS") {
            pipeline.temporal_window_hours = hours;
        }
        if let Some(size) = env_parse::<usize>("MIN_CLUSTER_SIZE") {
            pipeline.min_cluster_size = size;
        }
        if let Some(km) = env_parse::<f64>("PERMIT_SEARCH_RADIUS_KM") {
            pipeline.permit_search_radius_km = km;
        }
        if let Some(fanout) = env_parse::<usize>("MAX_CLUSTER_FANOUT") {
            pipeline.max_cluster_fanout = fanout;
        }
        if let Some(hours) = env_parse::<i64>("DEDUP_WINDOW_HOURS") {
            pipeline.dedup_window_hours = hours;
        }

        let mut thresholds = AnomalyThresholds::default();
        if let Some(level) = env_parse::<f64>("FLOOD_LEVEL_THRESHOLD") {
            thresholds = thresholds.with_threshold(Source::Flood, "level", level);
        }
        if let Some(flow) = env_parse::<f64>("HYDROLOGY_FLOW_THRESHOLD") {
            thresholds = thresholds.with_threshold(Source::Hydrology, "flow", flow);
        }

        Ok(Self {
            flood_base,
            hydrology_base,
            rainfall_base,
            permits_base,
            geocode_base,
            embedding_base,
            embedding_api_key,
            mongo,
            pg_conn,
            graph,
            pipeline,
            thresholds,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting Riverwatch Agent v{}", riverwatch::VERSION);

    let config = AgentConfig::from_env()?;
    info!("📋 Configuration loaded:");
    info!("  - Flood API: {}", config.flood_base);
    info!("  - Hydrology API: {}", config.hydrology_base);
    info!("  - Permit register: {}", config.permits_base);
    info!("  - Document store: {}", config.mongo.uri);
    info!("  - Graph store: {}", config.graph.uri);

    // Shared HTTP client and API call accounting
    let http = reqwest::Client::new();
    let counters = Arc::new(ApiCallCounters::new());

    // Document store
    info!("🔌 Connecting to MongoDB");
    let database = connect_mongo(&config.mongo)
        .await
        .context("Failed to connect to MongoDB")?;
    let stations = Arc::new(MongoStationDirectory::new(&database));
    let incidents = Arc::new(MongoIncidentStore::new(
        &database,
        config.pipeline.dedup_window_hours,
    ));
    incidents
        .initialize()
        .await
        .context("Failed to create incident indexes")?;
    incidents
        .health_check()
        .await
        .context("Document store health check failed")?;
    let run_logs = Arc::new(MongoRunLogStore::new(&database));
    run_logs
        .initialize()
        .await
        .context("Failed to create run log indexes")?;
    info!("✅ Document store ready");

    // Vector index
    info!("🔌 Connecting to PostgreSQL (pgvector)");
    let embedding = EmbeddingConfig::new(&config.embedding_base, &config.embedding_api_key);
    let embedding_dim = embedding.dim;
    let embedder = Arc::new(HttpEmbeddingClient::new(
        embedding,
        http.clone(),
        Arc::clone(&counters),
    ));
    let similarity = Arc::new(
        PgSimilarityIndex::connect(
            &config.pg_conn,
            "incident_embeddings",
            embedding_dim,
            embedder,
        )
        .await
        .context("Failed to connect to PostgreSQL")?,
    );
    similarity
        .initialize()
        .await
        .context("Failed to initialize vector index")?;
    similarity
        .health_check()
        .await
        .context("Vector index health check failed")?;
    info!("✅ Vector index ready");

    // Graph store
    info!("🔌 Connecting to Neo4j");
    let graph = Arc::new(
        Neo4jGraphStore::connect(config.graph.clone())
            .await
            .context("Failed to connect to Neo4j")?,
    );
    graph
        .initialize_schema()
        .await
        .context("Failed to initialize graph schema")?;
    graph
        .health_check()
        .await
        .context("Graph store health check failed")?;
    info!("✅ Graph store ready");

    // Fetchers, one per upstream source
    let fetchers: Vec<Arc<dyn ReadingFetcher>> = vec![
        Arc::new(LatestReadingsFetcher::new(
            Source::Flood,
            FetcherConfig::new(&config.flood_base, "level"),
            http.clone(),
            stations.clone(),
            Arc::clone(&counters),
        )),
        Arc::new(LatestReadingsFetcher::new(
            Source::Hydrology,
            FetcherConfig::new(&config.hydrology_base, "flow"),
            http.clone(),
            stations.clone(),
            Arc::clone(&counters),
        )),
        Arc::new(LatestReadingsFetcher::new(
            Source::Rainfall,
            FetcherConfig::new(&config.rainfall_base, "rainfall"),
            http.clone(),
            stations.clone(),
            Arc::clone(&counters),
        )),
    ];

    let permits = Arc::new(PermitSearcher::new(
        PermitsConfig::new(&config.permits_base),
        Some(GeocodeConfig::new(&config.geocode_base)),
        http.clone(),
        Arc::clone(&counters),
    ));

    let orchestrator = Arc::new(CycleOrchestrator {
        fetchers,
        detector: Arc::new(ThresholdDetector::new(config.thresholds.clone())),
        clusterer: Clusterer::new(
            config.pipeline.spatial_radius_km,
            config.pipeline.temporal_window_hours,
            config.pipeline.min_cluster_size,
        ),
        permits,
        rainfall: RainfallCorrelator::new(
            config.pipeline.rainfall_radius_km,
            config.pipeline.rainfall_window_hours,
            RainfallThresholds::default(),
        ),
        composer: Arc::new(IncidentComposer::new(
            Arc::new(TemplateSummariser),
            PriorityFractions::default(),
        )),
        incidents,
        similarity,
        graph,
        run_logs,
        counters,
        config: config.pipeline,
    });

    // Cooperative shutdown: ctrl-c cancels the in-flight cycle; its partial
    // run log is written before exit
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Shutdown signal received");
            signal_token.cancel();
        }
    });

    info!("🎧 Entering scheduler loop");
    orchestrator.run_scheduled(shutdown).await;

    info!("👋 Riverwatch agent stopped");
    Ok(())
}
