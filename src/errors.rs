//! Error types for pipeline operations

use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transient upstream failure (timeout, 5xx, connection reset); retryable
    #[error("transient upstream error: {0}")]
    TransientUpstream(String),

    /// Terminal upstream failure (4xx, malformed payload); not retried
    #[error("terminal upstream error: {0}")]
    TerminalUpstream(String),

    /// A backing store could not be reached
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The embedding service failed after retries
    #[error("embedding service failure: {0}")]
    EmbeddingFailure(String),

    /// The cycle was cancelled or exceeded its deadline
    #[error("cycle aborted: {0}")]
    CycleAborted(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Whether a retry of the failed operation could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::TransientUpstream(_) | PipelineError::StoreUnavailable(_)
        )
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return PipelineError::TransientUpstream(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.is_server_error() {
                return PipelineError::TransientUpstream(err.to_string());
            }
            return PipelineError::TerminalUpstream(err.to_string());
        }
        PipelineError::TransientUpstream(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<mongodb::error::Error> for PipelineError {
    fn from(err: mongodb::error::Error) -> Self {
        PipelineError::StoreUnavailable(err.to_string())
    }
}

impl From<tokio_postgres::Error> for PipelineError {
    fn from(err: tokio_postgres::Error) -> Self {
        PipelineError::StoreUnavailable(err.to_string())
    }
}

impl From<neo4rs::Error> for PipelineError {
    fn from(err: neo4rs::Error) -> Self {
        PipelineError::StoreUnavailable(err.to_string())
    }
}
