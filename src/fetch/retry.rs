// Copyright (c) 2025 - Riverwatch Project
//! Bounded exponential backoff with jitter
//!
//! Transient failures (timeouts, 5xx, connection resets) are retried up to a
//! bounded attempt count; terminal failures return immediately. Jitter keeps
//! retries against a struggling upstream from synchronising.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::errors::PipelineResult;

/// Retry policy for calls to external services
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per subsequent attempt
    pub initial_backoff: Duration,
    /// Ceiling on the computed backoff
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Equal-jitter backoff for the given (1-based) failed attempt
    fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = (attempt - 1).min(16);
        let exponential = self
            .initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff);
        let half_ms = exponential.as_millis() as u64 / 2;
        let jitter_ms = rand::thread_rng().gen_range(0..=half_ms.max(1));
        Duration::from_millis(half_ms + jitter_ms)
    }
}

/// Run `op`, retrying transient errors per `policy`.
///
/// `what` names the operation in retry logs.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    operation = what,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
