// Copyright (c) 2025 - Riverwatch Project
//! Reading fetchers for the upstream telemetry APIs
//!
//! One fetcher per upstream source (flood / hydrology / rainfall), each
//! independently configured with a base URL, parameter filter, retry policy
//! and timeout. The three APIs share a "latest readings" wire shape, so one
//! adapter type serves all three; the differences (measure reference shape,
//! parameter name) are data, not code.
//!
//! A fetcher failing terminally reports a stage error in the run log but
//! never aborts the cycle; the pipeline proceeds with whatever the other
//! fetchers produced.

pub mod readings;
pub mod retry;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Reading, Source};
use crate::errors::PipelineResult;

pub use readings::LatestReadingsFetcher;
pub use retry::{with_retry, RetryPolicy};

/// Configuration for one upstream readings API
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// API root, e.g. "https://environment.data.gov.uk/flood-monitoring"
    pub base_url: String,
    /// Parameter filter passed upstream ("level", "flow", "rainfall")
    pub parameter: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl FetcherConfig {
    pub fn new(base_url: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            parameter: parameter.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// A source of enriched readings for one upstream API
#[async_trait]
pub trait ReadingFetcher: Send + Sync {
    /// The source this fetcher serves
    fn source(&self) -> Source;

    /// Fetch the current "latest" snapshot per station.
    ///
    /// Readings are enriched with station coordinates in a single batch
    /// lookup; readings whose station is unknown are retained without a
    /// location and filtered out before clustering.
    async fn fetch_latest(&self) -> PipelineResult<Vec<Reading>>;
}

/// Extract the station id from a measure URL.
///
/// Upstream embeds the station id in the measure URL's final path segment,
/// e.g. `.../measures/531160-level-stage-i-15_min-mASD`; the id is the
/// leading hyphen-delimited component. The rule is identical across flood
/// and hydrology sources.
pub(crate) fn station_id_from_measure(measure_url: &str) -> Option<String> {
    let segment = measure_url.trim_end_matches('/').rsplit('/').next()?;
    let id = segment.split('-').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_leading_id_component() {
        let url = "http://environment.data.gov.uk/flood-monitoring/id/measures/531160-level-stage-i-15_min-mASD";
        assert_eq!(station_id_from_measure(url).as_deref(), Some("531160"));
    }

    #[test]
    fn handles_trailing_slash() {
        assert_eq!(
            station_id_from_measure("https://example.org/measures/E1234-flow/").as_deref(),
            Some("E1234")
        );
    }

    #[test]
    fn segment_without_hyphen_is_the_id() {
        assert_eq!(
            station_id_from_measure("https://example.org/measures/52119").as_deref(),
            Some("52119")
        );
    }

    #[test]
    fn empty_url_yields_none() {
        assert_eq!(station_id_from_measure(""), None);
        assert_eq!(station_id_from_measure("///"), None);
    }
}
