// Copyright (c) 2025 - Riverwatch Project
//! Latest-readings adapter shared by the flood, hydrology and rainfall APIs
//!
//! Wire contract (fixed by the providers):
//!
//! ```text
//! GET {base}/data/readings?latest&parameter={parameter}
//!
//! { "items": [ { "measure": <ref>, "value": 1.23, "dateTime": "..." } ] }
//! ```
//!
//! The flood and rainfall APIs give `measure` as a URL string; the hydrology
//! API gives an object with an `@id` field. Both carry the station id in the
//! URL's final path segment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{Reading, ReadingLocation, Source};
use crate::errors::{PipelineError, PipelineResult};
use crate::metrics::ApiCallCounters;
use crate::stores::stations::StationDirectory;

use super::retry::with_retry;
use super::{station_id_from_measure, FetcherConfig, ReadingFetcher};

#[derive(Debug, Deserialize)]
struct LatestReadingsResponse {
    #[serde(default)]
    items: Vec<ReadingItem>,
}

#[derive(Debug, Deserialize)]
struct ReadingItem {
    measure: MeasureRef,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(rename = "dateTime", default)]
    date_time: Option<DateTime<Utc>>,
}

/// The two shapes upstream uses for a measure reference
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MeasureRef {
    Url(String),
    Object {
        #[serde(rename = "@id")]
        id: String,
    },
}

impl MeasureRef {
    fn url(&self) -> &str {
        match self {
            MeasureRef::Url(url) => url,
            MeasureRef::Object { id } => id,
        }
    }
}

/// Fetcher for one latest-readings API
pub struct LatestReadingsFetcher {
    source: Source,
    config: FetcherConfig,
    client: reqwest::Client,
    stations: Arc<dyn StationDirectory>,
    counters: Arc<ApiCallCounters>,
}

impl LatestReadingsFetcher {
    pub fn new(
        source: Source,
        config: FetcherConfig,
        client: reqwest::Client,
        stations: Arc<dyn StationDirectory>,
        counters: Arc<ApiCallCounters>,
    ) -> Self {
        Self {
            source,
            config,
            client,
            stations,
            counters,
        }
    }

    async fn fetch_payload(&self) -> PipelineResult<LatestReadingsResponse> {
        let url = format!(
            "{}/data/readings?latest&parameter={}",
            self.config.base_url,
            urlencoding::encode(&self.config.parameter)
        );

        with_retry(&self.config.retry, self.source.as_str(), || {
            let url = url.clone();
            async move {
                self.counters.record_fetch(self.source);

                let response = self
                    .client
                    .get(&url)
                    .timeout(self.config.timeout)
                    .send()
                    .await
                    .map_err(PipelineError::from)?;

                let status = response.status();
                if status.is_server_error() {
                    return Err(PipelineError::TransientUpstream(format!(
                        "{} returned {}",
                        url, status
                    )));
                }
                if status.is_client_error() {
                    return Err(PipelineError::TerminalUpstream(format!(
                        "{} returned {}",
                        url, status
                    )));
                }

                response
                    .json::<LatestReadingsResponse>()
                    .await
                    .map_err(|e| {
                        PipelineError::TerminalUpstream(format!("malformed payload: {}", e))
                    })
            }
        })
        .await
    }
}

#[async_trait]
impl ReadingFetcher for LatestReadingsFetcher {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_latest(&self) -> PipelineResult<Vec<Reading>> {
        let payload = self.fetch_payload().await?;

        // Items without a parseable station id, numeric value or timestamp
        // are dropped silently; the upstream mixes malformed rows into
        // otherwise healthy snapshots.
        let mut parsed: Vec<(String, f64, DateTime<Utc>)> = Vec::new();
        for item in &payload.items {
            let Some(station_id) = station_id_from_measure(item.measure.url()) else {
                continue;
            };
            let Some(value) = item.value.as_ref().and_then(|v| v.as_f64()) else {
                continue;
            };
            let Some(timestamp) = item.date_time else {
                continue;
            };
            parsed.push((station_id, value, timestamp));
        }

        let ids: Vec<String> = parsed
            .iter()
            .map(|(id, _, _)| id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let stations = self.stations.lookup_batch(self.source, &ids).await?;

        let mut readings = Vec::with_capacity(parsed.len());
        let mut unlocated = 0usize;
        for (station_id, value, timestamp) in parsed {
            let location = stations.get(&station_id).map(ReadingLocation::from);
            if location.is_none() {
                unlocated += 1;
            }
            readings.push(Reading {
                source: self.source,
                station_id,
                parameter: self.config.parameter.clone(),
                value,
                timestamp,
                location,
            });
        }

        if unlocated > 0 {
            warn!(
                source = %self.source,
                unlocated,
                "readings without station metadata will not cluster"
            );
        }
        debug!(source = %self.source, count = readings.len(), "fetched latest readings");

        Ok(readings)
    }
}
