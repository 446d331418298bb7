// Copyright (c) 2025 - Riverwatch Project
//! Permit register search
//!
//! Queries the public permit register around a cluster centroid:
//!
//! ```text
//! GET {base}/api/search.csv?postcode=&easting=…&northing=…&dist=…
//! ```
//!
//! The register answers CSV. Rows are annotated with a coarse category
//! derived from the free-text `type` column and, when the site's postcode
//! geocodes, with WGS84 coordinates and a recomputed straight-line distance
//! to the centroid.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{Centroid, Permit, PermitCategory};
use crate::errors::{PipelineError, PipelineResult};
use crate::fetch::{with_retry, RetryPolicy};
use crate::geo::great_circle_km;
use crate::metrics::ApiCallCounters;

/// Configuration for the permit register
#[derive(Debug, Clone)]
pub struct PermitsConfig {
    /// Register root, e.g. "https://environment.data.gov.uk/public-register"
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl PermitsConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Configuration for the optional postcode geocoder
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Geocoder root, e.g. "https://api.postcodes.io"
    pub base_url: String,
    pub timeout: Duration,
}

impl GeocodeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Queries permits near a point
#[async_trait]
pub trait PermitSearch: Send + Sync {
    /// Permits within `radius_km` of the centroid, annotated with distance.
    /// Empty on HTTP success with no matches.
    async fn search_near(&self, centroid: &Centroid, radius_km: f64)
        -> PipelineResult<Vec<Permit>>;
}

/// One row of the register's CSV answer
#[derive(Debug, Deserialize)]
struct PermitRow {
    #[serde(rename = "permit", alias = "permitNumber", default)]
    permit_id: String,
    #[serde(rename = "holder", default)]
    holder: String,
    #[serde(rename = "type", default)]
    permit_type: String,
    #[serde(rename = "address", default)]
    address: String,
    #[serde(rename = "postcode", default)]
    postcode: Option<String>,
    #[serde(rename = "distance", default)]
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    result: GeocodeResult,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    latitude: f64,
    longitude: f64,
}

/// Permit register client
pub struct PermitSearcher {
    config: PermitsConfig,
    geocode: Option<GeocodeConfig>,
    client: reqwest::Client,
    counters: Arc<ApiCallCounters>,
}

impl PermitSearcher {
    pub fn new(
        config: PermitsConfig,
        geocode: Option<GeocodeConfig>,
        client: reqwest::Client,
        counters: Arc<ApiCallCounters>,
    ) -> Self {
        Self {
            config,
            geocode,
            client,
            counters,
        }
    }

    async fn fetch_csv(&self, easting: f64, northing: f64, radius_km: f64) -> PipelineResult<String> {
        let url = format!(
            "{}/api/search.csv?postcode=&easting={:.0}&northing={:.0}&dist={}",
            self.config.base_url, easting, northing, radius_km
        );

        with_retry(&self.config.retry, "permits", || {
            let url = url.clone();
            async move {
                self.counters.record_permits();

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
                        "permit register returned {}",
                        status
                    )));
                }
                if status.is_client_error() {
                    return Err(PipelineError::TerminalUpstream(format!(
                        "permit register returned {}",
                        status
                    )));
                }

                response.text().await.map_err(PipelineError::from)
            }
        })
        .await
    }

    /// Geocode a site postcode; `None` when the geocoder is unconfigured,
    /// unreachable or does not know the postcode.
    async fn geocode_postcode(&self, postcode: &str) -> Option<(f64, f64)> {
        let geocode = self.geocode.as_ref()?;
        let url = format!(
            "{}/postcodes/{}",
            geocode.base_url,
            urlencoding::encode(postcode.trim())
        );

        self.counters.record_geocode();
        let response = self
            .client
            .get(&url)
            .timeout(geocode.timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let payload: GeocodeResponse = response.json().await.ok()?;
        Some((payload.result.latitude, payload.result.longitude))
    }
}

#[async_trait]
impl PermitSearch for PermitSearcher {
    async fn search_near(
        &self,
        centroid: &Centroid,
        radius_km: f64,
    ) -> PipelineResult<Vec<Permit>> {
        let (Some(easting), Some(northing)) = (centroid.easting, centroid.northing) else {
            warn!("centroid has no easting/northing, skipping permit search");
            return Ok(Vec::new());
        };

        let body = self.fetch_csv(easting, northing, radius_km).await?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let mut permits = Vec::new();
        let mut geocoded: HashMap<String, Option<(f64, f64)>> = HashMap::new();

        for row in reader.deserialize::<PermitRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    return Err(PipelineError::TerminalUpstream(format!(
                        "malformed permit CSV: {}",
                        e
                    )))
                }
            };
            if row.permit_id.is_empty() {
                continue;
            }

            let coords = match &row.postcode {
                Some(pc) if !pc.is_empty() => {
                    // One geocoder call per distinct postcode per search
                    match geocoded.get(pc) {
                        Some(cached) => *cached,
                        None => {
                            let looked_up = self.geocode_postcode(pc).await;
                            geocoded.insert(pc.clone(), looked_up);
                            looked_up
                        }
                    }
                }
                _ => None,
            };

            // Prefer a recomputed great-circle distance; fall back to the
            // register's own column, then to the search radius as an upper
            // bound.
            let distance_km = match coords {
                Some((lat, lon)) => great_circle_km(centroid.lat, centroid.lon, lat, lon),
                None => row.distance.unwrap_or(radius_km),
            };

            permits.push(Permit {
                category: PermitCategory::from_permit_type(&row.permit_type),
                permit_id: row.permit_id,
                operator: row.holder,
                permit_type: row.permit_type,
                site_address: row.address,
                lat: coords.map(|(lat, _)| lat),
                lon: coords.map(|(_, lon)| lon),
                distance_km,
            });
        }

        debug!(count = permits.len(), "permit search complete");
        Ok(permits)
    }
}
