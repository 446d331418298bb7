// Copyright (c) 2025 - Riverwatch Project
//! Station metadata lookups
//!
//! Station coordinates are populated by an out-of-band sync job; the
//! pipeline only ever reads them, one batched round trip per fetch.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use std::collections::HashMap;

use crate::domain::{Source, Station};
use crate::errors::PipelineResult;

/// Resolves `(source, station_id)` to station metadata
#[async_trait]
pub trait StationDirectory: Send + Sync {
    /// Batch lookup in one round trip. Missing stations are simply absent
    /// from the result; unreachable storage is an error, propagated without
    /// retry.
    async fn lookup_batch(
        &self,
        source: Source,
        station_ids: &[String],
    ) -> PipelineResult<HashMap<String, Station>>;
}

/// MongoDB-backed station directory
pub struct MongoStationDirectory {
    collection: Collection<Station>,
}

impl MongoStationDirectory {
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection("stations"),
        }
    }
}

#[async_trait]
impl StationDirectory for MongoStationDirectory {
    async fn lookup_batch(
        &self,
        source: Source,
        station_ids: &[String],
    ) -> PipelineResult<HashMap<String, Station>> {
        if station_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = doc! {
            "source": source.as_str(),
            "station_id": { "$in": station_ids },
        };

        let mut cursor = self.collection.find(filter).await?;
        let mut stations = HashMap::with_capacity(station_ids.len());
        while let Some(station) = cursor.try_next().await? {
            stations.insert(station.station_id.clone(), station);
        }
        Ok(stations)
    }
}
