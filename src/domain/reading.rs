// Copyright (c) 2025 - Riverwatch Project
//! Readings and anomalies
//!
//! A [`Reading`] is one measurement from one station. Readings carry their
//! station's geometry, copied in at fetch time, so downstream stages never
//! re-join against station metadata. Readings are ephemeral within a cycle;
//! only the copies embedded in an incident are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::station::{Source, Station};

/// Station geometry copied onto a reading at fetch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingLocation {
    pub lat: f64,
    pub lon: f64,
    pub easting: Option<f64>,
    pub northing: Option<f64>,
    pub label: String,
}

impl From<&Station> for ReadingLocation {
    fn from(station: &Station) -> Self {
        Self {
            lat: station.lat,
            lon: station.lon,
            easting: station.easting,
            northing: station.northing,
            label: station.label.clone(),
        }
    }
}

/// One measurement from one station
///
/// Identity is `(source, station_id, timestamp, parameter)`. `location` is
/// `None` when the station is not present in the metadata store; such
/// readings survive fetching but are filtered out before clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub source: Source,
    pub station_id: String,
    pub parameter: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub location: Option<ReadingLocation>,
}

impl Reading {
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}

/// A reading that exceeded its detection threshold
///
/// Same schema as [`Reading`] plus the threshold it was classified against
/// and the exceedance fraction `(value - threshold) / threshold`, which
/// downstream priority derivation and summaries reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub reading: Reading,
    pub threshold: f64,
    pub exceedance: f64,
}
