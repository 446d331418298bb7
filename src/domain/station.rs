// Copyright (c) 2025 - Riverwatch Project
//! Station identity and metadata
//!
//! Stations are populated out-of-band by a one-off sync job; within the
//! pipeline they are read-only lookups keyed by `(source, station_id)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream telemetry source a station (and its readings) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Flood,
    Hydrology,
    Rainfall,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Flood => "flood",
            Source::Hydrology => "hydrology",
            Source::Rainfall => "rainfall",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monitoring station metadata
///
/// Identity is `(source, station_id)`; the same physical site can appear
/// under more than one source with different ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub source: Source,
    pub station_id: String,
    pub lat: f64,
    pub lon: f64,
    pub easting: Option<f64>,
    pub northing: Option<f64>,
    pub label: String,
}
