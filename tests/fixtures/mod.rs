// Copyright (c) 2025 - Riverwatch Project
//! Test Fixtures for riverwatch
//!
//! Deterministic test data for pipeline tests. Timestamps and coordinates
//! are fixed constants so tests are reproducible; clustering anchors its
//! temporal window at the newest reading in the batch, so fixed past
//! timestamps are safe.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use riverwatch::domain::{
    Anomaly, Permit, PermitCategory, Reading, ReadingLocation, Source, Station,
};

/// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    FIXED_TIMESTAMP
        .parse()
        .expect("Invalid timestamp in test fixture")
}

/// Parse an RFC3339 timestamp
pub fn ts(value: &str) -> DateTime<Utc> {
    value.parse().expect("Invalid timestamp in test fixture")
}

/// A flood station on the Somerset Levels
pub fn currymoor_station() -> Station {
    Station {
        source: Source::Flood,
        station_id: "531160".to_string(),
        lat: 51.08,
        lon: -2.87,
        easting: Some(332_000.0),
        northing: Some(120_500.0),
        label: "Currymoor".to_string(),
    }
}

/// A second flood station a few kilometres from Currymoor
pub fn northmoor_station() -> Station {
    Station {
        source: Source::Flood,
        station_id: "531164".to_string(),
        lat: 51.12,
        lon: -2.82,
        easting: Some(335_400.0),
        northing: Some(124_900.0),
        label: "Northmoor".to_string(),
    }
}

/// Build a located reading
pub fn reading(
    source: Source,
    station_id: &str,
    parameter: &str,
    value: f64,
    lat: f64,
    lon: f64,
    timestamp: &str,
) -> Reading {
    Reading {
        source,
        station_id: station_id.to_string(),
        parameter: parameter.to_string(),
        value,
        timestamp: ts(timestamp),
        location: Some(ReadingLocation {
            lat,
            lon,
            easting: Some(332_000.0),
            northing: Some(120_500.0),
            label: station_id.to_string(),
        }),
    }
}

/// Build a flood level reading
pub fn flood_reading(station_id: &str, value: f64, lat: f64, lon: f64, timestamp: &str) -> Reading {
    reading(Source::Flood, station_id, "level", value, lat, lon, timestamp)
}

/// Build a hydrology flow reading
pub fn flow_reading(station_id: &str, value: f64, lat: f64, lon: f64, timestamp: &str) -> Reading {
    reading(
        Source::Hydrology,
        station_id,
        "flow",
        value,
        lat,
        lon,
        timestamp,
    )
}

/// Build an anomaly from a located reading and its threshold
pub fn anomaly(reading: Reading, threshold: f64) -> Anomaly {
    let exceedance = (reading.value - threshold) / threshold;
    Anomaly {
        reading,
        threshold,
        exceedance,
    }
}

/// Build a permit with the given category hint in its type field
pub fn permit(permit_id: &str, permit_type: &str, distance_km: f64) -> Permit {
    Permit {
        permit_id: permit_id.to_string(),
        operator: "Wessex Water".to_string(),
        permit_type: permit_type.to_string(),
        category: PermitCategory::from_permit_type(permit_type),
        site_address: "Sewage Works, Taunton".to_string(),
        lat: None,
        lon: None,
        distance_km,
    }
}

/// Ten permits, three of them discharge-tagged
pub fn ten_permits_three_discharge() -> Vec<Permit> {
    let mut permits = Vec::new();
    for i in 0..3 {
        permits.push(permit(
            &format!("EPR/D{:04}", i),
            "Water Discharge Activity",
            0.3 + i as f64 * 0.1,
        ));
    }
    for i in 0..4 {
        permits.push(permit(
            &format!("EPR/W{:04}", i),
            "Waste Operation",
            0.5 + i as f64 * 0.1,
        ));
    }
    for i in 0..3 {
        permits.push(permit(&format!("EPR/O{:04}", i), "Installation", 0.8));
    }
    permits
}
