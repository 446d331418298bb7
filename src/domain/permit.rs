// Copyright (c) 2025 - Riverwatch Project
//! Regulatory permits near an incident

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse permit category derived from the upstream `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitCategory {
    Waste,
    Discharge,
    FloodRisk,
    Abstraction,
    Other,
}

impl PermitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermitCategory::Waste => "waste",
            PermitCategory::Discharge => "discharge",
            PermitCategory::FloodRisk => "flood_risk",
            PermitCategory::Abstraction => "abstraction",
            PermitCategory::Other => "other",
        }
    }

    /// Static mapping from the permit register's free-text `type` field
    pub fn from_permit_type(permit_type: &str) -> Self {
        let t = permit_type.to_ascii_lowercase();
        if t.contains("waste") {
            PermitCategory::Waste
        } else if t.contains("discharge") || t.contains("sewage") || t.contains("effluent") {
            PermitCategory::Discharge
        } else if t.contains("flood") {
            PermitCategory::FloodRisk
        } else if t.contains("abstraction") || t.contains("impound") {
            PermitCategory::Abstraction
        } else {
            PermitCategory::Other
        }
    }
}

impl fmt::Display for PermitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A regulatory permit returned by the permit register search
///
/// `distance_km` is the straight-line distance to the centroid of the
/// incident this permit is attached to; `lat`/`lon` are present when the
/// site's postcode geocoded successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permit {
    pub permit_id: String,
    pub operator: String,
    pub permit_type: String,
    pub category: PermitCategory,
    pub site_address: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance_km: f64,
}
