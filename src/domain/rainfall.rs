// Copyright (c) 2025 - Riverwatch Project
//! Rainfall context for a cluster

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rainfall intensity category derived from configured thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainfallCategory {
    Heavy,
    Moderate,
    Light,
    None,
}

impl RainfallCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RainfallCategory::Heavy => "heavy",
            RainfallCategory::Moderate => "moderate",
            RainfallCategory::Light => "light",
            RainfallCategory::None => "none",
        }
    }
}

impl fmt::Display for RainfallCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated rainfall near a cluster centroid over the correlation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallSummary {
    /// Sum of gauge values within the search radius and window (mm)
    pub total_mm: f64,
    /// Largest single gauge value in the window (mm)
    pub max_hourly_mm: f64,
    /// Distinct gauges contributing to the total
    pub gauge_count: u64,
    pub category: RainfallCategory,
}

impl RainfallSummary {
    /// Summary for a centroid with no gauges in range
    pub fn empty() -> Self {
        Self {
            total_mm: 0.0,
            max_hourly_mm: 0.0,
            gauge_count: 0,
            category: RainfallCategory::None,
        }
    }
}
