// Copyright (c) 2025 - Riverwatch Project
//! Rainfall correlation
//!
//! Rainfall readings are fetched once per cycle and correlated per cluster
//! in memory; gauges within the configured radius of the centroid and the
//! correlation window contribute to the summary.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashSet;

use crate::domain::{Centroid, RainfallCategory, RainfallSummary, Reading};
use crate::geo::great_circle_km;

/// Category thresholds in millimetres of total rainfall
#[derive(Debug, Clone, Copy)]
pub struct RainfallThresholds {
    pub heavy_mm: f64,
    pub moderate_mm: f64,
}

impl Default for RainfallThresholds {
    fn default() -> Self {
        Self {
            heavy_mm: 15.0,
            moderate_mm: 5.0,
        }
    }
}

impl RainfallThresholds {
    fn categorise(&self, total_mm: f64) -> RainfallCategory {
        if total_mm >= self.heavy_mm {
            RainfallCategory::Heavy
        } else if total_mm >= self.moderate_mm {
            RainfallCategory::Moderate
        } else if total_mm > 0.0 {
            RainfallCategory::Light
        } else {
            RainfallCategory::None
        }
    }
}

/// Aggregates rainfall near a point over the correlation window
#[derive(Debug, Clone)]
pub struct RainfallCorrelator {
    radius_km: f64,
    window: ChronoDuration,
    thresholds: RainfallThresholds,
}

impl RainfallCorrelator {
    pub fn new(radius_km: f64, window_hours: i64, thresholds: RainfallThresholds) -> Self {
        Self {
            radius_km,
            window: ChronoDuration::hours(window_hours),
            thresholds,
        }
    }

    /// Summarise the cycle's rainfall readings around `centroid`.
    ///
    /// The window is anchored at `now` (the cycle's start), not at the
    /// newest reading; rainfall context answers "what fell recently", not
    /// "what fell around the anomalies".
    pub fn summarise(
        &self,
        centroid: &Centroid,
        rainfall: &[Reading],
        now: DateTime<Utc>,
    ) -> RainfallSummary {
        let cutoff = now - self.window;

        let mut total_mm = 0.0;
        let mut max_hourly_mm = 0.0f64;
        let mut gauges: HashSet<&str> = HashSet::new();

        for reading in rainfall {
            if reading.timestamp < cutoff {
                continue;
            }
            let Some(location) = &reading.location else {
                continue;
            };
            if great_circle_km(centroid.lat, centroid.lon, location.lat, location.lon)
                > self.radius_km
            {
                continue;
            }
            total_mm += reading.value;
            max_hourly_mm = max_hourly_mm.max(reading.value);
            gauges.insert(reading.station_id.as_str());
        }

        RainfallSummary {
            total_mm,
            max_hourly_mm,
            gauge_count: gauges.len() as u64,
            category: self.thresholds.categorise(total_mm),
        }
    }
}
