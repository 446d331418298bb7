// Copyright (c) 2025 - Riverwatch Project
//! Anomaly detection
//!
//! The detector is a pluggable seam: the default implementation classifies a
//! reading as anomalous when its value exceeds a fixed threshold configured
//! per `(source, parameter)`. Alternative detectors (z-score over a rolling
//! baseline, for instance) implement [`AnomalyDetector`] without touching
//! the rest of the pipeline.

use std::collections::HashMap;
use tracing::debug;

use crate::domain::{Anomaly, Reading, Source};

/// Detection thresholds keyed by `(source, parameter)`
#[derive(Debug, Clone)]
pub struct AnomalyThresholds {
    table: HashMap<(Source, String), f64>,
}

impl AnomalyThresholds {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with_threshold(
        mut self,
        source: Source,
        parameter: impl Into<String>,
        threshold: f64,
    ) -> Self {
        self.table.insert((source, parameter.into()), threshold);
        self
    }

    pub fn lookup(&self, source: Source, parameter: &str) -> Option<f64> {
        self.table.get(&(source, parameter.to_string())).copied()
    }
}

impl Default for AnomalyThresholds {
    /// Starting points for the standard parameters; deployments override
    /// these per catchment.
    fn default() -> Self {
        Self::new()
            .with_threshold(Source::Flood, "level", 3.0)
            .with_threshold(Source::Hydrology, "flow", 50.0)
    }
}

/// Classifies readings as anomalous
pub trait AnomalyDetector: Send + Sync {
    /// Retain only anomalous readings. Output order is stable with respect
    /// to input order.
    fn classify(&self, readings: &[Reading]) -> Vec<Anomaly>;
}

/// Fixed-threshold detector: anomalous when `value > threshold`
///
/// Readings without coordinates are dropped (they cannot be clustered), as
/// are readings whose `(source, parameter)` has no configured threshold.
/// Readings without a numeric value never reach the detector; the fetchers
/// drop them at parse time.
#[derive(Debug, Clone, Default)]
pub struct ThresholdDetector {
    thresholds: AnomalyThresholds,
}

impl ThresholdDetector {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }
}

impl AnomalyDetector for ThresholdDetector {
    fn classify(&self, readings: &[Reading]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        for reading in readings {
            if !reading.has_location() {
                continue;
            }
            let Some(threshold) = self.thresholds.lookup(reading.source, &reading.parameter)
            else {
                continue;
            };
            if reading.value > threshold {
                anomalies.push(Anomaly {
                    reading: reading.clone(),
                    threshold,
                    exceedance: (reading.value - threshold) / threshold,
                });
            }
        }
        debug!(
            input = readings.len(),
            anomalies = anomalies.len(),
            "classified readings"
        );
        anomalies
    }
}
