// Copyright (c) 2025 - Riverwatch Project
//! Cluster enrichment: regulatory permits and rainfall correlation
//!
//! Enrichment adds context to a cluster before composition. Permit search
//! hits an external register per cluster (bounded fan-out protects it);
//! rainfall correlation is pure in-memory aggregation over the readings the
//! rainfall fetcher already produced this cycle, so it costs no extra
//! upstream calls.

pub mod permits;
pub mod rainfall;

pub use permits::{GeocodeConfig, PermitSearch, PermitSearcher, PermitsConfig};
pub use rainfall::{RainfallCorrelator, RainfallThresholds};
