// Copyright (c) 2025 - Riverwatch Project
//! External API call accounting
//!
//! Counters live for the process lifetime; the orchestrator snapshots them
//! at cycle start and reports the delta in the run log.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{ApiCallCounts, Source};

/// Process-lifetime counters for calls to external services
#[derive(Debug, Default)]
pub struct ApiCallCounters {
    flood: AtomicU64,
    hydrology: AtomicU64,
    rainfall: AtomicU64,
    permits: AtomicU64,
    geocode: AtomicU64,
    embedding: AtomicU64,
}

impl ApiCallCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one HTTP attempt against a readings API (retries count)
    pub fn record_fetch(&self, source: Source) {
        let counter = match source {
            Source::Flood => &self.flood,
            Source::Hydrology => &self.hydrology,
            Source::Rainfall => &self.rainfall,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permits(&self) {
        self.permits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_geocode(&self) {
        self.geocode.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_embedding(&self) {
        self.embedding.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ApiCallCounts {
        ApiCallCounts {
            flood: self.flood.load(Ordering::Relaxed),
            hydrology: self.hydrology.load(Ordering::Relaxed),
            rainfall: self.rainfall.load(Ordering::Relaxed),
            permits: self.permits.load(Ordering::Relaxed),
            geocode: self.geocode.load(Ordering::Relaxed),
            embedding: self.embedding.load(Ordering::Relaxed),
        }
    }

    /// Calls made since an earlier snapshot
    pub fn delta_since(&self, earlier: &ApiCallCounts) -> ApiCallCounts {
        let now = self.snapshot();
        ApiCallCounts {
            flood: now.flood - earlier.flood,
            hydrology: now.hydrology - earlier.hydrology,
            rainfall: now.rainfall - earlier.rainfall,
            permits: now.permits - earlier.permits,
            geocode: now.geocode - earlier.geocode,
            embedding: now.embedding - earlier.embedding,
        }
    }
}
