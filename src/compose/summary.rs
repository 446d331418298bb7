// Copyright (c) 2025 - Riverwatch Project
//! Summariser capability
//!
//! The composer depends only on the [`Summariser`] trait. The shipped
//! implementation renders a deterministic template selected by source kind;
//! an external language model can sit behind the same trait without the
//! pipeline noticing.

use async_trait::async_trait;

use crate::domain::{Cluster, Permit, PermitCategory, Priority, RainfallCategory, RainfallSummary, SourceKind};

/// Maximum length of a rendered summary, in characters
const MAX_SUMMARY_CHARS: usize = 600;

/// Station ids listed before eliding the rest
const MAX_LISTED_STATIONS: usize = 6;

/// Everything a summariser may draw on
pub struct SummaryInput<'a> {
    pub cluster: &'a Cluster,
    pub permits: &'a [Permit],
    pub rainfall: &'a RainfallSummary,
    pub priority: Priority,
}

/// Produces the incident's summary paragraph
#[async_trait]
pub trait Summariser: Send + Sync {
    async fn summarise(&self, input: &SummaryInput<'_>) -> String;
}

/// Deterministic templated summariser
#[derive(Debug, Clone, Default)]
pub struct TemplateSummariser;

#[async_trait]
impl Summariser for TemplateSummariser {
    async fn summarise(&self, input: &SummaryInput<'_>) -> String {
        let cluster = input.cluster;

        let station_ids: Vec<&str> = cluster.station_ids().into_iter().collect();
        let listed = if station_ids.len() > MAX_LISTED_STATIONS {
            format!("{}, …", station_ids[..MAX_LISTED_STATIONS].join(", "))
        } else {
            station_ids.join(", ")
        };

        // Threshold named in the summary is the one the peak reading was
        // classified against.
        let peak = cluster.peak_value();
        let threshold = cluster
            .members
            .iter()
            .max_by(|a, b| a.reading.value.total_cmp(&b.reading.value))
            .map(|a| a.threshold)
            .unwrap_or(0.0);
        let mean = cluster.mean_value();

        let opening = match cluster.source_kind {
            SourceKind::Flood => format!(
                "River levels are elevated at {} station{} ({}). Peak level {:.2} against a threshold of {:.2}, averaging {:.2}.",
                station_ids.len(),
                plural(station_ids.len()),
                listed,
                peak,
                threshold,
                mean,
            ),
            SourceKind::Hydrology => format!(
                "River flows are elevated at {} station{} ({}). Peak flow {:.2} against a threshold of {:.2}, averaging {:.2}.",
                station_ids.len(),
                plural(station_ids.len()),
                listed,
                peak,
                threshold,
                mean,
            ),
            SourceKind::Mixed => format!(
                "Combined level and flow anomalies at {} station{} ({}). Peak reading {:.2} against a threshold of {:.2}, averaging {:.2}.",
                station_ids.len(),
                plural(station_ids.len()),
                listed,
                peak,
                threshold,
                mean,
            ),
        };

        let rainfall = rainfall_phrase(input.rainfall);
        let permits = permit_phrase(input.permits);

        truncate_chars(
            &format!("{} {} {}", opening, rainfall, permits),
            MAX_SUMMARY_CHARS,
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn rainfall_phrase(rainfall: &RainfallSummary) -> String {
    match rainfall.category {
        RainfallCategory::Heavy => format!(
            "Heavy rainfall ({:.1} mm across {} gauges) is a likely driver.",
            rainfall.total_mm, rainfall.gauge_count
        ),
        RainfallCategory::Moderate => format!(
            "Moderate rainfall ({:.1} mm across {} gauges) was recorded nearby.",
            rainfall.total_mm, rainfall.gauge_count
        ),
        RainfallCategory::Light => format!(
            "Light rainfall ({:.1} mm) was recorded nearby.",
            rainfall.total_mm
        ),
        RainfallCategory::None => {
            "No rainfall was recorded nearby, which points away from a weather-driven cause."
                .to_string()
        }
    }
}

fn permit_phrase(permits: &[Permit]) -> String {
    if permits.is_empty() {
        return "No regulated sites lie within the search radius.".to_string();
    }
    let discharges = permits
        .iter()
        .filter(|p| p.category == PermitCategory::Discharge)
        .count();
    if discharges > 0 {
        format!(
            "{} regulated site{} lie within the search radius, including {} discharge permit{}.",
            permits.len(),
            plural(permits.len()),
            discharges,
            plural(discharges),
        )
    } else {
        format!(
            "{} regulated site{} lie within the search radius.",
            permits.len(),
            plural(permits.len()),
        )
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}
