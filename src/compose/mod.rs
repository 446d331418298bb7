// Copyright (c) 2025 - Riverwatch Project
//! Incident composition
//!
//! Builds one [`Incident`] per enriched cluster. Priority is a pure
//! function of the cluster's anomalies; permits and rainfall shape only the
//! commentary (summary text and suggested actions), never the priority.

pub mod actions;
pub mod summary;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{content_hash, Cluster, Incident, Permit, Priority, RainfallSummary};

pub use actions::suggested_actions;
pub use summary::{SummaryInput, Summariser, TemplateSummariser};

/// Exceedance fractions at which priority steps up
#[derive(Debug, Clone, Copy)]
pub struct PriorityFractions {
    pub high: f64,
    pub medium: f64,
}

impl Default for PriorityFractions {
    fn default() -> Self {
        Self {
            high: 0.5,
            medium: 0.2,
        }
    }
}

/// Priority for a cluster: the largest exceedance fraction across members,
/// tested against the configured steps
pub fn priority_for(cluster: &Cluster, fractions: &PriorityFractions) -> Priority {
    let worst = cluster.max_exceedance();
    if worst >= fractions.high {
        Priority::High
    } else if worst >= fractions.medium {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Builds incidents from enriched clusters
pub struct IncidentComposer {
    summariser: Arc<dyn Summariser>,
    fractions: PriorityFractions,
}

impl IncidentComposer {
    pub fn new(summariser: Arc<dyn Summariser>, fractions: PriorityFractions) -> Self {
        Self {
            summariser,
            fractions,
        }
    }

    /// Compose one incident from a cluster and its context.
    ///
    /// `created_at` is the cycle's clock; passing it in keeps composition
    /// deterministic for a given input.
    pub async fn compose(
        &self,
        cluster: &Cluster,
        permits: Vec<Permit>,
        rainfall: RainfallSummary,
        run_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Incident {
        let priority = priority_for(cluster, &self.fractions);
        let hash = content_hash(cluster.source_kind, priority, &cluster.members);

        let summary_text = self
            .summariser
            .summarise(&SummaryInput {
                cluster,
                permits: &permits,
                rainfall: &rainfall,
                priority,
            })
            .await;

        let permit_categories: BTreeSet<_> = permits.iter().map(|p| p.category).collect();
        let suggested = suggested_actions(
            cluster.source_kind,
            priority,
            &permit_categories,
            rainfall.category,
        );

        Incident {
            incident_id: Uuid::now_v7(),
            content_hash: hash,
            created_at,
            priority,
            source_kind: cluster.source_kind,
            centroid: cluster.centroid,
            summary_text,
            suggested_actions: suggested,
            readings: cluster.members.iter().map(|a| a.reading.clone()).collect(),
            permits,
            rainfall,
            run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Anomaly, Centroid, Reading, ReadingLocation, Source, SourceKind};
    use pretty_assertions::assert_eq;

    fn cluster_with_exceedance(exceedance: f64) -> Cluster {
        let value = 3.0 * (1.0 + exceedance);
        Cluster {
            members: vec![
                Anomaly {
                    reading: Reading {
                        source: Source::Flood,
                        station_id: "531160".to_string(),
                        parameter: "level".to_string(),
                        value,
                        timestamp: "2026-01-19T12:00:00Z".parse().unwrap(),
                        location: Some(ReadingLocation {
                            lat: 51.08,
                            lon: -2.87,
                            easting: Some(332_000.0),
                            northing: Some(120_500.0),
                            label: "Currymoor".to_string(),
                        }),
                    },
                    threshold: 3.0,
                    exceedance,
                },
                Anomaly {
                    reading: Reading {
                        source: Source::Flood,
                        station_id: "531164".to_string(),
                        parameter: "level".to_string(),
                        value: 3.2,
                        timestamp: "2026-01-19T12:15:00Z".parse().unwrap(),
                        location: Some(ReadingLocation {
                            lat: 51.12,
                            lon: -2.82,
                            easting: Some(335_400.0),
                            northing: Some(124_900.0),
                            label: "Northmoor".to_string(),
                        }),
                    },
                    threshold: 3.0,
                    exceedance: 0.0667,
                },
            ],
            centroid: Centroid {
                lat: 51.10,
                lon: -2.845,
                easting: Some(333_700.0),
                northing: Some(122_700.0),
            },
            source_kind: SourceKind::Flood,
            window_start: "2026-01-19T12:00:00Z".parse().unwrap(),
            window_end: "2026-01-19T12:15:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn priority_steps_at_configured_fractions() {
        let fractions = PriorityFractions::default();
        assert_eq!(
            priority_for(&cluster_with_exceedance(0.1), &fractions),
            Priority::Low
        );
        assert_eq!(
            priority_for(&cluster_with_exceedance(0.2), &fractions),
            Priority::Medium
        );
        assert_eq!(
            priority_for(&cluster_with_exceedance(0.32), &fractions),
            Priority::Medium
        );
        assert_eq!(
            priority_for(&cluster_with_exceedance(0.5), &fractions),
            Priority::High
        );
    }

    #[tokio::test]
    async fn composed_incident_copies_cluster_and_context() {
        let composer = IncidentComposer::new(
            Arc::new(TemplateSummariser),
            PriorityFractions::default(),
        );
        let cluster = cluster_with_exceedance(0.32);
        let run_id = Uuid::now_v7();
        let created_at: DateTime<Utc> = "2026-01-19T12:30:00Z".parse().unwrap();

        let incident = composer
            .compose(
                &cluster,
                Vec::new(),
                RainfallSummary::empty(),
                run_id,
                created_at,
            )
            .await;

        assert_eq!(incident.priority, Priority::Medium);
        assert_eq!(incident.source_kind, SourceKind::Flood);
        assert_eq!(incident.readings.len(), 2);
        assert_eq!(incident.run_id, run_id);
        assert_eq!(incident.created_at, created_at);
        assert!(!incident.suggested_actions.is_empty());
        assert_eq!(incident.content_hash.len(), 64);
    }

    #[tokio::test]
    async fn content_hash_is_stable_across_compositions() {
        let composer = IncidentComposer::new(
            Arc::new(TemplateSummariser),
            PriorityFractions::default(),
        );
        let cluster = cluster_with_exceedance(0.32);
        let created_at: DateTime<Utc> = "2026-01-19T12:30:00Z".parse().unwrap();

        let first = composer
            .compose(
                &cluster,
                Vec::new(),
                RainfallSummary::empty(),
                Uuid::now_v7(),
                created_at,
            )
            .await;
        let second = composer
            .compose(
                &cluster,
                Vec::new(),
                RainfallSummary::empty(),
                Uuid::now_v7(),
                created_at,
            )
            .await;

        assert_eq!(first.content_hash, second.content_hash);
        assert_ne!(first.incident_id, second.incident_id);
    }
}
