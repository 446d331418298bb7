// Copyright (c) 2025 - Riverwatch Project
//! Suggested-action rules
//!
//! A static ordered table of rules; the composer selects every rule whose
//! precondition matches and preserves the table's order. An empty
//! precondition field matches anything.

use std::collections::BTreeSet;

use crate::domain::{PermitCategory, Priority, RainfallCategory, SourceKind};

struct ActionRule {
    kinds: Option<&'static [SourceKind]>,
    min_priority: Option<Priority>,
    permit_category: Option<PermitCategory>,
    rainfall: Option<RainfallCategory>,
    action: &'static str,
}

const RULES: &[ActionRule] = &[
    ActionRule {
        kinds: None,
        min_priority: Some(Priority::High),
        permit_category: None,
        rainfall: None,
        action: "Escalate to the duty officer for immediate review.",
    },
    ActionRule {
        kinds: Some(&[SourceKind::Flood, SourceKind::Mixed]),
        min_priority: None,
        permit_category: None,
        rainfall: None,
        action: "Check flood warnings currently in force for the affected reach.",
    },
    ActionRule {
        kinds: Some(&[SourceKind::Hydrology, SourceKind::Mixed]),
        min_priority: None,
        permit_category: None,
        rainfall: None,
        action: "Compare flows against seasonal baselines for the gauging stations involved.",
    },
    ActionRule {
        kinds: None,
        min_priority: None,
        permit_category: Some(PermitCategory::Discharge),
        rainfall: None,
        action: "Review recent compliance records for discharge permits near the centroid.",
    },
    ActionRule {
        kinds: None,
        min_priority: None,
        permit_category: Some(PermitCategory::Waste),
        rainfall: None,
        action: "Check waste operation sites near the centroid for runoff pathways.",
    },
    ActionRule {
        kinds: None,
        min_priority: None,
        permit_category: Some(PermitCategory::Abstraction),
        rainfall: None,
        action: "Verify abstraction licences near the centroid are operating within conditions.",
    },
    ActionRule {
        kinds: None,
        min_priority: None,
        permit_category: None,
        rainfall: Some(RainfallCategory::None),
        action: "No rainfall recorded: investigate non-weather causes such as unauthorised discharges.",
    },
    ActionRule {
        kinds: None,
        min_priority: None,
        permit_category: None,
        rainfall: Some(RainfallCategory::Heavy),
        action: "Heavy rainfall recorded: treat as a likely hydrological response and monitor recession.",
    },
    ActionRule {
        kinds: None,
        min_priority: None,
        permit_category: None,
        rainfall: None,
        action: "Monitor the affected stations over the next cycle.",
    },
];

/// Actions whose preconditions match, in table order
pub fn suggested_actions(
    kind: SourceKind,
    priority: Priority,
    permit_categories: &BTreeSet<PermitCategory>,
    rainfall: RainfallCategory,
) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| {
            rule.kinds.map_or(true, |kinds| kinds.contains(&kind))
                && rule.min_priority.map_or(true, |min| priority >= min)
                && rule
                    .permit_category
                    .map_or(true, |cat| permit_categories.contains(&cat))
                && rule.rainfall.map_or(true, |cat| cat == rainfall)
        })
        .map(|rule| rule.action.to_string())
        .collect()
}
