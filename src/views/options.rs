//! Option lists and date spans for populating filter controls.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::RefEventType;
use crate::pipeline::Dataset;

/// Earliest/latest calendar day observed in a view, for default date
/// filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSpan {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

fn span<'a, I: Iterator<Item = &'a str>>(dates: I) -> DateSpan {
    let sorted: BTreeSet<&str> = dates.collect();
    DateSpan {
        earliest: sorted.iter().next().map(|d| d.to_string()),
        latest: sorted.iter().next_back().map(|d| d.to_string()),
    }
}

pub fn diagnosis_date_span(dataset: &Dataset) -> DateSpan {
    span(dataset.diagnosis.iter().filter_map(|r| r.created_date.as_deref()))
}

pub fn event_date_span(dataset: &Dataset) -> DateSpan {
    span(dataset.events.iter().filter_map(|e| e.date.as_deref()))
}

/// Distinct diagnosis type labels, sorted.
pub fn type_options(dataset: &Dataset) -> Vec<String> {
    dataset
        .diagnosis
        .iter()
        .map(|r| r.type_label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct share platforms, sorted, using the unknown default key.
pub fn platform_options(dataset: &Dataset) -> Vec<String> {
    dataset
        .events
        .iter()
        .filter(|e| e.event_type == RefEventType::Share)
        .map(|e| e.platform_key().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct referrer ids, sorted: everyone with share meta plus every edge
/// source, so referrers without meta still appear in the selector.
pub fn referrer_options(dataset: &Dataset) -> Vec<String> {
    let mut ids: BTreeSet<&str> = dataset
        .graph
        .referrer_meta
        .keys()
        .map(String::as_str)
        .collect();
    for edge in dataset
        .graph
        .visit_edges
        .iter()
        .chain(dataset.graph.complete_edges.iter())
    {
        ids.insert(edge.referrer_id.as_str());
    }
    ids.into_iter().map(str::to_string).collect()
}
