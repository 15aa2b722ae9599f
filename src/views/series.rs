//! Chart-ready series: plain category/value pairs, time series, histogram
//! bins, correlation matrices, box-plot groups, funnel stages, and flow
//! edges. The presentation layer draws these verbatim.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::network::WeightedEdge;
use crate::analytics::stats;
use crate::config;
use crate::mask::{self, Masking};
use crate::models::{Axis, DiagnosisRecord, FlowEdge, RefEventType, ReferralEvent};
use crate::pipeline::Dataset;

/// One labeled value — bar charts, rate series, mean differences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValue {
    pub label: String,
    pub value: f64,
}

/// Daily diagnosis activity: submissions and favorited submissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisDailyPoint {
    pub date: String,
    pub records: u64,
    pub favorites: u64,
}

pub fn diagnosis_daily(rows: &[&DiagnosisRecord]) -> Vec<DiagnosisDailyPoint> {
    let mut by_day: BTreeMap<String, DiagnosisDailyPoint> = BTreeMap::new();
    for row in rows {
        let Some(date) = &row.created_date else { continue };
        let point = by_day
            .entry(date.clone())
            .or_insert_with(|| DiagnosisDailyPoint {
                date: date.clone(),
                records: 0,
                favorites: 0,
            });
        point.records += 1;
        if row.favorited {
            point.favorites += 1;
        }
    }
    by_day.into_values().collect()
}

/// Daily referral funnel activity over a filtered event window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferralDailyPoint {
    pub date: String,
    pub share: u64,
    pub visit: u64,
    pub complete: u64,
}

pub fn referral_daily(rows: &[&ReferralEvent]) -> Vec<ReferralDailyPoint> {
    let mut by_day: BTreeMap<String, ReferralDailyPoint> = BTreeMap::new();
    for event in rows {
        let Some(date) = &event.date else { continue };
        let point = by_day
            .entry(date.clone())
            .or_insert_with(|| ReferralDailyPoint {
                date: date.clone(),
                share: 0,
                visit: 0,
                complete: 0,
            });
        match event.event_type {
            RefEventType::Share => point.share += 1,
            RefEventType::ReferralVisit => point.visit += 1,
            RefEventType::ReferralComplete => point.complete += 1,
            RefEventType::Other(_) => {}
        }
    }
    by_day.into_values().collect()
}

/// Type distribution, largest first, truncated to `top`.
pub fn type_counts(rows: &[&DiagnosisRecord], top: usize) -> Vec<CategoryValue> {
    stats::top_k(rows.iter().map(|r| r.type_label.clone()), top)
        .into_iter()
        .map(|(label, count)| CategoryValue {
            label,
            value: count as f64,
        })
        .collect()
}

/// Share-platform distribution over a filtered event window.
pub fn platform_counts(rows: &[&ReferralEvent], top: usize) -> Vec<CategoryValue> {
    let shares = rows
        .iter()
        .filter(|e| e.event_type == RefEventType::Share)
        .map(|e| e.platform_key().to_string());
    stats::top_k(shares, top)
        .into_iter()
        .map(|(label, count)| CategoryValue {
            label,
            value: count as f64,
        })
        .collect()
}

/// A per-type rate with its group size, so small groups can be labeled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRate {
    pub label: String,
    pub rate: f64,
    pub n: usize,
}

/// Favorite rate per type, descending, excluding groups below the minimum
/// size floor.
pub fn favorite_rate_by_type(rows: &[&DiagnosisRecord], top: usize) -> Vec<TypeRate> {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for row in rows {
        let group = groups.entry(row.type_label.as_str()).or_insert((0, 0));
        group.0 += 1;
        if row.favorited {
            group.1 += 1;
        }
    }
    let mut rates: Vec<TypeRate> = groups
        .into_iter()
        .filter(|(_, (n, _))| *n >= config::MIN_RATE_GROUP)
        .map(|(label, (n, favorites))| TypeRate {
            label: label.to_string(),
            rate: favorites as f64 / n as f64,
            n,
        })
        .collect();
    rates.sort_by(|a, b| b.rate.total_cmp(&a.rate));
    rates.truncate(top);
    rates
}

/// One histogram bin over `[lo, hi)`; the last bin is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: u64,
}

/// Fixed-bin histogram over the finite values. A constant sample collapses
/// to a single bin; an empty one to no bins.
pub fn histogram(values: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    let xs: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if xs.is_empty() || bin_count == 0 {
        return Vec::new();
    }
    let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            lo: min,
            hi: max,
            count: xs.len() as u64,
        }];
    }

    let width = (max - min) / bin_count as f64;
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lo: min + i as f64 * width,
            hi: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for value in xs {
        let mut index = ((value - min) / width) as usize;
        if index >= bin_count {
            index = bin_count - 1;
        }
        bins[index].count += 1;
    }
    bins
}

/// Pairwise-Pearson matrix over the numeric diagnosis features: the four
/// axis scores, age, and the favorited flag as 0/1.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// `values[i][j]` is the correlation between labels i and j; None when
    /// fewer than three complete pairs exist.
    pub values: Vec<Vec<Option<f64>>>,
}

pub fn feature_correlations(rows: &[&DiagnosisRecord]) -> CorrelationMatrix {
    let mut labels: Vec<String> = Axis::ALL.iter().map(|a| a.as_str().to_string()).collect();
    labels.push("age".to_string());
    labels.push("favorite".to_string());

    let mut vectors: Vec<Vec<Option<f64>>> = Axis::ALL
        .iter()
        .map(|axis| rows.iter().map(|r| r.axis(*axis)).collect())
        .collect();
    vectors.push(rows.iter().map(|r| r.age).collect());
    vectors.push(
        rows.iter()
            .map(|r| Some(if r.favorited { 1.0 } else { 0.0 }))
            .collect(),
    );

    let values = vectors
        .iter()
        .map(|a| vectors.iter().map(|b| stats::pearson(a, b)).collect())
        .collect();

    CorrelationMatrix { labels, values }
}

/// One box-plot group: the finite values of a numeric feature for one
/// category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
}

/// Axis values grouped by type label, largest groups first, truncated to
/// `top` groups.
pub fn axis_by_type(rows: &[&DiagnosisRecord], axis: Axis, top: usize) -> Vec<BoxGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let Some(value) = row.axis(axis) else { continue };
        if !value.is_finite() {
            continue;
        }
        if !groups.contains_key(&row.type_label) {
            order.push(row.type_label.clone());
        }
        groups.entry(row.type_label.clone()).or_default().push(value);
    }

    let mut out: Vec<BoxGroup> = order
        .into_iter()
        .map(|label| {
            let values = groups.remove(&label).expect("collected above");
            BoxGroup { label, values }
        })
        .collect();
    out.sort_by(|a, b| b.values.len().cmp(&a.values.len()));
    out.truncate(top);
    out
}

/// Per-answer-key mean difference between two row sets (favorited minus
/// baseline), ranked by absolute difference, excluding keys below the
/// minimum per-side floor.
pub fn answer_mean_diffs(
    favorited: &[&DiagnosisRecord],
    baseline: &[&DiagnosisRecord],
    min_side: usize,
    top: usize,
) -> Vec<CategoryValue> {
    let mut keys: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
    for row in favorited.iter().chain(baseline.iter()) {
        keys.extend(row.answers.keys().map(String::as_str));
    }

    let side = |rows: &[&DiagnosisRecord], key: &str| -> Vec<f64> {
        rows.iter()
            .filter_map(|r| r.answers.get(key).copied())
            .filter(|v| v.is_finite())
            .collect()
    };

    let mut diffs: Vec<CategoryValue> = keys
        .into_iter()
        .filter_map(|key| {
            let fav = side(favorited, key);
            let base = side(baseline, key);
            if fav.len() < min_side || base.len() < min_side {
                return None;
            }
            Some(CategoryValue {
                label: key.to_string(),
                value: stats::mean(&fav)? - stats::mean(&base)?,
            })
        })
        .collect();
    diffs.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    diffs.truncate(top);
    diffs
}

/// Axis mean differences between two row sets, one entry per axis.
pub fn axis_mean_diffs(
    favorited: &[&DiagnosisRecord],
    baseline: &[&DiagnosisRecord],
) -> Vec<CategoryValue> {
    Axis::ALL
        .iter()
        .map(|axis| {
            let side = |rows: &[&DiagnosisRecord]| -> Vec<f64> {
                rows.iter().filter_map(|r| r.axis(*axis)).collect()
            };
            CategoryValue {
                label: axis.as_str().to_string(),
                value: stats::mean(&side(favorited)).unwrap_or(0.0)
                    - stats::mean(&side(baseline)).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Funnel stage values over a filtered event window: shares, unique
/// visitors, unique completers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub label: String,
    pub value: u64,
}

pub fn funnel(rows: &[&ReferralEvent]) -> Vec<FunnelStage> {
    let shares = rows
        .iter()
        .filter(|e| e.event_type == RefEventType::Share)
        .count() as u64;
    let unique = |wanted: RefEventType| {
        rows.iter()
            .filter(|e| e.event_type == wanted)
            .filter_map(|e| e.user_id.as_deref())
            .collect::<std::collections::HashSet<_>>()
            .len() as u64
    };
    vec![
        FunnelStage {
            label: "share".to_string(),
            value: shares,
        },
        FunnelStage {
            label: "visit".to_string(),
            value: unique(RefEventType::ReferralVisit),
        },
        FunnelStage {
            label: "complete".to_string(),
            value: unique(RefEventType::ReferralComplete),
        },
    ]
}

/// Which referral edge list feeds a flow diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEdgeKind {
    Visits,
    Completes,
}

fn endpoint_labels(dataset: &Dataset, edge: &FlowEdge, masking: Masking) -> (String, String) {
    if masking.is_masked() {
        return (
            format!("R:{}", mask::mask_id(mask::REFERRER_TAG, &edge.referrer_id)),
            format!("U:{}", mask::mask_id(mask::USER_TAG, &edge.user_id)),
        );
    }
    let source = dataset
        .graph
        .referrer_meta
        .get(&edge.referrer_id)
        .map(|meta| meta.endpoint_label().to_string())
        .unwrap_or_else(|| edge.referrer_id.clone());
    let target = dataset
        .graph
        .user_meta
        .get(&edge.user_id)
        .map(|meta| meta.endpoint_label().to_string())
        .unwrap_or_else(|| edge.user_id.clone());
    (source, target)
}

/// Weighted edge list for flow diagrams and the network analyzer, with
/// endpoints labeled per the active masking state and edges below
/// `min_value` dropped.
pub fn flow_edges(
    dataset: &Dataset,
    kind: FlowEdgeKind,
    min_value: u64,
    masking: Masking,
) -> Vec<WeightedEdge> {
    let edges = match kind {
        FlowEdgeKind::Visits => &dataset.graph.visit_edges,
        FlowEdgeKind::Completes => &dataset.graph.complete_edges,
    };
    edges
        .iter()
        .filter(|edge| edge.value >= min_value)
        .map(|edge| {
            let (source, target) = endpoint_labels(dataset, edge, masking);
            WeightedEdge::new(source, target, edge.value as f64)
        })
        .collect()
}
