//! Favorited-vs-not cohort comparison: a standardized contrast over every
//! numeric feature the records carry.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config;
use crate::models::{Axis, DiagnosisRecord};

use super::stats;

/// One feature's contrast between the favorited and non-favorited sides.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureContrast {
    pub feature: String,
    pub mean_favorited: f64,
    pub mean_other: f64,
    pub mean_diff: f64,
    /// Cohen's d; None when the pooled deviation is zero.
    pub effect_size: Option<f64>,
    pub n_favorited: usize,
    pub n_other: usize,
}

enum Feature {
    Age,
    Axis(Axis),
    Answer(String),
}

impl Feature {
    fn name(&self) -> String {
        match self {
            Feature::Age => "age".to_string(),
            Feature::Axis(axis) => axis.as_str().to_string(),
            Feature::Answer(key) => key.clone(),
        }
    }

    fn values(&self, rows: &[&DiagnosisRecord]) -> Vec<f64> {
        rows.iter()
            .filter_map(|r| match self {
                Feature::Age => r.age,
                Feature::Axis(axis) => r.axis(*axis),
                Feature::Answer(key) => r.answers.get(key).copied(),
            })
            .filter(|v| v.is_finite())
            .collect()
    }
}

/// Compare the two cohorts over age, the four axis scores, and every
/// observed answer key. Features with fewer than ten observations on
/// either side are silently excluded as under-powered. Output is ranked by
/// absolute effect size descending and truncated to `top_n`.
pub fn compare_cohorts(
    favorited: &[&DiagnosisRecord],
    other: &[&DiagnosisRecord],
    top_n: usize,
) -> Vec<FeatureContrast> {
    let mut features: Vec<Feature> = vec![Feature::Age];
    features.extend(Axis::ALL.into_iter().map(Feature::Axis));

    let mut answer_keys: BTreeSet<String> = BTreeSet::new();
    for row in favorited.iter().chain(other.iter()) {
        answer_keys.extend(row.answers.keys().cloned());
    }
    features.extend(answer_keys.into_iter().map(Feature::Answer));

    let mut contrasts: Vec<FeatureContrast> = features
        .iter()
        .filter_map(|feature| {
            let fav_values = feature.values(favorited);
            let other_values = feature.values(other);
            if fav_values.len() < config::MIN_COHORT_SIDE
                || other_values.len() < config::MIN_COHORT_SIDE
            {
                return None;
            }
            let mean_favorited = stats::mean(&fav_values)?;
            let mean_other = stats::mean(&other_values)?;
            Some(FeatureContrast {
                feature: feature.name(),
                mean_favorited,
                mean_other,
                mean_diff: mean_favorited - mean_other,
                effect_size: stats::cohen_d(&fav_values, &other_values),
                n_favorited: fav_values.len(),
                n_other: other_values.len(),
            })
        })
        .collect();

    contrasts.sort_by(|a, b| {
        let da = a.effect_size.unwrap_or(0.0).abs();
        let db = b.effect_size.unwrap_or(0.0).abs();
        db.total_cmp(&da)
    });
    contrasts.truncate(top_n);
    contrasts
}
