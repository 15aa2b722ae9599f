//! View assembly: apply one filter uniformly over a view's base rows.
//!
//! The diagnosis and favorites views share `RecordFilter`; the only
//! differences between views are their base row sets (all records, latest
//! per user, favorited subset, non-favorite baseline), which are explicit
//! here rather than special cases inside the filter engine.

use crate::models::{DiagnosisRecord, EventFilter, RecordFilter, ReferralEvent, ViewUnit};
use crate::pipeline::Dataset;

/// Diagnosis view rows: every record, or each user's latest record.
pub fn filter_diagnosis<'a>(
    dataset: &'a Dataset,
    filter: &RecordFilter,
    unit: ViewUnit,
) -> Vec<&'a DiagnosisRecord> {
    let base: Vec<&DiagnosisRecord> = match unit {
        ViewUnit::Record => dataset.diagnosis.iter().collect(),
        ViewUnit::User => dataset.users.iter().map(|u| &u.latest).collect(),
    };
    base.into_iter().filter(|r| filter.matches(r)).collect()
}

/// Favorites view rows: favorited records, or each user's latest favorited
/// record.
pub fn filter_favorites<'a>(
    dataset: &'a Dataset,
    filter: &RecordFilter,
    unit: ViewUnit,
) -> Vec<&'a DiagnosisRecord> {
    let base: Vec<&DiagnosisRecord> = match unit {
        ViewUnit::Record => dataset.diagnosis.iter().filter(|r| r.favorited).collect(),
        ViewUnit::User => dataset
            .users
            .iter()
            .filter_map(|u| u.latest_favorite.as_ref())
            .collect(),
    };
    base.into_iter().filter(|r| filter.matches(r)).collect()
}

/// Comparison baseline for the favorites view: the non-favorited side under
/// the same filter, with the referrer selector explicitly reset so the
/// baseline is not narrowed to one referrer's audience.
pub fn non_favorite_baseline<'a>(
    dataset: &'a Dataset,
    filter: &RecordFilter,
    unit: ViewUnit,
) -> Vec<&'a DiagnosisRecord> {
    let filter = filter.without_referral();
    let base: Vec<&DiagnosisRecord> = match unit {
        ViewUnit::Record => dataset.diagnosis.iter().filter(|r| !r.favorited).collect(),
        ViewUnit::User => dataset
            .users
            .iter()
            .filter(|u| !u.has_favorite())
            .map(|u| &u.latest)
            .collect(),
    };
    base.into_iter().filter(|r| filter.matches(r)).collect()
}

/// Referral event view rows.
pub fn filter_events<'a>(dataset: &'a Dataset, filter: &EventFilter) -> Vec<&'a ReferralEvent> {
    dataset
        .events
        .iter()
        .filter(|ev| filter.matches(ev))
        .collect()
}
