//! Per-view KPI snapshots. Each struct is one view's headline numbers,
//! computed over that view's filtered rows so the figures always agree
//! with the table beneath them.

use serde::Serialize;

use crate::analytics::stats;
use crate::models::{DiagnosisRecord, Gender, RefEventType, ReferralEvent, ViewUnit};
use crate::pipeline::Dataset;

fn rate(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Unfiltered load-screen overview.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardKpis {
    pub diagnosis_records: usize,
    pub favorite_records: usize,
    pub favorite_record_rate: Option<f64>,
    pub favorite_users: usize,
    pub referral_events: usize,
    pub shares: usize,
    pub visits: usize,
    pub completes: usize,
    /// Complete events whose email resolves to a known diagnosis user.
    pub matched_completes: usize,
}

pub fn dashboard_kpis(dataset: &Dataset) -> DashboardKpis {
    let favorite_records = dataset.diagnosis.iter().filter(|r| r.favorited).count();
    let count_type = |wanted: RefEventType| {
        dataset
            .events
            .iter()
            .filter(|e| e.event_type == wanted)
            .count()
    };
    let matched_completes = dataset
        .events
        .iter()
        .filter(|e| e.event_type == RefEventType::ReferralComplete)
        .filter_map(|e| e.user_email_lower.as_deref())
        .filter(|email| dataset.user_by_email(email).is_some())
        .count();

    DashboardKpis {
        diagnosis_records: dataset.diagnosis.len(),
        favorite_records,
        favorite_record_rate: rate(favorite_records, dataset.diagnosis.len()),
        favorite_users: dataset.users.iter().filter(|u| u.has_favorite()).count(),
        referral_events: dataset.events.len(),
        shares: count_type(RefEventType::Share),
        visits: count_type(RefEventType::ReferralVisit),
        completes: count_type(RefEventType::ReferralComplete),
        matched_completes,
    }
}

/// Diagnosis view headline numbers over its filtered rows.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisKpis {
    pub total: usize,
    pub favorites: usize,
    pub favorite_rate: Option<f64>,
    pub unique_emails: usize,
    pub median_age: Option<f64>,
    pub female_rate: Option<f64>,
    pub referred_rate: Option<f64>,
}

pub fn diagnosis_kpis(rows: &[&DiagnosisRecord]) -> DiagnosisKpis {
    let total = rows.len();
    let favorites = rows.iter().filter(|r| r.favorited).count();
    let unique_emails = rows
        .iter()
        .filter_map(|r| r.email_lower.as_deref())
        .collect::<std::collections::HashSet<_>>()
        .len();
    let ages: Vec<f64> = rows.iter().filter_map(|r| r.age).collect();
    let female = rows.iter().filter(|r| r.gender == Gender::Female).count();
    let referred = rows.iter().filter(|r| r.referred).count();

    DiagnosisKpis {
        total,
        favorites,
        favorite_rate: rate(favorites, total),
        unique_emails,
        median_age: stats::median(&ages),
        female_rate: rate(female, total),
        referred_rate: rate(referred, total),
    }
}

/// Favorites view headline numbers: the favorited rows against the whole
/// population and the non-favorite baseline.
#[derive(Debug, Clone, Serialize)]
pub struct FavoritesKpis {
    pub favorites: usize,
    /// Favorited share of the population for the active view unit.
    pub favorite_rate: Option<f64>,
    pub referred_favorites: usize,
    pub referred_rate: Option<f64>,
    /// Most common type label among the favorited rows.
    pub top_type: Option<(String, u64)>,
    pub baseline_size: usize,
}

pub fn favorites_kpis(
    dataset: &Dataset,
    favorites: &[&DiagnosisRecord],
    baseline: &[&DiagnosisRecord],
    unit: ViewUnit,
) -> FavoritesKpis {
    let population = match unit {
        ViewUnit::User => dataset
            .users
            .iter()
            .filter(|u| u.email_lower.is_some())
            .count(),
        ViewUnit::Record => dataset.diagnosis.len(),
    };
    let referred_favorites = favorites.iter().filter(|r| r.referred).count();
    let top_type = stats::top_k(
        favorites.iter().map(|r| r.type_label.clone()),
        1,
    )
    .into_iter()
    .next();

    FavoritesKpis {
        favorites: favorites.len(),
        favorite_rate: rate(favorites.len(), population),
        referred_favorites,
        referred_rate: rate(referred_favorites, favorites.len()),
        top_type,
        baseline_size: baseline.len(),
    }
}

/// Referral view headline numbers over its filtered events.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralKpis {
    pub shares: usize,
    pub unique_visitors: usize,
    pub unique_completes: usize,
    pub share_to_visit: Option<f64>,
    pub visit_to_complete: Option<f64>,
    pub share_to_complete: Option<f64>,
    /// Unique completer emails resolving to a known diagnosis user.
    pub matched_completes: usize,
    pub matched_favorites: usize,
    pub matched_favorite_rate: Option<f64>,
}

pub fn referral_kpis(rows: &[&ReferralEvent], dataset: &Dataset) -> ReferralKpis {
    let shares = rows
        .iter()
        .filter(|e| e.event_type == RefEventType::Share)
        .count();
    let unique_visitors = rows
        .iter()
        .filter(|e| e.event_type == RefEventType::ReferralVisit)
        .filter_map(|e| e.user_id.as_deref())
        .collect::<std::collections::HashSet<_>>()
        .len();
    let unique_completes = rows
        .iter()
        .filter(|e| e.event_type == RefEventType::ReferralComplete)
        .filter_map(|e| e.user_id.as_deref())
        .collect::<std::collections::HashSet<_>>()
        .len();

    let complete_emails: std::collections::HashSet<&str> = rows
        .iter()
        .filter(|e| e.event_type == RefEventType::ReferralComplete)
        .filter_map(|e| e.user_email_lower.as_deref())
        .collect();
    let matched_completes = complete_emails
        .iter()
        .filter(|email| dataset.user_by_email(email).is_some())
        .count();
    let matched_favorites = complete_emails
        .iter()
        .filter(|email| dataset.email_has_favorite(email))
        .count();

    ReferralKpis {
        shares,
        unique_visitors,
        unique_completes,
        share_to_visit: rate(unique_visitors, shares),
        visit_to_complete: rate(unique_completes, unique_visitors),
        share_to_complete: rate(unique_completes, shares),
        matched_completes,
        matched_favorites,
        matched_favorite_rate: rate(matched_favorites, matched_completes),
    }
}
