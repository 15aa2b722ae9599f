//! Table row sets for the presentation layer. Every identifier column is
//! built through the active masking state, so raw and pseudonymized
//! variants of each table come from the same constructor.

use serde::Serialize;

use crate::analytics::leaderboard::{InviteeRow, ReferrerStats};
use crate::mask::{self, Masking};
use crate::models::{DiagnosisRecord, RefEventType, ReferralEvent};

/// User identifier for a diagnosis record under the active masking state:
/// masked key (email, falling back to a row marker) or the raw email.
fn user_cell(record: &DiagnosisRecord, masking: Masking) -> Option<String> {
    if masking.is_masked() {
        let key = record
            .email_lower
            .clone()
            .or_else(|| record.email.clone())
            .unwrap_or_else(|| format!("row-{}", record.row));
        Some(mask::mask_id(mask::USER_TAG, &key))
    } else {
        record.email.clone()
    }
}

fn referrer_cell(referrer_id: Option<&str>, masking: Masking) -> Option<String> {
    referrer_id.map(|id| {
        if masking.is_masked() {
            mask::mask_id(mask::REFERRER_TAG, id)
        } else {
            id.to_string()
        }
    })
}

/// One diagnosis table row.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisRow {
    pub created_at: Option<String>,
    pub type_label: String,
    pub gender: String,
    pub age: Option<String>,
    pub axis_a: Option<f64>,
    pub axis_b: Option<f64>,
    pub axis_c: Option<f64>,
    pub axis_d: Option<f64>,
    pub favorite: u8,
    pub referred: u8,
    pub referrer: Option<String>,
    pub user: Option<String>,
    pub row: usize,
}

pub fn diagnosis_rows(records: &[&DiagnosisRecord], masking: Masking) -> Vec<DiagnosisRow> {
    records
        .iter()
        .map(|r| DiagnosisRow {
            created_at: r.created_at_raw.clone(),
            type_label: r.type_label.clone(),
            gender: r.gender.as_str().to_string(),
            age: r.age_raw.clone(),
            axis_a: r.axis_a,
            axis_b: r.axis_b,
            axis_c: r.axis_c,
            axis_d: r.axis_d,
            favorite: r.favorited as u8,
            referred: r.referred as u8,
            referrer: referrer_cell(r.referrer_id.as_deref(), masking),
            user: user_cell(r, masking),
            row: r.row,
        })
        .collect()
}

/// One favorites table row — the diagnosis shape minus the favorite flag,
/// which is constant in that view.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteRow {
    pub created_at: Option<String>,
    pub type_label: String,
    pub gender: String,
    pub age: Option<String>,
    pub axis_a: Option<f64>,
    pub axis_b: Option<f64>,
    pub axis_c: Option<f64>,
    pub axis_d: Option<f64>,
    pub referred: u8,
    pub referrer: Option<String>,
    pub user: Option<String>,
    pub row: usize,
}

pub fn favorite_rows(records: &[&DiagnosisRecord], masking: Masking) -> Vec<FavoriteRow> {
    records
        .iter()
        .map(|r| FavoriteRow {
            created_at: r.created_at_raw.clone(),
            type_label: r.type_label.clone(),
            gender: r.gender.as_str().to_string(),
            age: r.age_raw.clone(),
            axis_a: r.axis_a,
            axis_b: r.axis_b,
            axis_c: r.axis_c,
            axis_d: r.axis_d,
            referred: r.referred as u8,
            referrer: referrer_cell(r.referrer_id.as_deref(), masking),
            user: user_cell(r, masking),
            row: r.row,
        })
        .collect()
}

/// One referral event table row.
#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub timestamp: Option<String>,
    pub event_type: String,
    pub platform: Option<String>,
    pub referrer: Option<String>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub row: usize,
}

pub fn event_rows(events: &[&ReferralEvent], masking: Masking) -> Vec<EventRow> {
    events
        .iter()
        .map(|e| {
            // the table shows the share actor in the referrer column
            let referrer_id = if e.event_type == RefEventType::Share {
                e.share_actor_id()
            } else {
                e.referrer_id.as_deref()
            };
            let user_email = e.user_email.as_ref().map(|email| {
                if masking.is_masked() {
                    let key = e.user_email_lower.as_deref().unwrap_or(email.as_str());
                    mask::mask_id(mask::USER_TAG, key)
                } else {
                    email.clone()
                }
            });
            EventRow {
                timestamp: e.timestamp_raw.clone(),
                event_type: e.event_type.as_str().to_string(),
                platform: e.platform.clone(),
                referrer: referrer_cell(referrer_id, masking),
                user_id: e.user_id.as_ref().map(|id| {
                    if masking.is_masked() {
                        mask::mask_id(mask::USER_TAG, id)
                    } else {
                        id.clone()
                    }
                }),
                user_email,
                row: e.row,
            }
        })
        .collect()
}

/// One leaderboard table row.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub referrer: String,
    pub shares: u64,
    pub unique_visitors: usize,
    pub unique_completes: usize,
    pub share_to_visit: Option<f64>,
    pub visit_to_complete: Option<f64>,
    pub share_to_complete: Option<f64>,
    pub mean_hours_to_complete: Option<f64>,
    pub median_hours_to_complete: Option<f64>,
    pub matched_favorite_rate: Option<f64>,
}

pub fn leaderboard_rows(stats: &[ReferrerStats], masking: Masking) -> Vec<LeaderboardRow> {
    stats
        .iter()
        .map(|s| LeaderboardRow {
            referrer: if masking.is_masked() {
                mask::mask_id(mask::REFERRER_TAG, &s.referrer_id)
            } else {
                s.label.clone()
            },
            shares: s.shares,
            unique_visitors: s.unique_visitors,
            unique_completes: s.unique_completes,
            share_to_visit: s.share_to_visit,
            visit_to_complete: s.visit_to_complete,
            share_to_complete: s.share_to_complete,
            mean_hours_to_complete: s.mean_hours_to_complete,
            median_hours_to_complete: s.median_hours_to_complete,
            matched_favorite_rate: s.matched_favorite_rate,
        })
        .collect()
}

/// One referrer-drill-down edge row: an invitee's journey plus the
/// diagnosis match flags.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeRow {
    pub user: String,
    pub visits: u64,
    pub completes: u64,
    pub hours: Option<f64>,
    pub matched_email: Option<String>,
    pub diagnosis_match: bool,
    pub favorited: bool,
}

pub fn edge_rows(invitees: &[InviteeRow], masking: Masking) -> Vec<EdgeRow> {
    invitees
        .iter()
        .map(|row| EdgeRow {
            user: if masking.is_masked() {
                mask::mask_id(mask::USER_TAG, &row.user_id)
            } else {
                row.user_id.clone()
            },
            visits: row.visits,
            completes: row.completes,
            hours: row.hours,
            matched_email: row.email_lower.as_ref().map(|email| {
                if masking.is_masked() {
                    mask::mask_id(mask::USER_TAG, email)
                } else {
                    email.clone()
                }
            }),
            diagnosis_match: row.diagnosis_match,
            favorited: row.favorited,
        })
        .collect()
}
