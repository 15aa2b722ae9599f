//! Referrer leaderboard and per-referrer drill-down.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ReferralEvent;
use crate::models::RefEventType;
use crate::pipeline::Dataset;

use super::stats;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// One leaderboard row, fully derived from the event window it was built
/// over.
#[derive(Debug, Clone, Serialize)]
pub struct ReferrerStats {
    pub referrer_id: String,
    /// Display label: meta name, then email, then the raw id.
    pub label: String,
    pub shares: u64,
    pub shares_by_platform: BTreeMap<String, u64>,
    pub unique_visitors: usize,
    pub unique_completes: usize,
    /// Conversion ratios; None whenever the denominator is zero.
    pub share_to_visit: Option<f64>,
    pub visit_to_complete: Option<f64>,
    pub share_to_complete: Option<f64>,
    pub mean_hours_to_complete: Option<f64>,
    pub median_hours_to_complete: Option<f64>,
    /// Completes whose email resolved to a known diagnosis user.
    pub matched_completes: u64,
    pub matched_favorites: u64,
    pub matched_favorite_rate: Option<f64>,
}

#[derive(Default)]
struct Accumulator {
    shares: u64,
    shares_by_platform: BTreeMap<String, u64>,
    visit_users: HashSet<String>,
    complete_users: HashSet<String>,
    hours_to_complete: Vec<f64>,
    matched_completes: u64,
    matched_favorites: u64,
}

fn ratio(numerator: usize, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Accumulator for a referrer id, created on first sight so output keeps
/// first-seen order ahead of ranking.
fn accumulator<'a>(
    by_referrer: &'a mut HashMap<String, Accumulator>,
    order: &mut Vec<String>,
    id: &str,
) -> &'a mut Accumulator {
    if !by_referrer.contains_key(id) {
        order.push(id.to_string());
        by_referrer.insert(id.to_string(), Accumulator::default());
    }
    by_referrer.get_mut(id).expect("inserted above")
}

/// Build per-referrer stats over a pre-filtered event window (the caller
/// applies the dates-only override) and rank them: unique completes desc,
/// unique visitors desc, shares desc.
pub fn build_leaderboard(events: &[&ReferralEvent], dataset: &Dataset) -> Vec<ReferrerStats> {
    // first visit per (referrer, user), for time-to-complete
    let mut first_visit: HashMap<(&str, &str), i64> = HashMap::new();
    for event in events {
        if event.event_type != RefEventType::ReferralVisit {
            continue;
        }
        let (Some(rid), Some(uid)) = (event.referrer_id.as_deref(), event.user_id.as_deref())
        else {
            continue;
        };
        let Some(ts) = event.timestamp else { continue };
        let ms = ts.timestamp_millis();
        first_visit
            .entry((rid, uid))
            .and_modify(|existing| *existing = (*existing).min(ms))
            .or_insert(ms);
    }

    let mut order: Vec<String> = Vec::new();
    let mut by_referrer: HashMap<String, Accumulator> = HashMap::new();

    for event in events {
        if event.event_type == RefEventType::Share {
            let Some(actor) = event.share_actor_id() else { continue };
            let acc = accumulator(&mut by_referrer, &mut order, actor);
            acc.shares += 1;
            *acc
                .shares_by_platform
                .entry(event.platform_key().to_string())
                .or_insert(0) += 1;
            continue;
        }

        let Some(rid) = event.referrer_id.clone() else { continue };
        let acc = accumulator(&mut by_referrer, &mut order, &rid);

        match &event.event_type {
            RefEventType::ReferralVisit => {
                if let Some(uid) = &event.user_id {
                    acc.visit_users.insert(uid.clone());
                }
            }
            RefEventType::ReferralComplete => {
                let Some(uid) = &event.user_id else { continue };
                acc.complete_users.insert(uid.clone());

                if let (Some(visit_ms), Some(ts)) =
                    (first_visit.get(&(rid.as_str(), uid.as_str())), event.timestamp)
                {
                    let complete_ms = ts.timestamp_millis();
                    if complete_ms >= *visit_ms {
                        acc.hours_to_complete
                            .push((complete_ms - visit_ms) as f64 / MS_PER_HOUR);
                    }
                }

                if let Some(email) = &event.user_email_lower {
                    if dataset.user_by_email(email).is_some() {
                        acc.matched_completes += 1;
                        if dataset.email_has_favorite(email) {
                            acc.matched_favorites += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut rows: Vec<ReferrerStats> = order
        .into_iter()
        .map(|referrer_id| {
            let acc = by_referrer.remove(&referrer_id).expect("collected above");
            let label = dataset
                .graph
                .referrer_meta
                .get(&referrer_id)
                .map(|meta| meta.label().to_string())
                .unwrap_or_else(|| referrer_id.clone());
            let visitors = acc.visit_users.len();
            let completes = acc.complete_users.len();
            ReferrerStats {
                label,
                shares: acc.shares,
                shares_by_platform: acc.shares_by_platform,
                unique_visitors: visitors,
                unique_completes: completes,
                share_to_visit: ratio(visitors, acc.shares),
                visit_to_complete: ratio(completes, visitors as u64),
                share_to_complete: ratio(completes, acc.shares),
                mean_hours_to_complete: stats::mean(&acc.hours_to_complete),
                median_hours_to_complete: stats::median(&acc.hours_to_complete),
                matched_completes: acc.matched_completes,
                matched_favorites: acc.matched_favorites,
                matched_favorite_rate: if acc.matched_completes > 0 {
                    Some(acc.matched_favorites as f64 / acc.matched_completes as f64)
                } else {
                    None
                },
                referrer_id,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.unique_completes
            .cmp(&a.unique_completes)
            .then(b.unique_visitors.cmp(&a.unique_visitors))
            .then(b.shares.cmp(&a.shares))
    });
    rows
}

/// One invitee's journey with a single referrer, for the drill-down table.
#[derive(Debug, Clone, Serialize)]
pub struct InviteeRow {
    pub user_id: String,
    pub visits: u64,
    pub completes: u64,
    pub first_visit: Option<DateTime<Utc>>,
    pub first_complete: Option<DateTime<Utc>>,
    /// Hours between first visit and first complete; None unless ordered.
    pub hours: Option<f64>,
    /// Completer email as seen on this referrer's complete events.
    pub email_lower: Option<String>,
    pub diagnosis_match: bool,
    pub favorited: bool,
}

/// Drill-down for one referrer over a pre-filtered event window (dates +
/// pinned referrer).
#[derive(Debug, Clone, Serialize)]
pub struct ReferrerDetail {
    pub referrer_id: String,
    pub label: String,
    pub shares: u64,
    pub unique_visitors: usize,
    pub unique_completes: usize,
    pub matched_completes: usize,
    pub matched_favorites: usize,
    /// Time-to-complete sample, one entry per ordered complete event.
    pub hours_to_complete: Vec<f64>,
    pub invitees: Vec<InviteeRow>,
}

pub fn referrer_detail(
    events: &[&ReferralEvent],
    dataset: &Dataset,
    referrer_id: &str,
) -> ReferrerDetail {
    let mut shares = 0u64;
    let mut first_visit: HashMap<&str, i64> = HashMap::new();

    for event in events {
        match event.event_type {
            RefEventType::Share => shares += 1,
            RefEventType::ReferralVisit => {
                let (Some(uid), Some(ts)) = (event.user_id.as_deref(), event.timestamp) else {
                    continue;
                };
                let ms = ts.timestamp_millis();
                first_visit
                    .entry(uid)
                    .and_modify(|existing| *existing = (*existing).min(ms))
                    .or_insert(ms);
            }
            _ => {}
        }
    }

    let mut hours_to_complete = Vec::new();
    let mut complete_emails: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut by_user: HashMap<String, InviteeRow> = HashMap::new();

    for event in events {
        let Some(uid) = event.user_id.clone() else { continue };
        if !by_user.contains_key(&uid) {
            order.push(uid.clone());
            by_user.insert(
                uid.clone(),
                InviteeRow {
                    user_id: uid.clone(),
                    visits: 0,
                    completes: 0,
                    first_visit: None,
                    first_complete: None,
                    hours: None,
                    email_lower: None,
                    diagnosis_match: false,
                    favorited: false,
                },
            );
        }
        let row = by_user.get_mut(&uid).expect("inserted above");

        match event.event_type {
            RefEventType::ReferralVisit => {
                row.visits += 1;
                if let Some(ts) = event.timestamp {
                    row.first_visit = Some(row.first_visit.map_or(ts, |v| v.min(ts)));
                }
            }
            RefEventType::ReferralComplete => {
                row.completes += 1;
                if let Some(ts) = event.timestamp {
                    row.first_complete = Some(row.first_complete.map_or(ts, |c| c.min(ts)));
                    if let Some(visit_ms) = first_visit.get(uid.as_str()) {
                        let complete_ms = ts.timestamp_millis();
                        if complete_ms >= *visit_ms {
                            hours_to_complete.push((complete_ms - visit_ms) as f64 / MS_PER_HOUR);
                        }
                    }
                }
                if let Some(email) = &event.user_email_lower {
                    row.email_lower = Some(email.clone());
                    complete_emails.insert(email.as_str());
                }
            }
            _ => {}
        }
    }

    let mut matched_completes = 0;
    let mut matched_favorites = 0;
    for email in &complete_emails {
        if dataset.user_by_email(email).is_some() {
            matched_completes += 1;
            if dataset.email_has_favorite(email) {
                matched_favorites += 1;
            }
        }
    }

    let mut invitees: Vec<InviteeRow> = order
        .into_iter()
        .map(|uid| {
            let mut row = by_user.remove(&uid).expect("collected above");
            if let (Some(visit), Some(complete)) = (row.first_visit, row.first_complete) {
                if complete >= visit {
                    row.hours =
                        Some((complete - visit).num_milliseconds() as f64 / MS_PER_HOUR);
                }
            }
            if let Some(email) = &row.email_lower {
                row.diagnosis_match = dataset.user_by_email(email).is_some();
                row.favorited = dataset.email_has_favorite(email);
            }
            row
        })
        .collect();
    invitees.sort_by(|a, b| {
        b.completes
            .cmp(&a.completes)
            .then(b.visits.cmp(&a.visits))
    });

    let unique_visitors = invitees.iter().filter(|r| r.visits > 0).count();
    let unique_completes = invitees.iter().filter(|r| r.completes > 0).count();
    let label = dataset
        .graph
        .referrer_meta
        .get(referrer_id)
        .map(|meta| meta.endpoint_label().to_string())
        .unwrap_or_else(|| referrer_id.to_string());

    ReferrerDetail {
        referrer_id: referrer_id.to_string(),
        label,
        shares,
        unique_visitors,
        unique_completes,
        matched_completes,
        matched_favorites,
        hours_to_complete,
        invitees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::filtering::filter_events;
    use crate::ingest::{RawRow, TableSet};
    use crate::models::EventFilter;

    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<RawRow> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn dataset() -> Dataset {
        let mut tables = TableSet::new();
        tables.insert(
            "diagnosis",
            rows(json!([
                {"email": "u1@x.com", "createdAt": "2024-05-01T00:00:00Z", "interested": 1},
                {"email": "u2@x.com", "createdAt": "2024-05-01T00:00:00Z"}
            ])),
        );
        tables.insert(
            "referral_events",
            rows(json!([
                {"timestamp": "2024-05-01T08:00:00Z", "eventType": "share", "userId": "r1",
                 "payload_json": "{\"platform\": \"line\", \"userName\": \"Ref One\"}"},
                {"timestamp": "2024-05-01T09:00:00Z", "eventType": "referral_visit",
                 "referrerId": "r1", "userId": "u1"},
                {"timestamp": "2024-05-01T21:00:00Z", "eventType": "referral_complete",
                 "referrerId": "r1", "userId": "u1",
                 "payload_json": "{\"userEmail\": \"u1@x.com\"}"},
                {"timestamp": "2024-05-02T09:00:00Z", "eventType": "referral_visit",
                 "referrerId": "r2", "userId": "u2"}
            ])),
        );
        Dataset::load(&tables).unwrap()
    }

    #[test]
    fn single_funnel_produces_expected_row() {
        let ds = dataset();
        let events = filter_events(&ds, &EventFilter::default());
        let rows = build_leaderboard(&events, &ds);

        let r1 = rows.iter().find(|r| r.referrer_id == "r1").unwrap();
        assert_eq!(r1.shares, 1);
        assert_eq!(r1.unique_visitors, 1);
        assert_eq!(r1.unique_completes, 1);
        assert_eq!(r1.share_to_complete, Some(1.0));
        assert_eq!(r1.shares_by_platform.get("line"), Some(&1));
        assert_eq!(r1.label, "Ref One");
        assert_eq!(r1.mean_hours_to_complete, Some(12.0));
        assert_eq!(r1.matched_completes, 1);
        assert_eq!(r1.matched_favorites, 1);
        assert_eq!(r1.matched_favorite_rate, Some(1.0));
    }

    #[test]
    fn ranking_follows_the_tie_break_chain() {
        let ds = dataset();
        let events = filter_events(&ds, &EventFilter::default());
        let rows = build_leaderboard(&events, &ds);
        // r1 has a complete, r2 only a visit
        assert_eq!(rows[0].referrer_id, "r1");
        assert_eq!(rows[1].referrer_id, "r2");
        assert_eq!(rows[1].unique_completes, 0);
        assert_eq!(rows[1].share_to_visit, None);
        assert_eq!(rows[1].visit_to_complete, Some(0.0));
    }

    #[test]
    fn visitless_referrer_has_null_ratios() {
        let ds = dataset();
        let events = filter_events(&ds, &EventFilter::default());
        let rows = build_leaderboard(&events, &ds);
        let r2 = rows.iter().find(|r| r.referrer_id == "r2").unwrap();
        assert_eq!(r2.shares, 0);
        assert_eq!(r2.share_to_complete, None);
        assert_eq!(r2.mean_hours_to_complete, None);
        assert_eq!(r2.matched_favorite_rate, None);
    }

    #[test]
    fn detail_collects_invitee_journeys() {
        let ds = dataset();
        let filter = EventFilter::default().for_referrer("r1");
        let events = filter_events(&ds, &filter);
        let detail = referrer_detail(&events, &ds, "r1");

        assert_eq!(detail.shares, 1);
        assert_eq!(detail.unique_visitors, 1);
        assert_eq!(detail.unique_completes, 1);
        assert_eq!(detail.matched_completes, 1);
        assert_eq!(detail.matched_favorites, 1);
        assert_eq!(detail.hours_to_complete, vec![12.0]);

        // two rows: the real invitee plus the sharer's own zero-count row
        // (share events carry the actor in userId)
        assert_eq!(detail.invitees.len(), 2);
        let invitee = &detail.invitees[0];
        assert_eq!(invitee.user_id, "u1");
        assert_eq!(invitee.visits, 1);
        assert_eq!(invitee.completes, 1);
        assert_eq!(invitee.hours, Some(12.0));
        assert!(invitee.diagnosis_match);
        assert!(invitee.favorited);
    }
}
