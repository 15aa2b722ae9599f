//! Referral graph builder: one pass over the event stream producing daily
//! aggregates, latest-wins referrer/user meta, and per-pair journeys.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{
    DailyAggregate, FlowEdge, Journey, RefEventType, ReferralEvent, ReferralGraph, ReferrerMeta,
    UserMeta,
};

/// Millisecond view of an optional timestamp; absent timestamps rank as
/// epoch zero so they never beat a real one in latest-wins comparisons.
fn ms(ts: Option<DateTime<Utc>>) -> i64 {
    ts.map(|t| t.timestamp_millis()).unwrap_or(0)
}

fn min_ts(current: Option<DateTime<Utc>>, new: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Some(match current {
        Some(existing) if existing <= new => existing,
        _ => new,
    })
}

fn max_ts(current: Option<DateTime<Utc>>, new: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Some(match current {
        Some(existing) if existing >= new => existing,
        _ => new,
    })
}

/// Build every event-derived index in a single pass.
///
/// Meta snapshots are overwritten only when a new event's timestamp
/// strictly exceeds the cached one, so identical timestamps keep the
/// first-seen value; that tie rule is load-order dependent by design and
/// documented rather than hidden.
pub fn build_referral_graph(events: &[ReferralEvent]) -> ReferralGraph {
    let mut daily: BTreeMap<String, DailyAggregate> = BTreeMap::new();
    let mut graph = ReferralGraph::default();

    for event in events {
        accumulate_daily(&mut daily, event);

        match event.event_type {
            RefEventType::Share => accumulate_referrer_meta(&mut graph, event),
            RefEventType::ReferralComplete => accumulate_user_meta(&mut graph, event),
            _ => {}
        }

        accumulate_journey(&mut graph, event);
    }

    graph.daily = daily.into_values().collect();

    for journey in graph.journeys.values() {
        if journey.visit_count > 0 {
            graph.visit_edges.push(FlowEdge {
                referrer_id: journey.referrer_id.clone(),
                user_id: journey.user_id.clone(),
                value: journey.visit_count,
            });
        }
        if journey.complete_count > 0 {
            graph.complete_edges.push(FlowEdge {
                referrer_id: journey.referrer_id.clone(),
                user_id: journey.user_id.clone(),
                value: journey.complete_count,
            });
        }
    }
    graph.visit_edges.sort_by(|a, b| b.value.cmp(&a.value));
    graph.complete_edges.sort_by(|a, b| b.value.cmp(&a.value));

    graph
}

/// Daily counters keyed by the event's own calendar day. Only the three
/// funnel stages count; unknown event types pass through untallied.
fn accumulate_daily(daily: &mut BTreeMap<String, DailyAggregate>, event: &ReferralEvent) {
    let Some(date) = &event.date else { return };
    let day = daily.entry(date.clone()).or_insert_with(|| DailyAggregate {
        date: date.clone(),
        ..DailyAggregate::default()
    });
    match event.event_type {
        RefEventType::Share => {
            day.share += 1;
            *day.platforms.entry(event.platform_key().to_string()).or_insert(0) += 1;
        }
        RefEventType::ReferralVisit => day.referral_visit += 1,
        RefEventType::ReferralComplete => day.referral_complete += 1,
        RefEventType::Other(_) => {}
    }
}

fn accumulate_referrer_meta(graph: &mut ReferralGraph, event: &ReferralEvent) {
    let Some(actor) = event.share_actor_id() else { return };
    let actor = actor.to_string();

    let replace = match graph.referrer_meta.get(&actor) {
        Some(cached) => ms(event.timestamp) > ms(cached.last_seen),
        None => true,
    };
    if replace {
        let platforms = graph
            .referrer_meta
            .remove(&actor)
            .map(|meta| meta.platforms)
            .unwrap_or_default();
        graph.referrer_meta.insert(
            actor.clone(),
            ReferrerMeta {
                referrer_id: actor.clone(),
                name: event.user_name.clone(),
                email: event.user_email.clone(),
                user_type: event.user_type.clone(),
                gender: event.gender.clone(),
                last_seen: event.timestamp,
                platforms,
            },
        );
    }

    let meta = graph
        .referrer_meta
        .get_mut(&actor)
        .expect("meta inserted above");
    *meta
        .platforms
        .entry(event.platform_key().to_string())
        .or_insert(0) += 1;
}

fn accumulate_user_meta(graph: &mut ReferralGraph, event: &ReferralEvent) {
    let Some(user_id) = &event.user_id else { return };

    let replace = match graph.user_meta.get(user_id) {
        Some(cached) => ms(event.timestamp) > ms(cached.last_seen),
        None => true,
    };
    if replace {
        graph.user_meta.insert(
            user_id.clone(),
            UserMeta {
                user_id: user_id.clone(),
                name: event.user_name.clone(),
                email: event.user_email.clone(),
                email_lower: event.user_email_lower.clone(),
                user_type: event.user_type.clone(),
                gender: event.gender.clone(),
                last_seen: event.timestamp,
            },
        );
    }
}

/// Journeys accumulate only from events carrying both ids.
fn accumulate_journey(graph: &mut ReferralGraph, event: &ReferralEvent) {
    let (Some(referrer_id), Some(user_id)) = (&event.referrer_id, &event.user_id) else {
        return;
    };

    let journey = graph
        .journeys
        .entry((referrer_id.clone(), user_id.clone()))
        .or_insert_with(|| Journey {
            referrer_id: referrer_id.clone(),
            user_id: user_id.clone(),
            visit_count: 0,
            complete_count: 0,
            first_visit: None,
            first_complete: None,
            last_seen: None,
        });

    if let Some(ts) = event.timestamp {
        journey.last_seen = max_ts(journey.last_seen, ts);
    }

    match event.event_type {
        RefEventType::ReferralVisit => {
            journey.visit_count += 1;
            if let Some(ts) = event.timestamp {
                journey.first_visit = min_ts(journey.first_visit, ts);
            }
        }
        RefEventType::ReferralComplete => {
            journey.complete_count += 1;
            if let Some(ts) = event.timestamp {
                journey.first_complete = min_ts(journey.first_complete, ts);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{normalize_referral_rows, RawRow};
    use serde_json::json;

    fn events(values: serde_json::Value) -> Vec<ReferralEvent> {
        let rows: Vec<RawRow> = values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        normalize_referral_rows(&rows)
    }

    fn funnel_events() -> Vec<ReferralEvent> {
        events(json!([
            {"timestamp": "2024-05-01T08:00:00Z", "eventType": "share", "userId": "r1",
             "payload_json": "{\"platform\": \"line\", \"userName\": \"Ref One\"}"},
            {"timestamp": "2024-05-01T09:00:00Z", "eventType": "referral_visit",
             "referrerId": "r1", "userId": "u1"},
            {"timestamp": "2024-05-01T15:00:00Z", "eventType": "referral_visit",
             "referrerId": "r1", "userId": "u1"},
            {"timestamp": "2024-05-02T09:00:00Z", "eventType": "referral_complete",
             "referrerId": "r1", "userId": "u1",
             "payload_json": "{\"userEmail\": \"u1@x.com\"}"}
        ]))
    }

    #[test]
    fn daily_counters_key_by_event_day() {
        let graph = build_referral_graph(&funnel_events());
        assert_eq!(graph.daily.len(), 2);
        assert_eq!(graph.daily[0].date, "2024-05-01");
        assert_eq!(graph.daily[0].share, 1);
        assert_eq!(graph.daily[0].referral_visit, 2);
        assert_eq!(graph.daily[0].platforms.get("line"), Some(&1));
        assert_eq!(graph.daily[1].referral_complete, 1);
    }

    #[test]
    fn journeys_require_both_ids() {
        let graph = build_referral_graph(&funnel_events());
        // the share event carries only userId, so one journey exists
        assert_eq!(graph.journeys.len(), 1);
        let journey = &graph.journeys[&("r1".to_string(), "u1".to_string())];
        assert_eq!(journey.visit_count, 2);
        assert_eq!(journey.complete_count, 1);
        assert_eq!(journey.hours_to_complete(), Some(24.0));
    }

    #[test]
    fn edges_sort_descending_by_value() {
        let graph = build_referral_graph(&events(json!([
            {"timestamp": "2024-05-01T08:00:00Z", "eventType": "referral_visit",
             "referrerId": "r1", "userId": "u1"},
            {"timestamp": "2024-05-01T09:00:00Z", "eventType": "referral_visit",
             "referrerId": "r2", "userId": "u2"},
            {"timestamp": "2024-05-01T10:00:00Z", "eventType": "referral_visit",
             "referrerId": "r2", "userId": "u2"}
        ])));
        assert_eq!(graph.visit_edges.len(), 2);
        assert_eq!(graph.visit_edges[0].referrer_id, "r2");
        assert_eq!(graph.visit_edges[0].value, 2);
        assert!(graph.complete_edges.is_empty());
    }

    #[test]
    fn meta_keeps_first_seen_on_timestamp_ties() {
        let graph = build_referral_graph(&events(json!([
            {"timestamp": "2024-05-01T08:00:00Z", "eventType": "share", "userId": "r1",
             "payload_json": "{\"userName\": \"First\"}"},
            {"timestamp": "2024-05-01T08:00:00Z", "eventType": "share", "userId": "r1",
             "payload_json": "{\"userName\": \"Second\"}"}
        ])));
        assert_eq!(graph.referrer_meta["r1"].name.as_deref(), Some("First"));
    }

    #[test]
    fn meta_takes_strictly_newer_snapshot_and_accumulates_platforms() {
        let graph = build_referral_graph(&events(json!([
            {"timestamp": "2024-05-01T08:00:00Z", "eventType": "share", "userId": "r1",
             "payload_json": "{\"userName\": \"Old\", \"platform\": \"line\"}"},
            {"timestamp": "2024-05-02T08:00:00Z", "eventType": "share", "userId": "r1",
             "payload_json": "{\"userName\": \"New\", \"platform\": \"x\"}"}
        ])));
        let meta = &graph.referrer_meta["r1"];
        assert_eq!(meta.name.as_deref(), Some("New"));
        assert_eq!(meta.platforms.get("line"), Some(&1));
        assert_eq!(meta.platforms.get("x"), Some(&1));
    }

    #[test]
    fn share_actor_falls_back_to_referrer_column() {
        let graph = build_referral_graph(&events(json!([
            {"timestamp": "2024-05-01T08:00:00Z", "eventType": "share", "referrerId": "r7"}
        ])));
        assert!(graph.referrer_meta.contains_key("r7"));
    }

    #[test]
    fn user_meta_comes_from_completes_only() {
        let graph = build_referral_graph(&funnel_events());
        assert_eq!(graph.user_meta.len(), 1);
        assert_eq!(
            graph.user_meta["u1"].email_lower.as_deref(),
            Some("u1@x.com")
        );
    }
}
