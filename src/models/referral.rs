use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnosis::Gender;
use crate::config;

/// Referral funnel stage. Event types outside the three known stages are
/// preserved verbatim; they appear in the raw event table but contribute to
/// no aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefEventType {
    Share,
    ReferralVisit,
    ReferralComplete,
    #[serde(untagged)]
    Other(String),
}

impl RefEventType {
    pub fn parse(raw: &str) -> RefEventType {
        match raw {
            "share" => RefEventType::Share,
            "referral_visit" => RefEventType::ReferralVisit,
            "referral_complete" => RefEventType::ReferralComplete,
            other => RefEventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RefEventType::Share => "share",
            RefEventType::ReferralVisit => "referral_visit",
            RefEventType::ReferralComplete => "referral_complete",
            RefEventType::Other(s) => s,
        }
    }
}

/// A single normalized referral-funnel event, with the payload snapshot
/// (email/name/type/gender as of that event) denormalized onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralEvent {
    /// Original row index in the source sheet.
    pub row: usize,
    pub timestamp_raw: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Calendar day (`YYYY-MM-DD`) derived from the event's own timestamp.
    pub date: Option<String>,
    pub event_type: RefEventType,
    pub user_id: Option<String>,
    pub referrer_id: Option<String>,
    pub platform: Option<String>,
    pub user_email: Option<String>,
    pub user_email_lower: Option<String>,
    pub user_name: Option<String>,
    pub user_type: Option<String>,
    pub gender: Gender,
}

impl ReferralEvent {
    /// Share rows are ambiguous about where the actor lands: some sources
    /// put the sharer in `userId`, others in `referrerId`.
    pub fn share_actor_id(&self) -> Option<&str> {
        self.user_id.as_deref().or(self.referrer_id.as_deref())
    }

    /// Referrer id as the filter engine sees it: the explicit referrer
    /// column, falling back to the share actor for share events.
    pub fn filter_referrer_id(&self) -> Option<&str> {
        if self.referrer_id.is_some() {
            self.referrer_id.as_deref()
        } else if self.event_type == RefEventType::Share {
            self.user_id.as_deref()
        } else {
            None
        }
    }

    pub fn platform_key(&self) -> &str {
        self.platform.as_deref().unwrap_or(config::UNKNOWN_PLATFORM)
    }
}

/// Latest-wins display snapshot for a referrer, from share events. The
/// platform histogram accumulates across all of the referrer's shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferrerMeta {
    pub referrer_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub gender: Gender,
    pub last_seen: Option<DateTime<Utc>>,
    pub platforms: BTreeMap<String, u64>,
}

impl ReferrerMeta {
    /// Display label: name, then email, then the raw id.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.referrer_id)
    }

    /// Flow-diagram endpoint label: email, then name, then the raw id.
    pub fn endpoint_label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.referrer_id)
    }
}

/// Latest-wins display snapshot for an invited user, from complete events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMeta {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_lower: Option<String>,
    pub user_type: Option<String>,
    pub gender: Gender,
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserMeta {
    pub fn endpoint_label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.user_id)
    }
}

/// Accumulated interaction history between one referrer and one user. Only
/// events carrying both ids contribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub referrer_id: String,
    pub user_id: String,
    pub visit_count: u64,
    pub complete_count: u64,
    pub first_visit: Option<DateTime<Utc>>,
    pub first_complete: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Journey {
    /// Hours between first visit and first complete; None unless both
    /// timestamps exist and are ordered.
    pub fn hours_to_complete(&self) -> Option<f64> {
        let (visit, complete) = (self.first_visit?, self.first_complete?);
        if complete < visit {
            return None;
        }
        Some((complete - visit).num_milliseconds() as f64 / 3_600_000.0)
    }
}

/// One referrer→user edge with an aggregate weight (visit or complete count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub referrer_id: String,
    pub user_id: String,
    pub value: u64,
}

/// Per-day event counts and share-platform histogram.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: String,
    pub share: u64,
    pub referral_visit: u64,
    pub referral_complete: u64,
    pub platforms: BTreeMap<String, u64>,
}

/// Everything the referral graph builder derives in its single pass over the
/// event stream. Rebuilt wholesale on every load.
#[derive(Debug, Clone, Default)]
pub struct ReferralGraph {
    /// Daily aggregates sorted by calendar day.
    pub daily: Vec<DailyAggregate>,
    pub referrer_meta: HashMap<String, ReferrerMeta>,
    pub user_meta: HashMap<String, UserMeta>,
    pub journeys: HashMap<(String, String), Journey>,
    /// Journeys with at least one visit, sorted by value descending.
    pub visit_edges: Vec<FlowEdge>,
    /// Journeys with at least one complete, sorted by value descending.
    pub complete_edges: Vec<FlowEdge>,
}
