use serde::{Deserialize, Serialize};

use super::diagnosis::{DiagnosisRecord, Gender};
use super::referral::{RefEventType, ReferralEvent};

/// Whether diagnosis-side views operate on individual records or on one
/// representative record per resolved user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewUnit {
    #[default]
    Record,
    User,
}

/// Gender selector. `Unknown` matches everything that is neither female nor
/// male, including verbatim other labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum GenderFilter {
    #[default]
    All,
    Unknown,
    Only(Gender),
}

impl GenderFilter {
    fn matches(&self, gender: &Gender) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Unknown => !matches!(gender, Gender::Female | Gender::Male),
            GenderFilter::Only(wanted) => gender == wanted,
        }
    }
}

/// Referral attribution selector shared by the diagnosis and favorites views.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ReferralFilter {
    #[default]
    All,
    Referred,
    NotReferred,
    /// Records attributed to this specific referrer id.
    Referrer(String),
}

impl ReferralFilter {
    fn matches(&self, record: &DiagnosisRecord) -> bool {
        match self {
            ReferralFilter::All => true,
            ReferralFilter::Referred => record.referred,
            ReferralFilter::NotReferred => !record.referred,
            ReferralFilter::Referrer(id) => record.referrer_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// Inclusive calendar-day window, compared as `YYYY-MM-DD` strings. A record
/// without a calendar day fails any date-bounded filter.
fn within_dates(date: Option<&str>, from: Option<&str>, to: Option<&str>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(date) = date else { return false };
    if let Some(from) = from {
        if date < from {
            return false;
        }
    }
    if let Some(to) = to {
        if date > to {
            return false;
        }
    }
    true
}

/// Filter over diagnosis records, used identically by the diagnosis and
/// favorites views so cross-view KPIs stay consistent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub gender: GenderFilter,
    /// None = all types.
    pub type_label: Option<String>,
    /// Inclusive age bounds; a record with non-numeric age fails a bound
    /// only when that bound is set.
    pub age_min: Option<f64>,
    pub age_max: Option<f64>,
    pub referral: ReferralFilter,
}

impl RecordFilter {
    pub fn matches(&self, record: &DiagnosisRecord) -> bool {
        if !within_dates(
            record.created_date.as_deref(),
            self.date_from.as_deref(),
            self.date_to.as_deref(),
        ) {
            return false;
        }
        if !self.gender.matches(&record.gender) {
            return false;
        }
        if let Some(wanted) = &self.type_label {
            if &record.type_label != wanted {
                return false;
            }
        }
        if let Some(min) = self.age_min {
            match record.age {
                Some(age) if age >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = self.age_max {
            match record.age {
                Some(age) if age <= max => {}
                _ => return false,
            }
        }
        self.referral.matches(record)
    }

    /// Same filter with the referral selector reset — the explicit override
    /// used when building the non-favorite comparison baseline.
    pub fn without_referral(&self) -> RecordFilter {
        RecordFilter {
            referral: ReferralFilter::All,
            ..self.clone()
        }
    }
}

/// Filter over referral events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// None = all event types.
    pub event_type: Option<RefEventType>,
    /// None = all platforms; compared against the event's platform key, so
    /// "unknown" selects events without a platform.
    pub platform: Option<String>,
    /// None = all referrers.
    pub referrer: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &ReferralEvent) -> bool {
        if !within_dates(
            event.date.as_deref(),
            self.date_from.as_deref(),
            self.date_to.as_deref(),
        ) {
            return false;
        }
        if let Some(wanted) = &self.event_type {
            if &event.event_type != wanted {
                return false;
            }
        }
        if let Some(platform) = &self.platform {
            if event.platform_key() != platform {
                return false;
            }
        }
        if let Some(referrer) = &self.referrer {
            if event.filter_referrer_id() != Some(referrer.as_str()) {
                return false;
            }
        }
        true
    }

    /// Date bounds only — the leaderboard's explicit override, which keeps
    /// the selected window but ignores event-type/platform/referrer
    /// selection so rankings stay stable while drilling down.
    pub fn dates_only(&self) -> EventFilter {
        EventFilter {
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            ..EventFilter::default()
        }
    }

    /// Date bounds plus a pinned referrer — the drill-down override.
    pub fn for_referrer(&self, referrer_id: &str) -> EventFilter {
        EventFilter {
            referrer: Some(referrer_id.to_string()),
            ..self.dates_only()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record() -> DiagnosisRecord {
        DiagnosisRecord {
            row: 0,
            created_at_raw: None,
            created_at: None,
            created_date: Some("2024-05-10".into()),
            email: None,
            email_lower: None,
            name: None,
            gender: Gender::Female,
            age_raw: None,
            age: Some(24.0),
            type_label: "ENFP".into(),
            axis_a: None,
            axis_b: None,
            axis_c: None,
            axis_d: None,
            favorited: false,
            answers: BTreeMap::new(),
            referred: true,
            referrer_id: Some("r1".into()),
            referral_completed_at: None,
        }
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let mut filter = RecordFilter {
            date_from: Some("2024-05-10".into()),
            date_to: Some("2024-05-10".into()),
            ..RecordFilter::default()
        };
        assert!(filter.matches(&record()));
        filter.date_to = Some("2024-05-09".into());
        assert!(!filter.matches(&record()));
    }

    #[test]
    fn dateless_record_fails_bounded_filter_only() {
        let mut rec = record();
        rec.created_date = None;
        assert!(RecordFilter::default().matches(&rec));
        let bounded = RecordFilter {
            date_from: Some("2024-01-01".into()),
            ..RecordFilter::default()
        };
        assert!(!bounded.matches(&rec));
    }

    #[test]
    fn unknown_gender_excludes_female_and_male() {
        let filter = RecordFilter {
            gender: GenderFilter::Unknown,
            ..RecordFilter::default()
        };
        assert!(!filter.matches(&record()));

        let mut rec = record();
        rec.gender = Gender::Other("x".into());
        assert!(filter.matches(&rec));
    }

    #[test]
    fn missing_age_fails_only_set_bounds() {
        let mut rec = record();
        rec.age = None;
        assert!(RecordFilter::default().matches(&rec));
        let bounded = RecordFilter {
            age_min: Some(20.0),
            ..RecordFilter::default()
        };
        assert!(!bounded.matches(&rec));
    }

    #[test]
    fn referral_selector_covers_all_variants() {
        let rec = record();
        let matches = |referral| RecordFilter {
            referral,
            ..RecordFilter::default()
        }
        .matches(&rec);
        assert!(matches(ReferralFilter::All));
        assert!(matches(ReferralFilter::Referred));
        assert!(!matches(ReferralFilter::NotReferred));
        assert!(matches(ReferralFilter::Referrer("r1".into())));
        assert!(!matches(ReferralFilter::Referrer("r2".into())));
    }

    fn event(event_type: RefEventType) -> ReferralEvent {
        ReferralEvent {
            row: 0,
            timestamp_raw: None,
            timestamp: None,
            date: Some("2024-05-10".into()),
            event_type,
            user_id: Some("u1".into()),
            referrer_id: None,
            platform: None,
            user_email: None,
            user_email_lower: None,
            user_name: None,
            user_type: None,
            gender: Gender::Unknown,
        }
    }

    #[test]
    fn share_referrer_falls_back_to_user_id() {
        let filter = EventFilter {
            referrer: Some("u1".into()),
            ..EventFilter::default()
        };
        assert!(filter.matches(&event(RefEventType::Share)));
        assert!(!filter.matches(&event(RefEventType::ReferralVisit)));
    }

    #[test]
    fn platform_filter_uses_unknown_default_key() {
        let filter = EventFilter {
            platform: Some("unknown".into()),
            ..EventFilter::default()
        };
        let mut ev = event(RefEventType::Share);
        assert!(filter.matches(&ev));
        ev.platform = Some("line".into());
        assert!(!filter.matches(&ev));
    }

    #[test]
    fn dates_only_override_drops_selectors() {
        let filter = EventFilter {
            date_from: Some("2024-01-01".into()),
            date_to: Some("2024-12-31".into()),
            event_type: Some(RefEventType::Share),
            platform: Some("line".into()),
            referrer: Some("r1".into()),
        };
        let base = filter.dates_only();
        assert_eq!(base.date_from.as_deref(), Some("2024-01-01"));
        assert!(base.event_type.is_none());
        assert!(base.platform.is_none());
        assert!(base.referrer.is_none());

        let pinned = filter.for_referrer("r2");
        assert_eq!(pinned.referrer.as_deref(), Some("r2"));
        assert!(pinned.event_type.is_none());
    }
}
