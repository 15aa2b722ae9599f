//! The derivation pipeline. `Dataset::load` is the single entry point; it
//! runs the mandatory stage sequence — normalize → resolve → join →
//! re-resolve — in exactly that order on every (re)load, so every derived
//! index is always consistent with the raw rows it came from.

pub mod graph;
pub mod join;
pub mod resolve;

use std::collections::HashMap;

use crate::error::LoadError;
use crate::ingest::{self, TableSet};
use crate::models::{DiagnosisRecord, DiagnosisUser, ReferralEvent, ReferralGraph};

/// An immutable snapshot of one loaded workbook plus everything derived
/// from it. Rebuilt wholesale on every load; the embedding application
/// owns the single mutable reference and passes `&Dataset` into the pure
/// view functions.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub diagnosis: Vec<DiagnosisRecord>,
    pub events: Vec<ReferralEvent>,
    pub users: Vec<DiagnosisUser>,
    pub graph: ReferralGraph,
    user_index: HashMap<String, usize>,
}

impl Dataset {
    /// Run the full load sequence over the two required sheets.
    ///
    /// Fails only on structural problems (a required sheet missing); every
    /// cell-level problem degrades inside the normalizers.
    pub fn load(tables: &TableSet) -> Result<Dataset, LoadError> {
        let diagnosis_rows = tables.require(ingest::DIAGNOSIS_SHEET)?;
        let event_rows = tables.require(ingest::REFERRAL_SHEET)?;

        // Stage 1: normalize.
        let mut diagnosis = ingest::normalize_diagnosis_rows(diagnosis_rows);
        let events = ingest::normalize_referral_rows(event_rows);
        tracing::info!(
            "normalized {} diagnosis rows, {} referral events",
            diagnosis.len(),
            events.len()
        );

        // Stage 2: resolve identities over the un-attributed records.
        let users = resolve::resolve_users(&diagnosis);
        tracing::debug!("resolved {} diagnosis users before attribution", users.len());

        // Stage 3: derive the referral graph and join by completer email.
        let graph = graph::build_referral_graph(&events);
        let attribution = join::build_complete_email_map(&events);
        join::apply_attribution(&mut diagnosis, &attribution);

        // Stage 4: re-resolve — latest-record views must reflect the final
        // attribution, so the pre-join user set is discarded.
        let users = resolve::resolve_users(&diagnosis);
        let user_index = resolve::index_by_email(&users);
        tracing::info!(
            "derived {} users, {} journeys, {} attributed emails",
            users.len(),
            graph.journeys.len(),
            attribution.len()
        );

        Ok(Dataset {
            diagnosis,
            events,
            users,
            graph,
            user_index,
        })
    }

    /// Resolved user for a lowercased email, if any.
    pub fn user_by_email(&self, email_lower: &str) -> Option<&DiagnosisUser> {
        self.user_index
            .get(email_lower)
            .map(|&pos| &self.users[pos])
    }

    /// True when the email resolves to a user who ever favorited.
    pub fn email_has_favorite(&self, email_lower: &str) -> bool {
        self.user_by_email(email_lower)
            .map(|user| user.has_favorite())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RawRow;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<RawRow> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn tables(diagnosis: serde_json::Value, events: serde_json::Value) -> TableSet {
        let mut tables = TableSet::new();
        tables.insert("diagnosis", rows(diagnosis));
        tables.insert("referral_events", rows(events));
        tables
    }

    #[test]
    fn load_fails_on_missing_sheet() {
        let mut tables = TableSet::new();
        tables.insert("diagnosis", Vec::new());
        let err = Dataset::load(&tables).unwrap_err();
        assert!(matches!(err, LoadError::MissingSheet { name } if name == "referral_events"));
    }

    #[test]
    fn load_runs_the_full_stage_sequence() {
        let dataset = Dataset::load(&tables(
            json!([
                {"email": "a@x.com", "createdAt": "2024-05-01T10:00:00Z", "interested": 1},
                {"email": "a@x.com", "createdAt": "2024-05-02T10:00:00Z"},
                {"email": "b@x.com", "createdAt": "2024-05-02T10:00:00Z"}
            ]),
            json!([
                {"timestamp": "2024-05-03T10:00:00Z", "eventType": "referral_complete",
                 "referrerId": "r1", "userId": "u1",
                 "payload_json": "{\"userEmail\": \"a@x.com\"}"}
            ]),
        ))
        .unwrap();

        assert_eq!(dataset.diagnosis.len(), 3);
        assert_eq!(dataset.users.len(), 2);

        // referred flag is true iff some complete shares the user's key,
        // and the re-resolved latest record carries it
        let user = dataset.user_by_email("a@x.com").unwrap();
        assert!(user.latest.referred);
        assert_eq!(user.latest.referrer_id.as_deref(), Some("r1"));
        assert!(dataset.email_has_favorite("a@x.com"));

        let other = dataset.user_by_email("b@x.com").unwrap();
        assert!(!other.latest.referred);
        assert!(!dataset.email_has_favorite("b@x.com"));
    }

    #[test]
    fn referred_flag_matches_complete_emails_exactly() {
        let dataset = Dataset::load(&tables(
            json!([
                {"email": "hit@x.com"},
                {"email": "miss@x.com"},
                {}
            ]),
            json!([
                {"timestamp": "2024-05-01T10:00:00Z", "eventType": "referral_complete",
                 "referrerId": "r1", "userId": "u1",
                 "payload_json": "{\"userEmail\": \"HIT@x.com\"}"},
                {"timestamp": "2024-05-01T11:00:00Z", "eventType": "referral_visit",
                 "referrerId": "r1", "userId": "u2"}
            ]),
        ))
        .unwrap();

        for user in &dataset.users {
            let expected = user.email_lower.as_deref() == Some("hit@x.com");
            assert_eq!(user.latest.referred, expected, "user {}", user.key);
        }
    }

    #[test]
    fn empty_sheets_load_cleanly() {
        let dataset = Dataset::load(&tables(json!([]), json!([]))).unwrap();
        assert!(dataset.diagnosis.is_empty());
        assert!(dataset.users.is_empty());
        assert!(dataset.graph.daily.is_empty());
    }
}
