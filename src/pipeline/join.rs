//! Join engine: attribute diagnosis records to referrers via completer
//! email, latest complete wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{DiagnosisRecord, RefEventType, ReferralEvent};

/// Attribution for one completer email: the referrer of the most recent
/// referral_complete event carrying it. The referrer column may be absent
/// on that event — the email still counts as referred.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteAttribution {
    pub referrer_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn ms(ts: Option<DateTime<Utc>>) -> i64 {
    ts.map(|t| t.timestamp_millis()).unwrap_or(0)
}

/// Lowercased completer email → latest-complete attribution.
pub fn build_complete_email_map(
    events: &[ReferralEvent],
) -> HashMap<String, CompleteAttribution> {
    let mut map: HashMap<String, CompleteAttribution> = HashMap::new();
    for event in events {
        if event.event_type != RefEventType::ReferralComplete {
            continue;
        }
        let Some(email) = &event.user_email_lower else { continue };

        let newer = match map.get(email) {
            Some(cached) => ms(event.timestamp) > ms(cached.completed_at),
            None => true,
        };
        if newer {
            map.insert(
                email.clone(),
                CompleteAttribution {
                    referrer_id: event.referrer_id.clone(),
                    completed_at: event.timestamp,
                },
            );
        }
    }
    map
}

/// Populate the attribution fields on every diagnosis record. Records
/// without an email are marked unreferred. Identity resolution must be
/// rerun afterwards so latest-record views reflect the final attribution.
pub fn apply_attribution(
    records: &mut [DiagnosisRecord],
    attribution: &HashMap<String, CompleteAttribution>,
) {
    for record in records.iter_mut() {
        let matched = record
            .email_lower
            .as_ref()
            .and_then(|email| attribution.get(email));
        match matched {
            Some(info) => {
                record.referred = true;
                record.referrer_id = info.referrer_id.clone();
                record.referral_completed_at = info.completed_at;
            }
            None => {
                record.referred = false;
                record.referrer_id = None;
                record.referral_completed_at = None;
            }
        }
    }
}
