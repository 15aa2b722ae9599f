//! Per-row normalizers for the two source sheets. Pure transforms: the same
//! raw row always yields the same record, and nothing here fails — bad
//! cells degrade to absent values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{DiagnosisRecord, ReferralEvent, RefEventType};

use super::fields::{
    json_object, normalize_email, normalize_gender, normalize_type, number_field, number_value,
    parse_age, pick, scalar_string, string_field, timestamp_field, to_day, truthy_flag,
};
use super::RawRow;

const DIAG_TIMESTAMP: &[&str] = &["createdAt", "created_at", "timestamp"];
const DIAG_EMAIL: &[&str] = &["email", "userEmail", "mail"];
const EVENT_TIMESTAMP: &[&str] = &["timestamp", "createdAt", "time"];
const EVENT_TYPE: &[&str] = &["eventType", "type", "event"];
const EVENT_PAYLOAD: &[&str] = &["payload_json", "payload", "data"];

pub fn normalize_diagnosis_rows(rows: &[RawRow]) -> Vec<DiagnosisRecord> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| normalize_diagnosis_row(row, idx))
        .collect()
}

pub fn normalize_diagnosis_row(row: &RawRow, idx: usize) -> DiagnosisRecord {
    let (created_at_raw, created_at) = timestamp_field(row, DIAG_TIMESTAMP);
    let created_date = created_at.as_ref().map(to_day);

    let email = string_field(row, DIAG_EMAIL);
    let email_lower = email.as_deref().and_then(normalize_email);

    let age_cell = pick(row, &["age"]);
    let age_raw = age_cell.and_then(scalar_string);
    let age = age_cell.and_then(parse_age);

    DiagnosisRecord {
        row: idx,
        created_at_raw,
        created_at,
        created_date,
        email,
        email_lower,
        name: string_field(row, &["name"]),
        gender: normalize_gender(pick(row, &["gender"])),
        age_raw,
        age,
        type_label: normalize_type(pick(row, &["type"])),
        axis_a: number_field(row, &["axisA"]),
        axis_b: number_field(row, &["axisB"]),
        axis_c: number_field(row, &["axisC"]),
        axis_d: number_field(row, &["axisD"]),
        favorited: truthy_flag(pick(row, &["interested"])),
        answers: extract_answers(row),
        referred: false,
        referrer_id: None,
        referral_completed_at: None,
    }
}

/// Numeric answer map: `answers_json` when it parses to a non-empty object,
/// else the `answers` object nested inside `raw_json`. Non-numeric answer
/// values are dropped.
fn extract_answers(row: &RawRow) -> BTreeMap<String, f64> {
    let answers = row
        .get("answers_json")
        .and_then(json_object)
        .filter(|obj| !obj.is_empty())
        .or_else(|| {
            row.get("raw_json")
                .and_then(json_object)
                .and_then(|raw| raw.get("answers").and_then(json_object))
        });

    let mut out = BTreeMap::new();
    if let Some(answers) = answers {
        for (key, value) in &answers {
            if let Some(n) = number_value(value) {
                out.insert(key.clone(), n);
            }
        }
    }
    out
}

pub fn normalize_referral_rows(rows: &[RawRow]) -> Vec<ReferralEvent> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| normalize_referral_row(row, idx))
        .collect()
}

pub fn normalize_referral_row(row: &RawRow, idx: usize) -> ReferralEvent {
    let (timestamp_raw, timestamp) = timestamp_field(row, EVENT_TIMESTAMP);
    let date = timestamp.as_ref().map(to_day);

    let event_type = string_field(row, EVENT_TYPE)
        .map(|s| RefEventType::parse(&s))
        .unwrap_or_else(|| RefEventType::Other(String::new()));

    let payload = pick(row, EVENT_PAYLOAD).and_then(json_object);
    let payload_field = |names: &[&str]| -> Option<String> {
        let payload = payload.as_ref()?;
        names
            .iter()
            .filter_map(|name| payload.get(*name))
            .find_map(scalar_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let user_email = payload_field(&["userEmail", "email"]);
    let user_email_lower = user_email.as_deref().and_then(normalize_email);
    let gender_value = payload.as_ref().and_then(|p| p.get("gender")).cloned();

    ReferralEvent {
        row: idx,
        timestamp_raw,
        timestamp,
        date,
        event_type,
        user_id: string_field(row, &["userId"]),
        referrer_id: string_field(row, &["referrerId"]),
        platform: payload_field(&["platform"]),
        user_email,
        user_email_lower,
        user_name: payload_field(&["userName"]),
        user_type: payload_field(&["userType"]),
        gender: normalize_gender(gender_value.as_ref()),
    }
}
