use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;

/// Gender as reported on a row, normalized for grouping. Labels outside the
/// common two are kept verbatim (lowercased) rather than collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Unknown,
    #[serde(untagged)]
    Other(String),
}

impl Gender {
    pub fn as_str(&self) -> &str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Unknown => "unknown",
            Gender::Other(s) => s,
        }
    }
}

/// One of the four diagnosis axis scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    AxisA,
    AxisB,
    AxisC,
    AxisD,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::AxisA, Axis::AxisB, Axis::AxisC, Axis::AxisD];

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::AxisA => "axisA",
            Axis::AxisB => "axisB",
            Axis::AxisC => "axisC",
            Axis::AxisD => "axisD",
        }
    }
}

/// A single normalized diagnosis submission.
///
/// Immutable after normalization except the referral attribution fields,
/// which the join stage populates exactly once per load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    /// Original row index in the source sheet, for traceability and export.
    pub row: usize,
    pub created_at_raw: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Calendar day (`YYYY-MM-DD`) derived from `created_at`.
    pub created_date: Option<String>,
    pub email: Option<String>,
    pub email_lower: Option<String>,
    pub name: Option<String>,
    pub gender: Gender,
    pub age_raw: Option<String>,
    /// Numeric age derived from the raw value ("23-25" → 24, "26+" → 26).
    pub age: Option<f64>,
    pub type_label: String,
    pub axis_a: Option<f64>,
    pub axis_b: Option<f64>,
    pub axis_c: Option<f64>,
    pub axis_d: Option<f64>,
    pub favorited: bool,
    /// Numeric answers keyed by question id; non-numeric values are dropped
    /// during normalization.
    pub answers: BTreeMap<String, f64>,
    /// Set by the join stage: true when some referral_complete event shares
    /// this record's lowercased email.
    pub referred: bool,
    /// Referrer of the latest matching referral_complete event, if any.
    pub referrer_id: Option<String>,
    pub referral_completed_at: Option<DateTime<Utc>>,
}

impl DiagnosisRecord {
    /// Stable identity key: lowercased email, or a synthetic per-row key so
    /// every record belongs to exactly one identity group.
    pub fn identity_key(&self) -> String {
        match &self.email_lower {
            Some(email) => email.clone(),
            None => format!("{}{}", config::SYNTHETIC_KEY_PREFIX, self.row),
        }
    }

    pub fn axis(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::AxisA => self.axis_a,
            Axis::AxisB => self.axis_b,
            Axis::AxisC => self.axis_c,
            Axis::AxisD => self.axis_d,
        }
    }
}

/// Resolved identity over all records sharing one identity key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisUser {
    pub key: String,
    pub email: Option<String>,
    pub email_lower: Option<String>,
    /// Latest record by timestamp (missing timestamps sort earliest, input
    /// order breaks ties).
    pub latest: DiagnosisRecord,
    pub favorite_count: usize,
    /// Latest record among the favorited subset only.
    pub latest_favorite: Option<DiagnosisRecord>,
    /// All member records, sorted by timestamp ascending.
    pub records: Vec<DiagnosisRecord>,
}

impl DiagnosisUser {
    pub fn has_favorite(&self) -> bool {
        self.favorite_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, email: Option<&str>) -> DiagnosisRecord {
        DiagnosisRecord {
            row,
            created_at_raw: None,
            created_at: None,
            created_date: None,
            email: email.map(str::to_string),
            email_lower: email.map(str::to_lowercase),
            name: None,
            gender: Gender::Unknown,
            age_raw: None,
            age: None,
            type_label: "INTJ".into(),
            axis_a: None,
            axis_b: None,
            axis_c: None,
            axis_d: None,
            favorited: false,
            answers: BTreeMap::new(),
            referred: false,
            referrer_id: None,
            referral_completed_at: None,
        }
    }

    #[test]
    fn identity_key_prefers_lowercased_email() {
        let rec = record(3, Some("A@X.com"));
        assert_eq!(rec.identity_key(), "a@x.com");
    }

    #[test]
    fn identity_key_falls_back_to_row_index() {
        let rec = record(7, None);
        assert_eq!(rec.identity_key(), "__noemail__7");
    }

    #[test]
    fn gender_other_keeps_verbatim_label() {
        let g = Gender::Other("nonbinary".into());
        assert_eq!(g.as_str(), "nonbinary");
    }
}
