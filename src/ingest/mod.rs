//! Ingestion boundary: named row sets handed over by the external table
//! source, plus the tolerant per-row normalizers that turn them into typed
//! records. Everything here degrades field-by-field — a malformed cell
//! becomes `None`, never a row failure.

pub mod fields;
pub mod normalize;

pub use normalize::{normalize_diagnosis_rows, normalize_referral_rows};

use crate::error::LoadError;

/// A loosely-typed source row: column name → JSON value.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Sheet carrying diagnosis submissions.
pub const DIAGNOSIS_SHEET: &str = "diagnosis";
/// Sheet carrying referral funnel events.
pub const REFERRAL_SHEET: &str = "referral_events";

/// Named row sets from one decoded workbook. Sheet names are matched
/// case-insensitively; a missing required sheet fails the whole load.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    sheets: Vec<(String, Vec<RawRow>)>,
}

impl TableSet {
    pub fn new() -> TableSet {
        TableSet::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rows: Vec<RawRow>) {
        self.sheets.push((name.into(), rows));
    }

    pub fn get(&self, name: &str) -> Option<&[RawRow]> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet.eq_ignore_ascii_case(name))
            .map(|(_, rows)| rows.as_slice())
    }

    pub fn require(&self, name: &str) -> Result<&[RawRow], LoadError> {
        self.get(name).ok_or_else(|| LoadError::MissingSheet {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_lookup_is_case_insensitive() {
        let mut tables = TableSet::new();
        tables.insert("Diagnosis", Vec::new());
        assert!(tables.get(DIAGNOSIS_SHEET).is_some());
    }

    #[test]
    fn missing_sheet_is_a_load_failure() {
        let tables = TableSet::new();
        let err = tables.require(REFERRAL_SHEET).unwrap_err();
        assert!(err.to_string().contains("referral_events"));
    }
}
