//! Data-quality counters and raw-sheet column profiling for the load
//! screen. Parse failures never error anywhere in the pipeline; this is
//! where they become visible.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::analytics::stats;
use crate::config;
use crate::ingest::fields::{number_value, parse_timestamp, scalar_string};
use crate::ingest::RawRow;
use crate::models::DiagnosisRecord;

/// Missing/degenerate field counts over a filtered diagnosis view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub total: usize,
    pub missing_timestamp: usize,
    pub missing_email: usize,
    pub missing_age: usize,
    /// Records with at least one axis score outside the expected range.
    pub out_of_range_axes: usize,
    /// Emails appearing on two or more of the rows.
    pub duplicated_emails: usize,
}

pub fn diagnosis_quality(rows: &[&DiagnosisRecord]) -> DataQuality {
    let (lo, hi) = config::AXIS_RANGE;
    let out_of_range = |record: &DiagnosisRecord| {
        [record.axis_a, record.axis_b, record.axis_c, record.axis_d]
            .into_iter()
            .flatten()
            .any(|v| v < lo || v > hi)
    };

    let mut email_counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        if let Some(email) = row.email_lower.as_deref() {
            *email_counts.entry(email).or_insert(0) += 1;
        }
    }

    DataQuality {
        total: rows.len(),
        missing_timestamp: rows.iter().filter(|r| r.created_at.is_none()).count(),
        missing_email: rows.iter().filter(|r| r.email_lower.is_none()).count(),
        missing_age: rows.iter().filter(|r| r.age.is_none()).count(),
        out_of_range_axes: rows.iter().filter(|r| out_of_range(r)).count(),
        duplicated_emails: email_counts.values().filter(|&&n| n >= 2).count(),
    }
}

/// Rough type guess for one raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Empty,
    Number,
    Date,
    Text,
}

/// Profile of one raw column: how much is missing, how varied it is, what
/// it looks like.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub missing: usize,
    pub distinct: usize,
    pub kind: ColumnKind,
    /// Up to three most frequent values with their counts.
    pub top_values: Vec<(String, u64)>,
}

/// Profile every column of a raw sheet, sorted by column name. Columns
/// whose name starts with "Unnamed" (spreadsheet filler) can be hidden.
pub fn profile_columns(rows: &[RawRow], hide_unnamed: bool) -> Vec<ColumnProfile> {
    let mut names: BTreeMap<&str, ()> = BTreeMap::new();
    for row in rows {
        for key in row.keys() {
            names.insert(key, ());
        }
    }

    names
        .into_keys()
        .filter(|name| !(hide_unnamed && name.to_lowercase().starts_with("unnamed")))
        .map(|name| profile_column(rows, name))
        .collect()
}

fn profile_column(rows: &[RawRow], name: &str) -> ColumnProfile {
    let values: Vec<&serde_json::Value> = rows
        .iter()
        .filter_map(|row| row.get(name))
        .filter(|v| !v.is_null())
        .filter(|v| v.as_str() != Some(""))
        .collect();
    let missing = rows.len() - values.len();

    let rendered: Vec<String> = values
        .iter()
        .map(|v| scalar_string(v).unwrap_or_else(|| v.to_string()))
        .collect();
    let distinct = rendered
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len();

    let kind = if values.is_empty() {
        ColumnKind::Empty
    } else {
        let numeric = values.iter().filter(|v| number_value(v).is_some()).count();
        let dateish = values
            .iter()
            .filter(|v| parse_timestamp(v).is_some())
            .count();
        let share = |n: usize| n as f64 / values.len() as f64;
        if share(numeric) > 0.9 {
            ColumnKind::Number
        } else if share(dateish) > 0.9 {
            ColumnKind::Date
        } else {
            ColumnKind::Text
        }
    };

    ColumnProfile {
        name: name.to_string(),
        missing,
        distinct,
        kind,
        top_values: stats::top_k(rendered.into_iter(), 3),
    }
}
