//! CSV/JSON serialization of filtered row sets. The row structs already
//! carry masked or raw identifiers, so exports inherit the active masking
//! state from their constructor.

use serde::Serialize;

use super::tables::{DiagnosisRow, EventRow, FavoriteRow, LeaderboardRow};

/// A row type that knows its CSV column layout. Column order matters for
/// spreadsheets, so it is explicit here rather than derived from field
/// names.
pub trait CsvRecord {
    fn headers() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Quote-escape one CSV cell: every non-empty value is quoted with doubled
/// inner quotes; absent values stay as empty cells.
fn escape(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize rows as CSV with a header line. Rows are joined with `\n`,
/// matching the original export format.
pub fn to_csv<T: CsvRecord>(rows: &[T]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        T::headers()
            .iter()
            .map(|h| escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let line = row
            .fields()
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    String::new()
                } else {
                    escape(cell)
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    lines.join("\n")
}

/// Serialize rows as pretty-printed JSON.
pub fn to_json<T: Serialize>(rows: &[T]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rows)
}

impl CsvRecord for DiagnosisRow {
    fn headers() -> &'static [&'static str] {
        &[
            "createdAt", "type", "gender", "age", "axisA", "axisB", "axisC", "axisD",
            "favorite", "referred", "referrerId", "user", "row",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            opt(&self.created_at),
            self.type_label.clone(),
            self.gender.clone(),
            opt(&self.age),
            opt(&self.axis_a),
            opt(&self.axis_b),
            opt(&self.axis_c),
            opt(&self.axis_d),
            self.favorite.to_string(),
            self.referred.to_string(),
            opt(&self.referrer),
            opt(&self.user),
            self.row.to_string(),
        ]
    }
}

impl CsvRecord for FavoriteRow {
    fn headers() -> &'static [&'static str] {
        &[
            "createdAt", "type", "gender", "age", "axisA", "axisB", "axisC", "axisD",
            "referred", "referrerId", "user", "row",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            opt(&self.created_at),
            self.type_label.clone(),
            self.gender.clone(),
            opt(&self.age),
            opt(&self.axis_a),
            opt(&self.axis_b),
            opt(&self.axis_c),
            opt(&self.axis_d),
            self.referred.to_string(),
            opt(&self.referrer),
            opt(&self.user),
            self.row.to_string(),
        ]
    }
}

impl CsvRecord for EventRow {
    fn headers() -> &'static [&'static str] {
        &["timestamp", "eventType", "platform", "referrerId", "userId", "userEmail", "row"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            opt(&self.timestamp),
            self.event_type.clone(),
            opt(&self.platform),
            opt(&self.referrer),
            opt(&self.user_id),
            opt(&self.user_email),
            self.row.to_string(),
        ]
    }
}

impl CsvRecord for LeaderboardRow {
    fn headers() -> &'static [&'static str] {
        &[
            "referrer", "shares", "visitors", "completes", "shareToVisit",
            "visitToComplete", "shareToComplete", "meanHours", "medianHours", "favRate",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.referrer.clone(),
            self.shares.to_string(),
            self.unique_visitors.to_string(),
            self.unique_completes.to_string(),
            opt(&self.share_to_visit),
            opt(&self.visit_to_complete),
            opt(&self.share_to_complete),
            opt(&self.mean_hours_to_complete),
            opt(&self.median_hours_to_complete),
            opt(&self.matched_favorite_rate),
        ]
    }
}
