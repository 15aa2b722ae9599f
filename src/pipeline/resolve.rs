//! Identity resolution: group diagnosis records into per-user summaries.

use std::collections::HashMap;

use crate::models::{DiagnosisRecord, DiagnosisUser};

/// Group records by identity key (lowercased email, synthetic key for
/// email-less rows) and derive the latest/favorite views per group.
///
/// Groups keep first-seen order. Within a group records sort by timestamp
/// ascending — missing timestamps first, input order breaking ties — so
/// "latest" is simply the last element. Must be rerun after the join stage
/// mutates attribution fields.
pub fn resolve_users(records: &[DiagnosisRecord]) -> Vec<DiagnosisUser> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<DiagnosisRecord>> = HashMap::new();

    for record in records {
        let key = record.identity_key();
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(record.clone());
    }

    order
        .into_iter()
        .map(|key| {
            let mut group = groups.remove(&key).expect("key collected from groups");
            group.sort_by_key(|r| r.created_at);

            let latest = group.last().expect("groups are never empty").clone();
            let favorites: Vec<&DiagnosisRecord> =
                group.iter().filter(|r| r.favorited).collect();
            let latest_favorite = favorites.last().map(|r| (*r).clone());

            DiagnosisUser {
                key,
                email: latest.email.clone(),
                email_lower: latest.email_lower.clone(),
                latest,
                favorite_count: favorites.len(),
                latest_favorite,
                records: group,
            }
        })
        .collect()
}

/// Email → position index over resolved users, for the join-side matching.
pub fn index_by_email(users: &[DiagnosisUser]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (pos, user) in users.iter().enumerate() {
        if let Some(email) = &user.email_lower {
            index.entry(email.clone()).or_insert(pos);
        }
    }
    index
}
