//! Pure derivation functions over a loaded `Dataset`: view filtering,
//! null-safe statistics, referrer leaderboards, cohort contrasts, and
//! graph structure analysis. Nothing here mutates the snapshot.

pub mod cohort;
pub mod filtering;
pub mod leaderboard;
pub mod network;
pub mod stats;
