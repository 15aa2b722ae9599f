//! Kaiseki — in-memory analytics core for diagnosis submissions and
//! referral-funnel events.
//!
//! The crate ingests two loosely-typed row sets, normalizes them into typed
//! records, resolves per-user identities, derives the referral graph, joins
//! the two streams by completer email, and exposes pure derivation functions
//! (KPIs, leaderboards, cohort contrasts, chart series, exports) over the
//! resulting snapshot. Spreadsheet decoding and all rendering live outside
//! this crate.

pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod mask;
pub mod models;
pub mod pipeline;
pub mod views;

pub use error::LoadError;
pub use ingest::TableSet;
pub use pipeline::Dataset;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding applications that don't bring their own
/// subscriber. Honors `RUST_LOG` when set.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
