//! Presentation-facing data: KPI snapshots, chart-ready series, table row
//! sets (raw or pseudonymized), filter-control options, and serialized
//! exports. Everything is plain data — rendering happens outside the
//! crate.

pub mod export;
pub mod kpis;
pub mod options;
pub mod quality;
pub mod series;
pub mod tables;
