/// Application-level constants
pub const APP_NAME: &str = "Kaiseki";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Identity key prefix for diagnosis rows that carry no email. The row index
/// is appended, so every record lands in exactly one identity group.
pub const SYNTHETIC_KEY_PREFIX: &str = "__noemail__";

/// Placeholder type label for rows with an empty type column.
pub const UNKNOWN_TYPE: &str = "(unknown)";

/// Default histogram key for share events without a platform.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Sample-size floors below which a statistic is undefined rather than noisy.
pub const MIN_STD_SAMPLE: usize = 2;
pub const MIN_CORRELATION_PAIRS: usize = 3;

/// Minimum observations per side for a cohort feature contrast.
pub const MIN_COHORT_SIDE: usize = 10;

/// Minimum group size for per-category rate series.
pub const MIN_RATE_GROUP: usize = 5;

/// Bin count for chart-ready histograms.
pub const HISTOGRAM_BINS: usize = 20;

/// Axis scores are expected within this inclusive range; values outside it
/// are counted by the data-quality summary.
pub const AXIS_RANGE: (f64, f64) = (0.0, 100.0);
