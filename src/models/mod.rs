//! Typed domain records and filter types shared across the pipeline and the
//! analytic views.

pub mod diagnosis;
pub mod filters;
pub mod referral;

pub use diagnosis::*;
pub use filters::*;
pub use referral::*;
