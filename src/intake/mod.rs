//! Threat intake.
//!
//! Report identifiers, media normalization and the submit / validate
//! workflow that is the sole creation path for cases.

pub mod ids;
pub mod media;
pub mod reports;

pub use ids::{is_well_formed, new_case_id, new_report_id, CASE_PREFIX, REPORT_PREFIX};
pub use media::normalize_media;
pub use reports::*;
