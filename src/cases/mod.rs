//! Case lifecycle.
//!
//! The transition table, the assign / investigate / resolve / close
//! operations with their notification side effects, and overview
//! statistics.

pub mod lifecycle;
pub mod service;
pub mod stats;

pub use lifecycle::{case_from_report, next_status, CaseEvent, Transition};
pub use service::*;
pub use stats::*;
