//! Ranger mission tracking.
//!
//! One mission shadows each assigned case and records the officer's
//! field status: ASSIGNED, then ACCEPTED or DECLINED, then the field
//! progress steps through to CLOSED.

pub mod progress;
pub mod tracking;

pub use progress::*;
pub use tracking::{
    accept_mission, decline_mission, ensure_mission, list_my_assigned_cases, reconcile_mission,
    AssignedCaseView, ReconcileOutcome,
};
