//! Assignment engine.
//!
//! Specialization routing, workload-balanced auto-assignment, bulk
//! assignment and the read-only workload / recommendation views.

pub mod engine;
pub mod routing;
pub mod workload;

pub use engine::*;
pub use routing::{required_specialization, specialization_for, AssigneeKind};
pub use workload::*;
