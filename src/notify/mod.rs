//! Notification and alert fan-out.
//!
//! Notifications are per-user records; alerts are role-targeted
//! broadcasts resolved at read time. Both are persisted for polling.

pub mod alerts;
pub mod notifications;

pub use alerts::*;
pub use notifications::*;
