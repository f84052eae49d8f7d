//! WildGuard Core - incident intake and case management for wildlife protection
//!
//! This crate turns citizen threat reports into tracked cases, routes them to
//! field officers and teams, and fans out notifications and alerts. The
//! implementation prioritizes:
//!
//! 1. **Consistency** - Guarded writes for report decisions and ranger missions
//! 2. **Logging** - Every decision point logged with request context
//! 3. **Privacy** - Anonymous reporters are redacted on every staff read
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `desk` - Operation facade with per-operation access checks
//! - `intake` - Report submission, validation and case creation
//! - `cases` - Case lifecycle transitions and statistics
//! - `assignment` - Routing, workload balancing and bulk assignment
//! - `missions` - Ranger accept / decline and field progress
//! - `notify` - Per-user notifications and role-targeted alerts
//! - `identity` - Caller resolution and request context
//! - `security` - Input sanitization and PII scrubbing
//! - `storage` - Record models, filters and the document store seam
//! - `config` - TOML configuration
//! - `logging` - Structured logging with request context

pub mod assignment;
pub mod cases;
pub mod config;
pub mod desk;
pub mod error;
pub mod identity;
pub mod intake;
pub mod logging;
pub mod missions;
pub mod notify;
pub mod security;
pub mod storage;

pub use config::DeskConfig;
pub use desk::Desk;
pub use error::{DeskError, DeskResult, StoreError, StoreResult};
pub use identity::{Caller, RequestContext};
pub use storage::{DocumentStore, MemoryStore};

/// Install the process logger. Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
