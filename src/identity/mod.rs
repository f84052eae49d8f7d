//! Identity and role context.
//!
//! - Caller resolution from the user directory
//! - Declarative per-operation capability checks
//! - Request context for logging and actor attribution

pub mod caller;
pub mod context;

pub use caller::*;
pub use context::*;
