//! Structured logging with request context.
//!
//! Provides logging macros and utilities that include the request id, the
//! acting user and the touched entity in every log message.

pub mod structured;

pub use structured::*;
