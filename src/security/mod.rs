//! Security module.
//!
//! Injection-pattern scanning for submitted text and PII redaction for
//! anonymous reporters.

pub mod pii;
pub mod sanitizer;

pub use pii::*;
pub use sanitizer::*;
