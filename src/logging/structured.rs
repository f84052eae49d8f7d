//! Structured logging utilities.
//!
//! Every log line carries the request id, and where known the acting user
//! and the case/report it touches, so one request can be followed across
//! the intake, case, assignment and mission modules.

use std::fmt;

/// Logging context for a single request.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub request_id: String,
    pub actor: Option<String>,
    pub entity: Option<String>,
}

impl LogContext {
    pub fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            actor: None,
            entity: None,
        }
    }

    pub fn with_actor(&self, actor: &str) -> Self {
        Self {
            request_id: self.request_id.clone(),
            actor: Some(actor.to_string()),
            entity: self.entity.clone(),
        }
    }

    pub fn with_entity(&self, entity: &str) -> Self {
        Self {
            request_id: self.request_id.clone(),
            actor: self.actor.clone(),
            entity: Some(entity.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[req={}]", self.request_id)?;
        if let Some(actor) = &self.actor {
            write!(f, " [actor={}]", actor)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " [entity={}]", entity)?;
        }
        Ok(())
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}
