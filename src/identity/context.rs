//! Request context.
//!
//! Carries the request id, the caller (if any) and the request clock for
//! logging and actor attribution.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DeskError, DeskResult};
use crate::logging::structured::LogContext;

use super::caller::Caller;

/// Context for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub caller: Option<Caller>,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(caller: Option<Caller>) -> Self {
        let request_id = format!("req-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            request_id,
            caller,
            received_at: Utc::now(),
        }
    }

    pub fn for_caller(caller: Caller) -> Self {
        Self::new(Some(caller))
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Caller that must be present past the capability check.
    pub fn caller(&self) -> DeskResult<&Caller> {
        self.caller.as_ref().ok_or(DeskError::Unauthenticated)
    }

    pub fn actor_id(&self) -> DeskResult<&str> {
        Ok(self.caller()?.user_id.as_str())
    }

    pub fn log_context(&self) -> LogContext {
        let ctx = LogContext::new(&self.request_id);
        match &self.caller {
            Some(caller) => ctx.with_actor(&caller.user_id),
            None => ctx,
        }
    }

    /// Log context scoped to a case or report.
    pub fn log_for(&self, entity: &str) -> LogContext {
        self.log_context().with_entity(entity)
    }
}
