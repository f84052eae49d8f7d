//! Case state machine.
//!
//! ```text
//! NEW ──assign──▶ IN_PROGRESS ──investigate──▶ UNDER_INVESTIGATION
//!  │                  │                              │
//!  └──────────────────┴──────────resolve─────────────┴──▶ RESOLVED ──close──▶ CLOSED
//! ```
//!
//! Assign and investigate are accepted from any non-terminal state. From
//! RESOLVED they reopen the case. CLOSED accepts nothing.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{DeskError, DeskResult};
use crate::intake::ids::new_case_id;
use crate::security::redact_reporter;
use crate::storage::{Case, CaseStatus, Investigation, ThreatReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseEvent {
    Assign,
    Investigate,
    Resolve,
    Close,
}

impl CaseEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseEvent::Assign => "assign",
            CaseEvent::Investigate => "investigate",
            CaseEvent::Resolve => "resolve",
            CaseEvent::Close => "close",
        }
    }
}

impl fmt::Display for CaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CaseStatus,
    pub to: CaseStatus,
}

impl Transition {
    /// A RESOLVED case pushed back into active work.
    pub fn reopens(&self) -> bool {
        self.from == CaseStatus::Resolved && self.to.is_open()
    }
}

/// Look up `(current, event)` in the transition table.
pub fn next_status(current: CaseStatus, event: CaseEvent) -> DeskResult<Transition> {
    use CaseStatus::*;

    let to = match (current, event) {
        (Closed, _) => {
            return Err(DeskError::InvalidState(format!(
                "case is closed; cannot {}",
                event
            )))
        }
        (_, CaseEvent::Assign) => InProgress,
        (_, CaseEvent::Investigate) => UnderInvestigation,
        (Resolved, CaseEvent::Resolve) => {
            return Err(DeskError::InvalidState("case is already resolved".to_string()))
        }
        (_, CaseEvent::Resolve) => Resolved,
        (Resolved, CaseEvent::Close) => Closed,
        (_, CaseEvent::Close) => {
            return Err(DeskError::InvalidState(
                "only resolved cases can be closed".to_string(),
            ))
        }
    };

    Ok(Transition { from: current, to })
}

/// Build the NEW case for a validated report.
///
/// Priority is the report's urgency; threat type, location and incident
/// time are copied. The reporter is copied with anonymous contact details
/// removed.
pub fn case_from_report(report: &ThreatReport, now: DateTime<Utc>) -> Case {
    Case {
        case_id: new_case_id(),
        report_id: report.report_id.clone(),
        threat_type: report.threat_type,
        location: report.location.clone(),
        reporter: redact_reporter(&report.reporter),
        date_time: report.date_time,
        priority: report.urgency,
        status: CaseStatus::New,
        assigned_officer: None,
        assigned_team: None,
        investigation: Investigation::default(),
        resolution: None,
        created_at: now,
        updated_at: now,
    }
}
