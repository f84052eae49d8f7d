//! Case operations: assignment, investigation log, resolution, closure
//! and the staff-facing read views.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{DeskError, DeskResult};
use crate::identity::RequestContext;
use crate::missions::tracking::ensure_mission;
use crate::notify::notifications::{notify_user_best_effort, NotificationDraft};
use crate::security::{redact_reporter, scan_fields, scrub_text};
use crate::storage::{
    paginate, ActionTaken, Case, CaseFilter, CaseStatus, DocumentStore, Evidence, EvidenceKind,
    Finding, NoticePriority, NotificationKind, Page, PageResult, Priority, Resolution,
    TeamRecord, UserRecord,
};

use super::lifecycle::{next_status, CaseEvent};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub officer_id: Option<String>,
    pub team_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceInput {
    pub url: String,
    /// Wire name of an evidence kind; defaults to PHOTO.
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub action: String,
    pub result: Option<String>,
}

/// Any subset of the three investigation log entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationUpdate {
    pub finding: Option<String>,
    pub evidence: Option<EvidenceInput>,
    pub action: Option<ActionInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInput {
    pub action_summary: String,
    pub outcome: String,
}

/// Case plus the originating report's description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    #[serde(flatten)]
    pub case: Case,
    pub description: Option<String>,
}

/// Case after an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    #[serde(flatten)]
    pub case: Case,
    /// An officer was assigned but their mission could not be provisioned.
    /// Retry with `ensure_mission`.
    pub mission_pending: bool,
}

/// Resolved assignee records.
#[derive(Debug, Clone, Default)]
pub struct AssignmentTarget {
    pub officer: Option<UserRecord>,
    pub team: Option<TeamRecord>,
}

impl AssignmentTarget {
    pub fn officer(officer: UserRecord) -> Self {
        Self {
            officer: Some(officer),
            team: None,
        }
    }

    pub fn team(team: TeamRecord) -> Self {
        Self {
            officer: None,
            team: Some(team),
        }
    }

    /// Who hears about the assignment: the officer, else the first team member.
    pub fn recipient(&self) -> Option<&str> {
        self.officer
            .as_ref()
            .map(|o| o.id.as_str())
            .or_else(|| {
                self.team
                    .as_ref()
                    .and_then(|t| t.members.first())
                    .map(|m| m.officer_id.as_str())
            })
    }
}

/// How an assignment was made. Only changes logging and message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOrigin {
    Manual,
    Auto,
    Bulk,
}

impl AssignmentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentOrigin::Manual => "manual",
            AssignmentOrigin::Auto => "auto",
            AssignmentOrigin::Bulk => "bulk",
        }
    }
}

pub fn notice_priority_for(priority: Priority) -> NoticePriority {
    match priority {
        Priority::Low => NoticePriority::Low,
        Priority::Medium => NoticePriority::Medium,
        Priority::High => NoticePriority::High,
        Priority::Critical => NoticePriority::Urgent,
    }
}

pub(crate) fn load_case(store: &dyn DocumentStore, case_id: &str) -> DeskResult<Case> {
    store
        .case(case_id)?
        .ok_or_else(|| DeskError::not_found("case", case_id))
}

/// Look up and check the requested officer and team.
///
/// The officer must be an ACTIVE OFFICER or ADMIN; the team must exist.
pub fn resolve_target(
    store: &dyn DocumentStore,
    officer_id: Option<&str>,
    team_id: Option<&str>,
) -> DeskResult<AssignmentTarget> {
    let officer = match officer_id {
        Some(id) => {
            let user = store
                .user(id)?
                .filter(|u| u.role.is_staff() && u.is_active())
                .ok_or_else(|| {
                    DeskError::InvalidArgument(format!(
                        "officer {} must be an active OFFICER or ADMIN",
                        id
                    ))
                })?;
            Some(user)
        }
        None => None,
    };

    let team = match team_id {
        Some(id) => Some(
            store
                .team(id)?
                .ok_or_else(|| DeskError::InvalidArgument(format!("team {} does not exist", id)))?,
        ),
        None => None,
    };

    Ok(AssignmentTarget { officer, team })
}

/// Shared effect of every assignment path.
///
/// Sets whichever of officer/team the target carries, moves the case to
/// IN_PROGRESS, provisions the officer's mission and sends CASE_ASSIGNED.
/// A failed provisioning does not undo the assignment; it is reported as
/// `mission_pending`.
pub fn apply_assignment(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    mut case: Case,
    target: &AssignmentTarget,
    notes: Option<&str>,
    origin: AssignmentOrigin,
) -> DeskResult<AssignmentOutcome> {
    let log_ctx = ctx.log_for(&case.case_id);
    let transition = next_status(case.status, CaseEvent::Assign)?;
    if transition.reopens() {
        log::warn!(
            "{} CASE_REOPENED from={} origin={}",
            log_ctx,
            transition.from,
            origin.as_str()
        );
    }

    if let Some(officer) = &target.officer {
        case.assigned_officer = Some(officer.id.clone());
    }
    if let Some(team) = &target.team {
        case.assigned_team = Some(team.id.clone());
    }
    case.status = transition.to;
    case.updated_at = Utc::now();
    store.update_case(&case)?;

    log::info!(
        "{} CASE_ASSIGNED origin={} officer={} team={}",
        log_ctx,
        origin.as_str(),
        case.assigned_officer.as_deref().unwrap_or("-"),
        case.assigned_team.as_deref().unwrap_or("-")
    );

    let mut mission_pending = false;
    if let Some(officer) = &target.officer {
        if let Err(e) = ensure_mission(store, ctx, &case.case_id) {
            log::error!(
                "{} MISSION_PROVISION_FAILED officer={} code={} error={}",
                log_ctx,
                officer.id,
                e.code(),
                e
            );
            mission_pending = true;
        }
    }

    if let Some(recipient) = target.recipient() {
        let mut metadata = serde_json::json!({ "origin": origin.as_str() });
        if let Some(notes) = notes {
            metadata["notes"] = serde_json::Value::String(notes.to_string());
        }
        let draft = NotificationDraft::new(
            "Case assigned",
            &format!(
                "{} case {} at {} has been assigned to you",
                case.threat_type, case.case_id, case.location.address
            ),
            NotificationKind::CaseAssigned,
            notice_priority_for(case.priority),
        )
        .with_case(&case.case_id)
        .with_metadata(metadata);
        notify_user_best_effort(store, ctx, recipient, &draft);
    }

    Ok(AssignmentOutcome {
        case,
        mission_pending,
    })
}

/// Manual assignment. Fields left out keep their current value.
pub fn assign_case(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    request: &AssignmentRequest,
) -> DeskResult<AssignmentOutcome> {
    let case = load_case(store, case_id)?;
    if request.officer_id.is_none() && request.team_id.is_none() {
        return Err(DeskError::InvalidArgument(
            "officerId or teamId is required".to_string(),
        ));
    }
    let target = resolve_target(
        store,
        request.officer_id.as_deref(),
        request.team_id.as_deref(),
    )?;
    apply_assignment(
        store,
        ctx,
        case,
        &target,
        request.notes.as_deref(),
        AssignmentOrigin::Manual,
    )
    .map(|outcome| AssignmentOutcome {
        case: staff_case(outcome.case),
        ..outcome
    })
}

/// Append investigation entries and move to UNDER_INVESTIGATION.
pub fn record_investigation(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    update: &InvestigationUpdate,
) -> DeskResult<Case> {
    let mut case = load_case(store, case_id)?;
    let actor = ctx.actor_id()?.to_string();
    let log_ctx = ctx.log_for(case_id);

    let finding = update.finding.as_deref().map(str::trim).filter(|f| !f.is_empty());
    if finding.is_none() && update.evidence.is_none() && update.action.is_none() {
        return Err(DeskError::InvalidArgument(
            "one of finding, evidence or action is required".to_string(),
        ));
    }

    let evidence_kind = match &update.evidence {
        Some(evidence) => {
            if evidence.url.trim().is_empty() {
                return Err(DeskError::InvalidArgument("evidence url is required".to_string()));
            }
            match evidence.kind.as_deref() {
                Some(raw) => Some(EvidenceKind::parse(raw).ok_or_else(|| {
                    DeskError::InvalidArgument(format!("unknown evidence kind: {}", raw))
                })?),
                None => Some(EvidenceKind::Photo),
            }
        }
        None => None,
    };
    if let Some(action) = &update.action {
        if action.action.trim().is_empty() {
            return Err(DeskError::InvalidArgument("action text is required".to_string()));
        }
    }

    let transition = next_status(case.status, CaseEvent::Investigate)?;
    if transition.reopens() {
        log::warn!("{} CASE_REOPENED from={} origin=investigation", log_ctx, transition.from);
    }

    let now = Utc::now();
    let mut free_text: Vec<(&str, &str)> = Vec::new();
    if let Some(text) = finding {
        free_text.push(("finding", text));
        case.investigation.findings.push(Finding {
            text: text.to_string(),
            added_at: now,
            added_by: actor.clone(),
        });
    }
    if let (Some(evidence), Some(kind)) = (&update.evidence, evidence_kind) {
        case.investigation.evidence.push(Evidence {
            url: evidence.url.trim().to_string(),
            kind,
            description: evidence.description.clone(),
            uploaded_at: now,
            uploaded_by: actor.clone(),
        });
    }
    if let Some(action) = &update.action {
        free_text.push(("action", action.action.as_str()));
        case.investigation.actions.push(ActionTaken {
            action: action.action.trim().to_string(),
            result: action.result.clone(),
            taken_at: now,
            taken_by: actor.clone(),
        });
    }
    scan_fields(&free_text, &log_ctx);

    case.status = transition.to;
    case.updated_at = now;
    store.update_case(&case)?;

    log::info!(
        "{} INVESTIGATION_RECORDED findings={} evidence={} actions={}",
        log_ctx,
        case.investigation.findings.len(),
        case.investigation.evidence.len(),
        case.investigation.actions.len()
    );
    Ok(staff_case(case))
}

pub fn resolve_case(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    input: &ResolutionInput,
) -> DeskResult<Case> {
    if input.action_summary.trim().is_empty() || input.outcome.trim().is_empty() {
        return Err(DeskError::InvalidArgument(
            "actionSummary and outcome are required".to_string(),
        ));
    }
    let mut case = load_case(store, case_id)?;
    let transition = next_status(case.status, CaseEvent::Resolve)?;

    let now = Utc::now();
    case.resolution = Some(Resolution {
        action_summary: input.action_summary.trim().to_string(),
        outcome: input.outcome.trim().to_string(),
        resolved_at: now,
        resolved_by: ctx.actor_id()?.to_string(),
    });
    case.status = transition.to;
    case.updated_at = now;
    store.update_case(&case)?;

    let log_ctx = ctx.log_for(case_id);
    log::info!("{} CASE_RESOLVED from={}", log_ctx, transition.from);

    if let Some(officer) = case.assigned_officer.as_deref() {
        let draft = NotificationDraft::new(
            "Case resolved",
            &format!("Case {} has been resolved: {}", case.case_id, input.outcome.trim()),
            NotificationKind::Resolution,
            NoticePriority::Medium,
        )
        .with_case(&case.case_id);
        notify_user_best_effort(store, ctx, officer, &draft);
    }

    Ok(staff_case(case))
}

/// RESOLVED to CLOSED. Any other status is `InvalidState`.
pub fn close_case(store: &dyn DocumentStore, ctx: &RequestContext, case_id: &str) -> DeskResult<Case> {
    let mut case = load_case(store, case_id)?;
    let transition = next_status(case.status, CaseEvent::Close)?;
    case.status = transition.to;
    case.updated_at = Utc::now();
    store.update_case(&case)?;
    log::info!("{} CASE_CLOSED", ctx.log_for(case_id));
    Ok(staff_case(case))
}

/// Case with anonymous reporter contact details removed.
pub fn staff_case(mut case: Case) -> Case {
    case.reporter = redact_reporter(&case.reporter);
    case
}

pub fn get_case(store: &dyn DocumentStore, ctx: &RequestContext, case_id: &str) -> DeskResult<CaseView> {
    let case = load_case(store, case_id)?;
    let description = match store.report(&case.report_id)? {
        Some(report) if case.reporter.is_anonymous => {
            Some(scrub_text(&report.description, &ctx.log_for(case_id)).0)
        }
        Some(report) => Some(report.description),
        None => {
            log::warn!(
                "{} CASE_REPORT_MISSING report={}",
                ctx.log_for(case_id),
                case.report_id
            );
            None
        }
    };
    Ok(CaseView {
        case: staff_case(case),
        description,
    })
}

fn newest_first(mut cases: Vec<Case>) -> Vec<Case> {
    cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    cases
}

pub fn list_cases(
    store: &dyn DocumentStore,
    filter: &CaseFilter,
    page: Page,
) -> DeskResult<PageResult<Case>> {
    Ok(paginate(newest_first(store.cases(filter)?), page).map(staff_case))
}

/// Cases held by one officer, any status unless `status` is given.
pub fn list_officer_cases(
    store: &dyn DocumentStore,
    officer_id: &str,
    status: Option<CaseStatus>,
    page: Page,
) -> DeskResult<PageResult<Case>> {
    let filter = CaseFilter {
        assigned_officer: Some(officer_id.to_string()),
        statuses: status.into_iter().collect(),
        ..CaseFilter::default()
    };
    list_cases(store, &filter, page)
}
