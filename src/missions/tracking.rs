//! Ranger missions: provisioning, the officer's case list, and the
//! accept / decline decision.
//!
//! Every mission write is a compare-and-swap on the stored revision, so of
//! two writers that read the same copy exactly one wins. The loser gets
//! `Conflict` and should re-read.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cases::service::load_case;
use crate::error::{DeskError, DeskResult, StoreError};
use crate::identity::RequestContext;
use crate::notify::notifications::{notify_by_role_best_effort, NotificationDraft};
use crate::security::scrub_text;
use crate::storage::{
    paginate, AppendOnly, Case, CaseFilter, CaseStatus, DocumentStore, Location, MediaItem,
    MissionFilter, NoticePriority, NotificationKind, Page, PageResult, Priority, RangerMission,
    RangerStatus, Role, StatusChange, ThreatType,
};

/// Merged case, mission and report fields for the officer's list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedCaseView {
    pub case_id: String,
    pub report_id: String,
    pub threat_type: ThreatType,
    pub location: Location,
    pub priority: Priority,
    pub status: CaseStatus,
    pub description: Option<String>,
    pub media: Vec<MediaItem>,
    /// `None` when no mission has been provisioned yet.
    pub ranger_status: Option<RangerStatus>,
    pub ranger_status_history: Vec<StatusChange>,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileOutcome {
    /// Case and mission already agree.
    Consistent,
    /// A declined mission's officer was still on the case and was removed.
    Repaired,
}

pub(crate) fn history_entry(
    status: RangerStatus,
    actor: Option<&str>,
    notes: Option<&str>,
    at: DateTime<Utc>,
) -> StatusChange {
    StatusChange {
        status,
        changed_at: at,
        changed_by: actor.map(str::to_string),
        notes: notes.map(str::to_string),
    }
}

fn new_mission(case_id: &str, officer_id: &str, assigned_by: Option<&str>) -> RangerMission {
    let now = Utc::now();
    let mut history = AppendOnly::new();
    history.push(history_entry(RangerStatus::Assigned, assigned_by, None, now));
    RangerMission {
        case_id: case_id.to_string(),
        assigned_to: officer_id.to_string(),
        assigned_by: assigned_by.map(str::to_string),
        ranger_status: RangerStatus::Assigned,
        history,
        decline_reason: None,
        evidence: AppendOnly::new(),
        resolution: None,
        revision: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Write `updated`, a modified copy of a stored mission, only if nobody
/// has written the mission since that copy was read. Bumps the revision.
pub(crate) fn swap_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    updated: &mut RangerMission,
) -> DeskResult<()> {
    let expected = updated.revision;
    updated.revision = expected + 1;
    if store.replace_mission_if(expected, updated)? {
        return Ok(());
    }
    updated.revision = expected;
    log::warn!(
        "{} MISSION_CAS_LOST revision={} wanted={} officer={}",
        ctx.log_for(&updated.case_id),
        expected,
        updated.ranger_status,
        updated.assigned_to
    );
    Err(DeskError::Conflict("could not update mission".to_string()))
}

/// Get-or-create the mission for a case's current officer.
///
/// A missing mission is created at ASSIGNED. A mission that was declined,
/// already closed, or is held by a different officer is handed to the
/// current officer at ASSIGNED with a new history entry. Otherwise the
/// stored mission is returned untouched.
pub fn ensure_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
) -> DeskResult<RangerMission> {
    let case = load_case(store, case_id)?;
    let officer = case.assigned_officer.as_deref().ok_or_else(|| {
        DeskError::InvalidState("case has no assigned officer".to_string())
    })?;
    let actor = ctx.caller.as_ref().map(|c| c.user_id.as_str());
    let log_ctx = ctx.log_for(case_id);

    let existing = match store.mission(case_id)? {
        Some(mission) => mission,
        None => {
            let mission = new_mission(case_id, officer, actor);
            match store.insert_mission(mission.clone()) {
                Ok(()) => {
                    log::info!("{} MISSION_CREATED officer={}", log_ctx, officer);
                    return Ok(mission);
                }
                // Lost a creation race; fall through to the stored one.
                Err(StoreError::DuplicateKey { .. }) => store
                    .mission(case_id)?
                    .ok_or_else(|| DeskError::Conflict("could not create mission".to_string()))?,
                Err(e) => return Err(e.into()),
            }
        }
    };

    let stale = matches!(
        existing.ranger_status,
        RangerStatus::Declined | RangerStatus::Closed
    );
    if existing.assigned_to == officer && !stale {
        return Ok(existing);
    }

    let now = Utc::now();
    let mut mission = existing.clone();
    mission.assigned_to = officer.to_string();
    mission.assigned_by = actor.map(str::to_string);
    mission.ranger_status = RangerStatus::Assigned;
    mission.decline_reason = None;
    mission.resolution = None;
    mission.history.push(history_entry(
        RangerStatus::Assigned,
        actor,
        Some(&format!("reassigned from {}", existing.assigned_to)),
        now,
    ));
    mission.updated_at = now;
    swap_mission(store, ctx, &mut mission)?;

    log::info!(
        "{} MISSION_REPROVISIONED from_officer={} from_status={} officer={}",
        log_ctx,
        existing.assigned_to,
        existing.ranger_status,
        officer
    );
    Ok(mission)
}

fn description_for(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case: &Case,
) -> DeskResult<(Option<String>, Vec<MediaItem>)> {
    Ok(match store.report(&case.report_id)? {
        Some(report) => {
            let description = if case.reporter.is_anonymous {
                scrub_text(&report.description, &ctx.log_for(&case.case_id)).0
            } else {
                report.description
            };
            (Some(description), report.media)
        }
        None => (None, Vec::new()),
    })
}

fn merge_view(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case: Case,
    mission: Option<RangerMission>,
) -> DeskResult<AssignedCaseView> {
    let (description, media) = description_for(store, ctx, &case)?;
    Ok(AssignedCaseView {
        ranger_status: mission.as_ref().map(|m| m.ranger_status),
        ranger_status_history: mission
            .as_ref()
            .map(|m| m.history.as_slice().to_vec())
            .unwrap_or_default(),
        decline_reason: mission.and_then(|m| m.decline_reason),
        case_id: case.case_id,
        report_id: case.report_id,
        threat_type: case.threat_type,
        location: case.location,
        priority: case.priority,
        status: case.status,
        description,
        media,
        created_at: case.created_at,
    })
}

/// The officer's cases merged with their missions, newest first.
///
/// With `ranger_status`, pages over the officer's missions in that status
/// (missions whose case is gone are skipped). Without it, pages over the
/// cases assigned to the officer. Read-only: a case with no mission yet
/// shows `ranger_status: None`.
pub fn list_my_assigned_cases(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    ranger_status: Option<RangerStatus>,
    page: Page,
) -> DeskResult<PageResult<AssignedCaseView>> {
    let officer_id = ctx.actor_id()?;

    match ranger_status {
        Some(status) => {
            let mut missions = store.missions(&MissionFilter {
                assigned_to: Some(officer_id.to_string()),
                ranger_status: Some(status),
            })?;
            missions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let paged = paginate(missions, page);

            let mut items = Vec::with_capacity(paged.items.len());
            for mission in paged.items {
                match store.case(&mission.case_id)? {
                    Some(case) => items.push(merge_view(store, ctx, case, Some(mission))?),
                    None => log::warn!(
                        "{} MISSION_ORPHANED case={}",
                        ctx.log_context(),
                        mission.case_id
                    ),
                }
            }
            Ok(PageResult {
                items,
                page: paged.page,
                pages: paged.pages,
                total: paged.total,
            })
        }
        None => {
            let mut cases = store.cases(&CaseFilter {
                assigned_officer: Some(officer_id.to_string()),
                ..CaseFilter::default()
            })?;
            cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let paged = paginate(cases, page);

            let mut items = Vec::with_capacity(paged.items.len());
            for case in paged.items {
                let mission = store.mission(&case.case_id)?;
                items.push(merge_view(store, ctx, case, mission)?);
            }
            Ok(PageResult {
                items,
                page: paged.page,
                pages: paged.pages,
                total: paged.total,
            })
        }
    }
}

/// Case and mission for a caller who must be both the case's officer and
/// the mission's holder.
pub(crate) fn caller_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
) -> DeskResult<(Case, RangerMission)> {
    let officer_id = ctx.actor_id()?;
    let case = load_case(store, case_id)?;
    let on_case = case.assigned_officer.as_deref() == Some(officer_id);

    match store.mission(case_id)? {
        Some(mission) if mission.assigned_to == officer_id => {
            if on_case {
                return Ok((case, mission));
            }
            // The caller's own decline already took them off the case.
            if mission.ranger_status == RangerStatus::Declined {
                return Err(DeskError::InvalidState(format!(
                    "mission already {}",
                    mission.ranger_status
                )));
            }
        }
        Some(mission) if on_case => {
            // Still held by the previous officer; not yet handed over.
            log::warn!(
                "{} MISSION_HELD_BY_OTHER holder={}",
                ctx.log_for(case_id),
                mission.assigned_to
            );
            return Err(DeskError::not_found("mission", case_id));
        }
        None if on_case => return Err(DeskError::not_found("mission", case_id)),
        _ => {}
    }
    log::warn!("{} MISSION_NOT_ASSIGNED_TO_CALLER", ctx.log_for(case_id));
    Err(DeskError::Forbidden("case is not assigned to you".to_string()))
}

fn require_assigned(mission: &RangerMission, verb: &str) -> DeskResult<()> {
    if mission.ranger_status != RangerStatus::Assigned {
        return Err(DeskError::InvalidState(format!(
            "mission can only be {} when status is ASSIGNED (currently {})",
            verb, mission.ranger_status
        )));
    }
    Ok(())
}

/// ASSIGNED to ACCEPTED for the caller's own mission.
pub fn accept_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
) -> DeskResult<RangerMission> {
    let (_, mut mission) = caller_mission(store, ctx, case_id)?;
    require_assigned(&mission, "accepted")?;

    let now = Utc::now();
    let actor = ctx.actor_id()?;
    mission.ranger_status = RangerStatus::Accepted;
    mission
        .history
        .push(history_entry(RangerStatus::Accepted, Some(actor), None, now));
    mission.updated_at = now;
    swap_mission(store, ctx, &mut mission)?;

    log::info!("{} MISSION_ACCEPTED", ctx.log_for(case_id));
    Ok(mission)
}

/// ASSIGNED to DECLINED, then take the caller off the case.
///
/// The mission write happens first. The case is only unassigned while the
/// caller still holds it; a concurrent reassignment is left alone. If the
/// case write fails the mission stays DECLINED and `Inconsistent` is
/// returned; [`reconcile_mission`] repairs the case.
pub fn decline_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    reason: Option<&str>,
) -> DeskResult<RangerMission> {
    let (_, mut mission) = caller_mission(store, ctx, case_id)?;
    require_assigned(&mission, "declined")?;

    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    let now = Utc::now();
    let actor = ctx.actor_id()?.to_string();
    mission.ranger_status = RangerStatus::Declined;
    mission.decline_reason = reason.map(str::to_string);
    mission
        .history
        .push(history_entry(RangerStatus::Declined, Some(&actor), reason, now));
    mission.updated_at = now;
    swap_mission(store, ctx, &mut mission)?;

    let log_ctx = ctx.log_for(case_id);
    match store.clear_case_officer_if(case_id, &actor, now) {
        Ok(true) => {}
        Ok(false) => log::info!("{} MISSION_DECLINE_CASE_ALREADY_REASSIGNED", log_ctx),
        Err(e) => {
            log::error!(
                "{} MISSION_DECLINE_PARTIAL mission=DECLINED case_still_assigned=true error={}",
                log_ctx,
                e
            );
            return Err(DeskError::Inconsistent {
                case_id: case_id.to_string(),
                detail: "mission declined but case is still assigned".to_string(),
            });
        }
    }

    log::info!(
        "{} MISSION_DECLINED reason={}",
        log_ctx,
        reason.unwrap_or("-")
    );

    let draft = NotificationDraft::new(
        "Mission declined",
        &format!(
            "Officer {} declined case {}{}; it needs a new assignee",
            actor,
            case_id,
            reason.map(|r| format!(" ({})", r)).unwrap_or_default()
        ),
        NotificationKind::StatusUpdate,
        NoticePriority::High,
    )
    .with_case(case_id);
    notify_by_role_best_effort(store, ctx, &[Role::Admin], &draft);

    Ok(mission)
}

/// Finish a decline whose case write failed.
pub fn reconcile_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
) -> DeskResult<ReconcileOutcome> {
    let case = load_case(store, case_id)?;
    let mission = store
        .mission(case_id)?
        .ok_or_else(|| DeskError::not_found("mission", case_id))?;

    let stuck = mission.ranger_status == RangerStatus::Declined
        && case.assigned_officer.as_deref() == Some(mission.assigned_to.as_str());
    if !stuck {
        return Ok(ReconcileOutcome::Consistent);
    }

    if !store.clear_case_officer_if(case_id, &mission.assigned_to, Utc::now())? {
        return Ok(ReconcileOutcome::Consistent);
    }
    log::warn!(
        "{} MISSION_RECONCILED cleared_officer={}",
        ctx.log_for(case_id),
        mission.assigned_to
    );
    Ok(ReconcileOutcome::Repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Caller;
    use crate::storage::{
        AccountStatus, Investigation, MemoryStore, ReporterInfo, UserRecord,
    };

    fn case(id: &str, officer: Option<&str>) -> Case {
        let now = Utc::now();
        Case {
            case_id: id.to_string(),
            report_id: "TR-GONE".to_string(),
            threat_type: ThreatType::InjuredAnimal,
            location: Location {
                lat: 6.4,
                lng: 81.4,
                address: "Yala".to_string(),
            },
            reporter: ReporterInfo::default(),
            date_time: now,
            priority: Priority::Medium,
            status: CaseStatus::InProgress,
            assigned_officer: officer.map(str::to_string),
            assigned_team: None,
            investigation: Investigation::default(),
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_user(UserRecord {
            id: "adm-1".to_string(),
            name: "Admin".to_string(),
            email: "adm@example.org".to_string(),
            phone: None,
            role: Role::Admin,
            status: AccountStatus::Active,
        });
        store.insert_case(case("CS-1", Some("off-1"))).unwrap();
        store
    }

    fn officer(id: &str) -> RequestContext {
        RequestContext::for_caller(Caller::new(id, Role::Officer))
    }

    #[test]
    fn test_ensure_mission_is_idempotent() {
        let store = seeded();
        let first = ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        let second = ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ranger_status, RangerStatus::Assigned);
        assert_eq!(first.history.len(), 1);
    }

    #[test]
    fn test_ensure_mission_needs_officer() {
        let store = seeded();
        store.insert_case(case("CS-2", None)).unwrap();
        assert!(matches!(
            ensure_mission(&store, &officer("adm-1"), "CS-2"),
            Err(DeskError::InvalidState(_))
        ));
    }

    #[test]
    fn test_accept_once() {
        let store = seeded();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        let ctx = officer("off-1");
        let mission = accept_mission(&store, &ctx, "CS-1").unwrap();
        assert_eq!(mission.ranger_status, RangerStatus::Accepted);
        assert_eq!(mission.history.last().unwrap().changed_by.as_deref(), Some("off-1"));

        assert!(matches!(
            accept_mission(&store, &ctx, "CS-1"),
            Err(DeskError::InvalidState(_))
        ));
        assert!(matches!(
            decline_mission(&store, &ctx, "CS-1", None),
            Err(DeskError::InvalidState(_))
        ));
    }

    #[test]
    fn test_accept_requires_own_case_and_mission() {
        let store = seeded();
        assert!(matches!(
            accept_mission(&store, &officer("off-1"), "CS-1"),
            Err(DeskError::NotFound { .. })
        ));
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        assert!(matches!(
            accept_mission(&store, &officer("off-2"), "CS-1"),
            Err(DeskError::Forbidden(_))
        ));
    }

    #[test]
    fn test_decline_unassigns_case() {
        let store = seeded();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        let mission =
            decline_mission(&store, &officer("off-1"), "CS-1", Some("wrong jurisdiction")).unwrap();
        assert_eq!(mission.ranger_status, RangerStatus::Declined);
        assert_eq!(mission.decline_reason.as_deref(), Some("wrong jurisdiction"));
        assert_eq!(
            mission.history.last().unwrap().notes.as_deref(),
            Some("wrong jurisdiction")
        );
        assert!(store.case("CS-1").unwrap().unwrap().assigned_officer.is_none());
        assert_eq!(
            reconcile_mission(&store, &officer("adm-1"), "CS-1").unwrap(),
            ReconcileOutcome::Consistent
        );
    }

    #[test]
    fn test_repeat_after_decline_is_invalid_state() {
        let store = seeded();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        decline_mission(&store, &officer("off-1"), "CS-1", None).unwrap();

        assert!(matches!(
            decline_mission(&store, &officer("off-1"), "CS-1", None),
            Err(DeskError::InvalidState(_))
        ));
        assert!(matches!(
            accept_mission(&store, &officer("off-1"), "CS-1"),
            Err(DeskError::InvalidState(_))
        ));
        assert!(matches!(
            accept_mission(&store, &officer("off-2"), "CS-1"),
            Err(DeskError::Forbidden(_))
        ));
    }

    #[test]
    fn test_stale_swap_is_conflict() {
        let store = seeded();
        let mission = ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        accept_mission(&store, &officer("off-1"), "CS-1").unwrap();

        // A decline computed against the old ASSIGNED copy loses.
        let mut late = mission;
        late.ranger_status = RangerStatus::Declined;
        assert!(matches!(
            swap_mission(&store, &officer("off-1"), &mut late),
            Err(DeskError::Conflict(_))
        ));
        assert_eq!(late.revision, 0);
        let stored = store.mission("CS-1").unwrap().unwrap();
        assert_eq!(stored.ranger_status, RangerStatus::Accepted);
        assert_eq!(stored.revision, 1);
    }

    #[test]
    fn test_previous_holder_cannot_act_after_handover() {
        let store = seeded();
        let stale = ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();

        let mut reassigned = store.case("CS-1").unwrap().unwrap();
        reassigned.assigned_officer = Some("off-2".to_string());
        store.update_case(&reassigned).unwrap();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();

        // Same status on both sides of the handover; the revision still moved.
        let mut late = stale;
        late.ranger_status = RangerStatus::Declined;
        assert!(matches!(
            swap_mission(&store, &officer("off-1"), &mut late),
            Err(DeskError::Conflict(_))
        ));
        assert!(matches!(
            decline_mission(&store, &officer("off-1"), "CS-1", None),
            Err(DeskError::Forbidden(_))
        ));
        let stored = store.mission("CS-1").unwrap().unwrap();
        assert_eq!(stored.assigned_to, "off-2");
        assert_eq!(stored.ranger_status, RangerStatus::Assigned);
    }

    #[test]
    fn test_new_officer_cannot_take_previous_holders_mission() {
        let store = seeded();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();

        // Case moved to off-2 but the mission was never handed over.
        let mut reassigned = store.case("CS-1").unwrap().unwrap();
        reassigned.assigned_officer = Some("off-2".to_string());
        store.update_case(&reassigned).unwrap();

        assert!(matches!(
            accept_mission(&store, &officer("off-2"), "CS-1"),
            Err(DeskError::NotFound { .. })
        ));
        assert_eq!(
            store.mission("CS-1").unwrap().unwrap().ranger_status,
            RangerStatus::Assigned
        );
    }

    #[test]
    fn test_decline_leaves_reassigned_case_alone() {
        let store = seeded();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        decline_mission(&store, &officer("off-1"), "CS-1", None).unwrap();

        // The case moved on before reconcile ran.
        let mut reassigned = store.case("CS-1").unwrap().unwrap();
        reassigned.assigned_officer = Some("off-3".to_string());
        store.update_case(&reassigned).unwrap();
        assert_eq!(
            reconcile_mission(&store, &officer("adm-1"), "CS-1").unwrap(),
            ReconcileOutcome::Consistent
        );
        assert_eq!(
            store.case("CS-1").unwrap().unwrap().assigned_officer.as_deref(),
            Some("off-3")
        );
    }

    #[test]
    fn test_reprovision_after_decline() {
        let store = seeded();
        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        decline_mission(&store, &officer("off-1"), "CS-1", None).unwrap();

        let mut reassigned = store.case("CS-1").unwrap().unwrap();
        reassigned.assigned_officer = Some("off-2".to_string());
        store.update_case(&reassigned).unwrap();

        let mission = ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        assert_eq!(mission.assigned_to, "off-2");
        assert_eq!(mission.ranger_status, RangerStatus::Assigned);
        assert_eq!(mission.history.len(), 3);
        assert!(accept_mission(&store, &officer("off-2"), "CS-1").is_ok());
    }

    #[test]
    fn test_list_my_cases_read_only() {
        let store = seeded();
        let ctx = officer("off-1");
        let page = list_my_assigned_cases(&store, &ctx, None, Page::first(10)).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].ranger_status, None);
        assert!(store.mission("CS-1").unwrap().is_none());

        ensure_mission(&store, &officer("adm-1"), "CS-1").unwrap();
        let page = list_my_assigned_cases(
            &store,
            &ctx,
            Some(RangerStatus::Assigned),
            Page::first(10),
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].ranger_status, Some(RangerStatus::Assigned));
        assert_eq!(page.items[0].ranger_status_history.len(), 1);

        let page = list_my_assigned_cases(
            &store,
            &ctx,
            Some(RangerStatus::Accepted),
            Page::first(10),
        )
        .unwrap();
        assert_eq!(page.total, 0);
    }
}
