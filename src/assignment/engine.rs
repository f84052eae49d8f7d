//! Automatic and bulk assignment.

use serde::{Deserialize, Serialize};

use crate::cases::service::{
    apply_assignment, load_case, resolve_target, AssignmentOrigin, AssignmentRequest,
    AssignmentTarget,
};
use crate::error::{DeskError, DeskResult};
use crate::identity::RequestContext;
use crate::storage::{Case, CaseStatus, DocumentStore, Specialization, TeamFilter};

use super::routing::{required_specialization, AssigneeKind};
use super::workload::{least_loaded, staff_caseloads};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignRequest {
    #[serde(rename = "type")]
    pub kind: AssigneeKind,
    pub specialization: Option<Specialization>,
}

impl AutoAssignRequest {
    pub fn officer() -> Self {
        Self {
            kind: AssigneeKind::Officer,
            specialization: None,
        }
    }

    pub fn team(specialization: Option<Specialization>) -> Self {
        Self {
            kind: AssigneeKind::Team,
            specialization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignOutcome {
    pub case: Case,
    pub kind: &'static str,
    pub assignee_id: String,
    /// Open caseload of the chosen officer before this assignment.
    pub open_caseload: Option<usize>,
    pub mission_pending: bool,
}

/// Result of one case in a bulk assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult {
    pub case_id: String,
    pub success: bool,
    pub status: Option<CaseStatus>,
    /// Assigned, but the officer's mission still needs provisioning.
    pub mission_pending: bool,
    pub error_code: Option<&'static str>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignResult {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}

/// Assign an unassigned case to the least-loaded officer or to the first
/// active team with the required specialization.
pub fn auto_assign(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    request: &AutoAssignRequest,
) -> DeskResult<AutoAssignOutcome> {
    let case = load_case(store, case_id)?;
    let log_ctx = ctx.log_for(case_id);

    if case.is_assigned() {
        log::info!(
            "{} AUTO_ASSIGN_SKIPPED reason=already_assigned officer={} team={}",
            log_ctx,
            case.assigned_officer.as_deref().unwrap_or("-"),
            case.assigned_team.as_deref().unwrap_or("-")
        );
        return Err(DeskError::InvalidState("case is already assigned".to_string()));
    }

    let (target, assignee_id, open_caseload) = match request.kind {
        AssigneeKind::Officer => {
            let candidates = staff_caseloads(store)?;
            let (officer, load) = least_loaded(&candidates)
                .cloned()
                .ok_or_else(|| DeskError::not_found("officer", "any active officer"))?;
            log::info!(
                "{} AUTO_ASSIGN_PICKED officer={} open_cases={} candidates={}",
                log_ctx,
                officer.id,
                load,
                candidates.len()
            );
            let id = officer.id.clone();
            (AssignmentTarget::officer(officer), id, Some(load))
        }
        AssigneeKind::Team => {
            let specialization =
                required_specialization(case.threat_type, request.specialization, &log_ctx);
            let team = store
                .teams(&TeamFilter {
                    specialization: Some(specialization),
                    active_only: true,
                })?
                .into_iter()
                .next()
                .ok_or_else(|| DeskError::not_found("team", specialization.as_str()))?;
            log::info!(
                "{} AUTO_ASSIGN_PICKED team={} specialization={}",
                log_ctx,
                team.id,
                specialization
            );
            let id = team.id.clone();
            (AssignmentTarget::team(team), id, None)
        }
    };

    let assigned = apply_assignment(store, ctx, case, &target, None, AssignmentOrigin::Auto)?;
    Ok(AutoAssignOutcome {
        case: assigned.case,
        kind: request.kind.as_str(),
        assignee_id,
        open_caseload,
        mission_pending: assigned.mission_pending,
    })
}

/// Assign many cases to one officer and/or team.
///
/// The target is validated once up front; after that each case succeeds
/// or fails on its own.
pub fn bulk_assign(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_ids: &[String],
    request: &AssignmentRequest,
) -> DeskResult<BulkAssignResult> {
    if case_ids.is_empty() {
        return Err(DeskError::InvalidArgument("caseIds must not be empty".to_string()));
    }
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

    let mut results = Vec::with_capacity(case_ids.len());
    let mut succeeded = 0;
    let mut failed = 0;

    for case_id in case_ids {
        let outcome = load_case(store, case_id).and_then(|case| {
            apply_assignment(
                store,
                ctx,
                case,
                &target,
                request.notes.as_deref(),
                AssignmentOrigin::Bulk,
            )
        });

        match outcome {
            Ok(assigned) => {
                succeeded += 1;
                results.push(BulkItemResult {
                    case_id: case_id.clone(),
                    success: true,
                    status: Some(assigned.case.status),
                    mission_pending: assigned.mission_pending,
                    error_code: None,
                    error: None,
                });
            }
            Err(e) => {
                failed += 1;
                log::warn!(
                    "{} BULK_ASSIGN_ITEM_FAILED code={} error={}",
                    ctx.log_for(case_id),
                    e.code(),
                    e
                );
                results.push(BulkItemResult {
                    case_id: case_id.clone(),
                    success: false,
                    status: None,
                    mission_pending: false,
                    error_code: Some(e.code()),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    log::info!(
        "{} BULK_ASSIGN_COMPLETE requested={} succeeded={} failed={}",
        ctx.log_context(),
        case_ids.len(),
        succeeded,
        failed
    );

    Ok(BulkAssignResult {
        requested: case_ids.len(),
        succeeded,
        failed,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::identity::Caller;
    use crate::storage::{
        AccountStatus, Investigation, Location, MemberRole, MemoryStore, Priority, ReporterInfo,
        Role, TeamMember, TeamRecord, ThreatType, UserRecord,
    };

    fn user(id: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: format!("{}@example.org", id),
            phone: None,
            role: Role::Officer,
            status: AccountStatus::Active,
        }
    }

    fn case(id: &str, threat_type: ThreatType) -> Case {
        let now = Utc::now();
        Case {
            case_id: id.to_string(),
            report_id: "TR-1".to_string(),
            threat_type,
            location: Location {
                lat: 8.3,
                lng: 80.4,
                address: "Wilpattu".to_string(),
            },
            reporter: ReporterInfo::default(),
            date_time: now,
            priority: Priority::Medium,
            status: CaseStatus::New,
            assigned_officer: None,
            assigned_team: None,
            investigation: Investigation::default(),
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn team(id: &str, specialization: Specialization, active: bool, member: Option<&str>) -> TeamRecord {
        TeamRecord {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            specialization,
            members: member
                .map(|m| {
                    vec![TeamMember {
                        officer_id: m.to_string(),
                        role: MemberRole::Member,
                        joined_at: Utc::now(),
                    }]
                })
                .unwrap_or_default(),
            jurisdiction: None,
            active,
        }
    }

    fn admin() -> RequestContext {
        RequestContext::for_caller(Caller::new("adm-1", Role::Admin))
    }

    #[test]
    fn test_auto_assign_officer_rejects_assigned_case() {
        let store = MemoryStore::new();
        store.put_user(user("o1"));
        store.insert_case(case("CS-1", ThreatType::Poaching)).unwrap();

        let outcome = auto_assign(&store, &admin(), "CS-1", &AutoAssignRequest::officer()).unwrap();
        assert_eq!(outcome.assignee_id, "o1");
        assert_eq!(outcome.case.status, CaseStatus::InProgress);
        assert!(!outcome.mission_pending);

        let err = auto_assign(&store, &admin(), "CS-1", &AutoAssignRequest::officer()).unwrap_err();
        assert!(matches!(err, DeskError::InvalidState(_)));
    }

    #[test]
    fn test_auto_assign_no_officers() {
        let store = MemoryStore::new();
        store.insert_case(case("CS-1", ThreatType::Poaching)).unwrap();
        let err = auto_assign(&store, &admin(), "CS-1", &AutoAssignRequest::officer()).unwrap_err();
        assert!(matches!(err, DeskError::NotFound { .. }));
    }

    #[test]
    fn test_auto_assign_team_by_specialization() {
        let store = MemoryStore::new();
        store.put_user(user("o1"));
        store.put_team(team("t-inactive", Specialization::WildlifeRescue, false, None));
        store.put_team(team("t-poach", Specialization::Poaching, true, None));
        store.put_team(team("t-rescue", Specialization::WildlifeRescue, true, Some("o1")));
        store.insert_case(case("CS-1", ThreatType::InjuredAnimal)).unwrap();

        let outcome =
            auto_assign(&store, &admin(), "CS-1", &AutoAssignRequest::team(None)).unwrap();
        assert_eq!(outcome.assignee_id, "t-rescue");
        assert_eq!(outcome.case.assigned_team.as_deref(), Some("t-rescue"));
        assert!(outcome.case.assigned_officer.is_none());

        // First team member is notified.
        let notes = store
            .notifications(&crate::storage::NotificationFilter::for_user("o1"))
            .unwrap();
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_auto_assign_team_override() {
        let store = MemoryStore::new();
        store.put_team(team("t-fire", Specialization::ForestFire, true, None));
        store.insert_case(case("CS-1", ThreatType::Poaching)).unwrap();

        let err = auto_assign(&store, &admin(), "CS-1", &AutoAssignRequest::team(None)).unwrap_err();
        assert!(matches!(err, DeskError::NotFound { .. }));

        let outcome = auto_assign(
            &store,
            &admin(),
            "CS-1",
            &AutoAssignRequest::team(Some(Specialization::ForestFire)),
        )
        .unwrap();
        assert_eq!(outcome.assignee_id, "t-fire");
    }

    #[test]
    fn test_bulk_assign_isolates_failures() {
        let store = MemoryStore::new();
        store.put_user(user("o1"));
        store.insert_case(case("CS-A", ThreatType::Poaching)).unwrap();
        store.insert_case(case("CS-B", ThreatType::Poaching)).unwrap();

        let ids = vec!["CS-A".to_string(), "nonexistent".to_string(), "CS-B".to_string()];
        let request = AssignmentRequest {
            officer_id: Some("o1".to_string()),
            ..Default::default()
        };
        let result = bulk_assign(&store, &admin(), &ids, &request).unwrap();
        assert_eq!(result.results.len(), 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert!(result.results[0].success);
        assert!(!result.results[1].success);
        assert_eq!(result.results[1].error_code, Some("NOT_FOUND"));
        assert!(result.results[2].success);
    }

    #[test]
    fn test_bulk_assign_fails_fast_on_bad_target() {
        let store = MemoryStore::new();
        store.insert_case(case("CS-A", ThreatType::Poaching)).unwrap();
        let ids = vec!["CS-A".to_string()];

        let err = bulk_assign(&store, &admin(), &ids, &AssignmentRequest::default()).unwrap_err();
        assert!(matches!(err, DeskError::InvalidArgument(_)));

        let request = AssignmentRequest {
            officer_id: Some("ghost".to_string()),
            ..Default::default()
        };
        let err = bulk_assign(&store, &admin(), &ids, &request).unwrap_err();
        assert!(matches!(err, DeskError::InvalidArgument(_)));
        assert_eq!(store.case("CS-A").unwrap().unwrap().status, CaseStatus::New);
    }
}
