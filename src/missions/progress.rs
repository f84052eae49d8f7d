//! Field progress after acceptance.
//!
//! ACCEPTED → EN_ROUTE → ON_SITE → ACTION_TAKEN → CLOSED, one step at a
//! time, plus evidence and the field resolution record.

use chrono::Utc;
use serde::Deserialize;

use crate::error::{DeskError, DeskResult};
use crate::identity::RequestContext;
use crate::storage::{
    DocumentStore, EvidenceKind, GpsPoint, MissionEvidence, MissionResolution, RangerMission,
    RangerStatus,
};

use super::tracking::{caller_mission, history_entry, swap_mission};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionEvidenceInput {
    pub url: String,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub gps: Option<GpsPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResolutionInput {
    pub action_summary: String,
    pub outcome: String,
    #[serde(default)]
    pub proof_urls: Vec<String>,
}

/// Status a mission must hold before moving to `next`.
pub fn predecessor(next: RangerStatus) -> Option<RangerStatus> {
    match next {
        RangerStatus::EnRoute => Some(RangerStatus::Accepted),
        RangerStatus::OnSite => Some(RangerStatus::EnRoute),
        RangerStatus::ActionTaken => Some(RangerStatus::OnSite),
        RangerStatus::Closed => Some(RangerStatus::ActionTaken),
        _ => None,
    }
}

/// Statuses in which the officer is working the case in the field.
fn in_field(status: RangerStatus) -> bool {
    matches!(
        status,
        RangerStatus::Accepted
            | RangerStatus::EnRoute
            | RangerStatus::OnSite
            | RangerStatus::ActionTaken
    )
}

pub fn advance_mission(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    next: RangerStatus,
    notes: Option<&str>,
) -> DeskResult<RangerMission> {
    let from = predecessor(next).ok_or_else(|| {
        DeskError::InvalidArgument(format!("{} is not a field progress status", next))
    })?;
    let (_, mut mission) = caller_mission(store, ctx, case_id)?;
    if mission.ranger_status != from {
        return Err(DeskError::InvalidState(format!(
            "mission must be {} to move to {} (currently {})",
            from, next, mission.ranger_status
        )));
    }

    let now = Utc::now();
    mission.ranger_status = next;
    mission
        .history
        .push(history_entry(next, Some(ctx.actor_id()?), notes, now));
    mission.updated_at = now;
    swap_mission(store, ctx, &mut mission)?;

    log::info!(
        "{} MISSION_ADVANCED from={} to={}",
        ctx.log_for(case_id),
        from,
        next
    );
    Ok(mission)
}

pub fn add_mission_evidence(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    input: &MissionEvidenceInput,
) -> DeskResult<RangerMission> {
    if input.url.trim().is_empty() {
        return Err(DeskError::InvalidArgument("evidence url is required".to_string()));
    }
    let kind = match input.kind.as_deref() {
        Some(raw) => EvidenceKind::parse(raw)
            .ok_or_else(|| DeskError::InvalidArgument(format!("unknown evidence kind: {}", raw)))?,
        None => EvidenceKind::Photo,
    };

    let (_, mut mission) = caller_mission(store, ctx, case_id)?;
    let status = mission.ranger_status;
    if !in_field(status) {
        return Err(DeskError::InvalidState(format!(
            "evidence cannot be added while mission is {}",
            status
        )));
    }

    let now = Utc::now();
    mission.evidence.push(MissionEvidence {
        url: input.url.trim().to_string(),
        kind,
        description: input.description.clone(),
        gps: input.gps,
        uploaded_at: now,
        uploaded_by: ctx.actor_id()?.to_string(),
    });
    mission.updated_at = now;
    swap_mission(store, ctx, &mut mission)?;

    log::info!(
        "{} MISSION_EVIDENCE_ADDED kind={} gps={} count={}",
        ctx.log_for(case_id),
        kind,
        input.gps.is_some(),
        mission.evidence.len()
    );
    Ok(mission)
}

/// Store the field resolution. Allowed from ON_SITE or ACTION_TAKEN.
pub fn record_field_resolution(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    case_id: &str,
    input: &FieldResolutionInput,
) -> DeskResult<RangerMission> {
    if input.action_summary.trim().is_empty() || input.outcome.trim().is_empty() {
        return Err(DeskError::InvalidArgument(
            "actionSummary and outcome are required".to_string(),
        ));
    }
    let (_, mut mission) = caller_mission(store, ctx, case_id)?;
    let status = mission.ranger_status;
    if !matches!(status, RangerStatus::OnSite | RangerStatus::ActionTaken) {
        return Err(DeskError::InvalidState(format!(
            "field resolution needs ON_SITE or ACTION_TAKEN (currently {})",
            status
        )));
    }

    let now = Utc::now();
    mission.resolution = Some(MissionResolution {
        action_summary: input.action_summary.trim().to_string(),
        outcome: input.outcome.trim().to_string(),
        proof_urls: input
            .proof_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect(),
        resolved_at: now,
        resolved_by: ctx.actor_id()?.to_string(),
    });
    mission.updated_at = now;
    swap_mission(store, ctx, &mut mission)?;

    log::info!("{} MISSION_FIELD_RESOLVED status={}", ctx.log_for(case_id), status);
    Ok(mission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Caller;
    use crate::missions::tracking::{accept_mission, ensure_mission};
    use crate::storage::{
        Case, CaseStatus, Investigation, Location, MemoryStore, Priority, ReporterInfo, Role,
        ThreatType,
    };

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_case(Case {
                case_id: "CS-1".to_string(),
                report_id: "TR-1".to_string(),
                threat_type: ThreatType::ForestFire,
                location: Location {
                    lat: 7.1,
                    lng: 80.6,
                    address: "Hantana".to_string(),
                },
                reporter: ReporterInfo::default(),
                date_time: now,
                priority: Priority::Critical,
                status: CaseStatus::InProgress,
                assigned_officer: Some("off-1".to_string()),
                assigned_team: None,
                investigation: Investigation::default(),
                resolution: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        store
    }

    fn officer() -> RequestContext {
        RequestContext::for_caller(Caller::new("off-1", Role::Officer))
    }

    #[test]
    fn test_predecessors() {
        assert_eq!(predecessor(RangerStatus::OnSite), Some(RangerStatus::EnRoute));
        assert_eq!(predecessor(RangerStatus::Accepted), None);
        assert_eq!(predecessor(RangerStatus::Declined), None);
    }

    #[test]
    fn test_full_progression() {
        let store = seeded();
        let ctx = officer();
        ensure_mission(&store, &ctx, "CS-1").unwrap();

        assert!(matches!(
            advance_mission(&store, &ctx, "CS-1", RangerStatus::EnRoute, None),
            Err(DeskError::InvalidState(_))
        ));
        accept_mission(&store, &ctx, "CS-1").unwrap();

        for next in [
            RangerStatus::EnRoute,
            RangerStatus::OnSite,
            RangerStatus::ActionTaken,
        ] {
            advance_mission(&store, &ctx, "CS-1", next, None).unwrap();
        }
        let input = FieldResolutionInput {
            action_summary: "Fire line cut".to_string(),
            outcome: "Contained".to_string(),
            proof_urls: vec!["https://cdn.example.org/p1.jpg".to_string(), " ".to_string()],
        };
        let mission = record_field_resolution(&store, &ctx, "CS-1", &input).unwrap();
        assert_eq!(mission.resolution.as_ref().unwrap().proof_urls.len(), 1);

        let mission =
            advance_mission(&store, &ctx, "CS-1", RangerStatus::Closed, Some("done")).unwrap();
        assert_eq!(mission.ranger_status, RangerStatus::Closed);
        // ASSIGNED, ACCEPTED, EN_ROUTE, ON_SITE, ACTION_TAKEN, CLOSED
        assert_eq!(mission.history.len(), 6);
    }

    #[test]
    fn test_no_skipping_steps() {
        let store = seeded();
        let ctx = officer();
        ensure_mission(&store, &ctx, "CS-1").unwrap();
        accept_mission(&store, &ctx, "CS-1").unwrap();
        assert!(matches!(
            advance_mission(&store, &ctx, "CS-1", RangerStatus::OnSite, None),
            Err(DeskError::InvalidState(_))
        ));
        assert!(matches!(
            advance_mission(&store, &ctx, "CS-1", RangerStatus::Declined, None),
            Err(DeskError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_evidence_only_in_field() {
        let store = seeded();
        let ctx = officer();
        ensure_mission(&store, &ctx, "CS-1").unwrap();
        let input = MissionEvidenceInput {
            url: "https://cdn.example.org/e.jpg".to_string(),
            gps: Some(GpsPoint { lat: 7.1, lng: 80.6 }),
            ..Default::default()
        };
        assert!(matches!(
            add_mission_evidence(&store, &ctx, "CS-1", &input),
            Err(DeskError::InvalidState(_))
        ));
        accept_mission(&store, &ctx, "CS-1").unwrap();
        let mission = add_mission_evidence(&store, &ctx, "CS-1", &input).unwrap();
        assert_eq!(mission.evidence.len(), 1);
        assert_eq!(mission.evidence.last().unwrap().kind, EvidenceKind::Photo);
    }
}
