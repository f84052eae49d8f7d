//! Caller identity and the capability table.
//!
//! Credentials never reach the core: the identity collaborator resolves a
//! bearer token to a user id, [`authenticate`] turns that into a [`Caller`],
//! and each [`Operation`] declares which roles may invoke it.

use serde::Serialize;

use crate::error::{DeskError, DeskResult};
use crate::storage::{AccountStatus, DocumentStore, Role};

/// Pre-validated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
    pub status: AccountStatus,
}

impl Caller {
    pub fn new(user_id: &str, role: Role) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            status: AccountStatus::Active,
        }
    }
}

/// Resolve a verified user id against the directory.
///
/// `None` or an unknown id is `Unauthenticated`; a known but non-ACTIVE
/// account is `Forbidden`.
pub fn authenticate(store: &dyn DocumentStore, user_id: Option<&str>) -> DeskResult<Caller> {
    let user_id = user_id.ok_or(DeskError::Unauthenticated)?;
    let user = store.user(user_id)?.ok_or(DeskError::Unauthenticated)?;

    if user.status != AccountStatus::Active {
        log::warn!("AUTH_REJECTED user={} status={}", user.id, user.status);
        return Err(DeskError::Forbidden("user account is not active".to_string()));
    }

    Ok(Caller {
        user_id: user.id,
        role: user.role,
        status: user.status,
    })
}

/// Who may call an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No caller required.
    Public,
    /// Any authenticated, active caller.
    Authenticated,
    /// Active caller holding one of the roles.
    Roles(&'static [Role]),
}

const STAFF: Access = Access::Roles(Role::STAFF);
const ADMIN: Access = Access::Roles(&[Role::Admin]);

/// Every operation the desk exposes upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SubmitReport,
    ValidateReport,
    AnnotateReport,
    GetReport,
    ListReports,
    ReportStats,
    GetCase,
    ListCases,
    ListOfficerCases,
    CaseOverview,
    AssignCase,
    RecordInvestigation,
    ResolveCase,
    CloseCase,
    AutoAssign,
    BulkAssign,
    Workload,
    Recommendations,
    AvailableOfficers,
    AvailableTeams,
    ListMyMissions,
    EnsureMission,
    AcceptMission,
    DeclineMission,
    AdvanceMission,
    AddMissionEvidence,
    RecordFieldResolution,
    ReconcileMission,
    NotifyByRole,
    ListNotifications,
    UnreadCount,
    NotificationStats,
    MarkRead,
    MarkAllRead,
    DeleteNotification,
    AdminListNotifications,
    AdminDeleteNotification,
    EmergencyAlert,
    CustomAlert,
    Announcement,
    ListAlerts,
    AlertStats,
    LocationAlerts,
    ListAllAlerts,
    DeactivateAlert,
}

impl Operation {
    pub fn access(&self) -> Access {
        use Operation::*;
        match self {
            SubmitReport => Access::Public,

            ValidateReport | AnnotateReport | GetReport | ListReports | ReportStats => STAFF,

            GetCase | ListCases | ListOfficerCases | CaseOverview | AssignCase
            | RecordInvestigation | ResolveCase => STAFF,
            CloseCase => ADMIN,

            AutoAssign | BulkAssign | Workload | Recommendations | AvailableOfficers
            | AvailableTeams => STAFF,

            ListMyMissions | EnsureMission | AcceptMission | DeclineMission | AdvanceMission
            | AddMissionEvidence | RecordFieldResolution => STAFF,
            ReconcileMission => ADMIN,

            NotifyByRole => ADMIN,
            ListNotifications | UnreadCount | NotificationStats | MarkRead | MarkAllRead
            | DeleteNotification => Access::Authenticated,
            AdminListNotifications | AdminDeleteNotification => ADMIN,

            EmergencyAlert | CustomAlert => STAFF,
            Announcement | ListAllAlerts | DeactivateAlert => ADMIN,
            ListAlerts | AlertStats | LocationAlerts => Access::Authenticated,
        }
    }
}

/// Check `caller` against the operation's declared access.
pub fn authorize(caller: Option<&Caller>, operation: Operation) -> DeskResult<()> {
    let required = operation.access();
    if required == Access::Public {
        return Ok(());
    }

    let caller = caller.ok_or(DeskError::Unauthenticated)?;
    if caller.status != AccountStatus::Active {
        return Err(DeskError::Forbidden("user account is not active".to_string()));
    }

    match required {
        Access::Roles(roles) if !roles.contains(&caller.role) => {
            log::warn!(
                "ACCESS_DENIED user={} role={} operation={:?}",
                caller.user_id,
                caller.role,
                operation
            );
            Err(DeskError::Forbidden("insufficient permissions".to_string()))
        }
        _ => Ok(()),
    }
}
