//! Document store seam.
//!
//! The desk only talks to storage through [`DocumentStore`]. Writes are
//! whole-document replaces (last write wins) except for the three guarded
//! primitives: [`DocumentStore::replace_mission_if`],
//! [`DocumentStore::clear_case_officer_if`] and
//! [`DocumentStore::commit_report_decision`].

use chrono::{DateTime, Utc};

use crate::error::StoreResult;

use super::models::{
    Alert, Case, Notification, RangerMission, TeamRecord, ThreatReport, UserRecord,
};
use super::queries::{
    AlertFilter, CaseFilter, MissionFilter, NotificationFilter, ReportFilter, TeamFilter,
    UserFilter,
};

pub trait DocumentStore: Send + Sync {
    // Directory
    fn user(&self, id: &str) -> StoreResult<Option<UserRecord>>;
    fn users(&self, filter: &UserFilter) -> StoreResult<Vec<UserRecord>>;
    fn team(&self, id: &str) -> StoreResult<Option<TeamRecord>>;
    fn teams(&self, filter: &TeamFilter) -> StoreResult<Vec<TeamRecord>>;

    // Threat reports
    fn insert_report(&self, report: ThreatReport) -> StoreResult<()>;
    fn report(&self, report_id: &str) -> StoreResult<Option<ThreatReport>>;
    fn update_report(&self, report: &ThreatReport) -> StoreResult<()>;
    fn reports(&self, filter: &ReportFilter) -> StoreResult<Vec<ThreatReport>>;

    /// Write a validate/reject decision and, when given, insert the new case
    /// in one step. Returns `false` without writing if the stored report is
    /// no longer PENDING.
    fn commit_report_decision(&self, report: &ThreatReport, case: Option<Case>)
        -> StoreResult<bool>;

    // Cases
    fn insert_case(&self, case: Case) -> StoreResult<()>;
    fn case(&self, case_id: &str) -> StoreResult<Option<Case>>;
    fn update_case(&self, case: &Case) -> StoreResult<()>;
    /// Clear the case's officer only while it is still `officer_id`.
    /// Returns `false` without writing when someone else holds the case.
    fn clear_case_officer_if(
        &self,
        case_id: &str,
        officer_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    fn cases(&self, filter: &CaseFilter) -> StoreResult<Vec<Case>>;

    fn count_cases(&self, filter: &CaseFilter) -> StoreResult<usize> {
        Ok(self.cases(filter)?.len())
    }

    // Ranger missions
    /// Fails with `DuplicateKey` if a mission already exists for the case.
    fn insert_mission(&self, mission: RangerMission) -> StoreResult<()>;
    fn mission(&self, case_id: &str) -> StoreResult<Option<RangerMission>>;
    /// Replace the mission only if its stored revision equals
    /// `expected_revision`. The caller sets the new revision on `mission`.
    fn replace_mission_if(
        &self,
        expected_revision: u64,
        mission: &RangerMission,
    ) -> StoreResult<bool>;
    fn missions(&self, filter: &MissionFilter) -> StoreResult<Vec<RangerMission>>;

    // Notifications
    fn insert_notifications(&self, notifications: Vec<Notification>) -> StoreResult<usize>;
    fn notification(&self, id: &str) -> StoreResult<Option<Notification>>;
    fn update_notification(&self, notification: &Notification) -> StoreResult<()>;
    fn delete_notification(&self, id: &str) -> StoreResult<bool>;
    fn notifications(&self, filter: &NotificationFilter) -> StoreResult<Vec<Notification>>;

    // Alerts
    fn insert_alert(&self, alert: Alert) -> StoreResult<()>;
    fn alert(&self, id: &str) -> StoreResult<Option<Alert>>;
    fn update_alert(&self, alert: &Alert) -> StoreResult<()>;
    fn alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<Alert>>;
}
