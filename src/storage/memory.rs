//! In-process document store.
//!
//! One `parking_lot::RwLock` per collection; documents keep insertion
//! order, which is the "store order" callers observe when they do not sort.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};

use super::models::{
    Alert, Case, Notification, RangerMission, ReportStatus, TeamRecord, ThreatReport,
    UserRecord,
};
use super::queries::{
    AlertFilter, CaseFilter, MissionFilter, NotificationFilter, ReportFilter, TeamFilter,
    UserFilter,
};
use super::store::DocumentStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<UserRecord>>,
    teams: RwLock<Vec<TeamRecord>>,
    reports: RwLock<Vec<ThreatReport>>,
    cases: RwLock<Vec<Case>>,
    missions: RwLock<Vec<RangerMission>>,
    notifications: RwLock<Vec<Notification>>,
    alerts: RwLock<Vec<Alert>>,
}

fn missing(collection: &str, key: &str) -> StoreError {
    StoreError::Unavailable(format!("{} document {} vanished during update", collection, key))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a directory user.
    pub fn put_user(&self, user: UserRecord) {
        let mut users = self.users.write();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
    }

    /// Insert or replace a team.
    pub fn put_team(&self, team: TeamRecord) {
        let mut teams = self.teams.write();
        match teams.iter_mut().find(|t| t.id == team.id) {
            Some(existing) => *existing = team,
            None => teams.push(team),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn user(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.read().iter().find(|u| u.id == id).cloned())
    }

    fn users(&self, filter: &UserFilter) -> StoreResult<Vec<UserRecord>> {
        Ok(self
            .users
            .read()
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    fn team(&self, id: &str) -> StoreResult<Option<TeamRecord>> {
        Ok(self.teams.read().iter().find(|t| t.id == id).cloned())
    }

    fn teams(&self, filter: &TeamFilter) -> StoreResult<Vec<TeamRecord>> {
        Ok(self
            .teams
            .read()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    fn insert_report(&self, report: ThreatReport) -> StoreResult<()> {
        let mut reports = self.reports.write();
        if reports.iter().any(|r| r.report_id == report.report_id) {
            return Err(StoreError::DuplicateKey {
                collection: "reports",
                key: report.report_id,
            });
        }
        reports.push(report);
        Ok(())
    }

    fn report(&self, report_id: &str) -> StoreResult<Option<ThreatReport>> {
        Ok(self
            .reports
            .read()
            .iter()
            .find(|r| r.report_id == report_id)
            .cloned())
    }

    fn update_report(&self, report: &ThreatReport) -> StoreResult<()> {
        let mut reports = self.reports.write();
        let slot = reports
            .iter_mut()
            .find(|r| r.report_id == report.report_id)
            .ok_or_else(|| missing("reports", &report.report_id))?;
        *slot = report.clone();
        Ok(())
    }

    fn reports(&self, filter: &ReportFilter) -> StoreResult<Vec<ThreatReport>> {
        Ok(self
            .reports
            .read()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn commit_report_decision(
        &self,
        report: &ThreatReport,
        case: Option<Case>,
    ) -> StoreResult<bool> {
        // Lock order: reports then cases.
        let mut reports = self.reports.write();
        let mut cases = self.cases.write();

        let slot = reports
            .iter_mut()
            .find(|r| r.report_id == report.report_id)
            .ok_or_else(|| missing("reports", &report.report_id))?;
        if slot.status != ReportStatus::Pending {
            return Ok(false);
        }
        if let Some(case) = &case {
            if cases.iter().any(|c| c.case_id == case.case_id) {
                return Err(StoreError::DuplicateKey {
                    collection: "cases",
                    key: case.case_id.clone(),
                });
            }
        }

        *slot = report.clone();
        if let Some(case) = case {
            cases.push(case);
        }
        Ok(true)
    }

    fn insert_case(&self, case: Case) -> StoreResult<()> {
        let mut cases = self.cases.write();
        if cases.iter().any(|c| c.case_id == case.case_id) {
            return Err(StoreError::DuplicateKey {
                collection: "cases",
                key: case.case_id,
            });
        }
        cases.push(case);
        Ok(())
    }

    fn case(&self, case_id: &str) -> StoreResult<Option<Case>> {
        Ok(self
            .cases
            .read()
            .iter()
            .find(|c| c.case_id == case_id)
            .cloned())
    }

    fn update_case(&self, case: &Case) -> StoreResult<()> {
        let mut cases = self.cases.write();
        let slot = cases
            .iter_mut()
            .find(|c| c.case_id == case.case_id)
            .ok_or_else(|| missing("cases", &case.case_id))?;
        *slot = case.clone();
        Ok(())
    }

    fn clear_case_officer_if(
        &self,
        case_id: &str,
        officer_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut cases = self.cases.write();
        let slot = cases
            .iter_mut()
            .find(|c| c.case_id == case_id)
            .ok_or_else(|| missing("cases", case_id))?;
        if slot.assigned_officer.as_deref() != Some(officer_id) {
            return Ok(false);
        }
        slot.assigned_officer = None;
        slot.updated_at = at;
        Ok(true)
    }

    fn cases(&self, filter: &CaseFilter) -> StoreResult<Vec<Case>> {
        Ok(self
            .cases
            .read()
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    fn count_cases(&self, filter: &CaseFilter) -> StoreResult<usize> {
        Ok(self.cases.read().iter().filter(|c| filter.matches(c)).count())
    }

    fn insert_mission(&self, mission: RangerMission) -> StoreResult<()> {
        let mut missions = self.missions.write();
        if missions.iter().any(|m| m.case_id == mission.case_id) {
            return Err(StoreError::DuplicateKey {
                collection: "missions",
                key: mission.case_id,
            });
        }
        missions.push(mission);
        Ok(())
    }

    fn mission(&self, case_id: &str) -> StoreResult<Option<RangerMission>> {
        Ok(self
            .missions
            .read()
            .iter()
            .find(|m| m.case_id == case_id)
            .cloned())
    }

    fn replace_mission_if(
        &self,
        expected_revision: u64,
        mission: &RangerMission,
    ) -> StoreResult<bool> {
        let mut missions = self.missions.write();
        match missions.iter_mut().find(|m| m.case_id == mission.case_id) {
            Some(slot) if slot.revision == expected_revision => {
                *slot = mission.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn missions(&self, filter: &MissionFilter) -> StoreResult<Vec<RangerMission>> {
        Ok(self
            .missions
            .read()
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    fn insert_notifications(&self, notifications: Vec<Notification>) -> StoreResult<usize> {
        let count = notifications.len();
        self.notifications.write().extend(notifications);
        Ok(count)
    }

    fn notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        Ok(self
            .notifications
            .read()
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    fn update_notification(&self, notification: &Notification) -> StoreResult<()> {
        let mut notifications = self.notifications.write();
        let slot = notifications
            .iter_mut()
            .find(|n| n.id == notification.id)
            .ok_or_else(|| missing("notifications", &notification.id))?;
        *slot = notification.clone();
        Ok(())
    }

    fn delete_notification(&self, id: &str) -> StoreResult<bool> {
        let mut notifications = self.notifications.write();
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        Ok(notifications.len() != before)
    }

    fn notifications(&self, filter: &NotificationFilter) -> StoreResult<Vec<Notification>> {
        Ok(self
            .notifications
            .read()
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    fn insert_alert(&self, alert: Alert) -> StoreResult<()> {
        self.alerts.write().push(alert);
        Ok(())
    }

    fn alert(&self, id: &str) -> StoreResult<Option<Alert>> {
        Ok(self.alerts.read().iter().find(|a| a.id == id).cloned())
    }

    fn update_alert(&self, alert: &Alert) -> StoreResult<()> {
        let mut alerts = self.alerts.write();
        let slot = alerts
            .iter_mut()
            .find(|a| a.id == alert.id)
            .ok_or_else(|| missing("alerts", &alert.id))?;
        *slot = alert.clone();
        Ok(())
    }

    fn alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<Alert>> {
        Ok(self
            .alerts
            .read()
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{
        AppendOnly, Investigation, Location, Priority, RangerStatus, ReporterInfo, ThreatType,
    };
    use crate::storage::CaseStatus;

    fn mission(case_id: &str, status: RangerStatus) -> RangerMission {
        let now = Utc::now();
        RangerMission {
            case_id: case_id.to_string(),
            assigned_to: "officer-1".to_string(),
            assigned_by: None,
            ranger_status: status,
            history: AppendOnly::new(),
            decline_reason: None,
            evidence: AppendOnly::new(),
            resolution: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn case(case_id: &str, officer: Option<&str>) -> Case {
        let now = Utc::now();
        Case {
            case_id: case_id.to_string(),
            report_id: "TR-1".to_string(),
            threat_type: ThreatType::IllegalLogging,
            location: Location {
                lat: 7.3,
                lng: 80.6,
                address: "Sinharaja".to_string(),
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

    #[test]
    fn test_mission_unique_per_case() {
        let store = MemoryStore::new();
        store.insert_mission(mission("CS-1", RangerStatus::Assigned)).unwrap();
        let err = store
            .insert_mission(mission("CS-1", RangerStatus::Assigned))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn test_replace_mission_if_guards_revision() {
        let store = MemoryStore::new();
        store.insert_mission(mission("CS-1", RangerStatus::Assigned)).unwrap();

        let mut accepted = mission("CS-1", RangerStatus::Accepted);
        accepted.revision = 1;
        assert!(store.replace_mission_if(0, &accepted).unwrap());
        // Second writer read revision 0 and loses, even with the same status.
        let mut reassigned = mission("CS-1", RangerStatus::Assigned);
        reassigned.assigned_to = "officer-2".to_string();
        reassigned.revision = 1;
        assert!(!store.replace_mission_if(0, &reassigned).unwrap());

        let stored = store.mission("CS-1").unwrap().unwrap();
        assert_eq!(stored.ranger_status, RangerStatus::Accepted);
        assert_eq!(stored.assigned_to, "officer-1");
        assert_eq!(stored.revision, 1);
    }

    #[test]
    fn test_clear_case_officer_only_for_holder() {
        let store = MemoryStore::new();
        store.insert_case(case("CS-1", Some("officer-2"))).unwrap();
        let at = Utc::now();

        assert!(!store.clear_case_officer_if("CS-1", "officer-1", at).unwrap());
        assert_eq!(
            store.case("CS-1").unwrap().unwrap().assigned_officer.as_deref(),
            Some("officer-2")
        );

        assert!(store.clear_case_officer_if("CS-1", "officer-2", at).unwrap());
        let stored = store.case("CS-1").unwrap().unwrap();
        assert!(stored.assigned_officer.is_none());
        assert_eq!(stored.updated_at, at);

        assert!(matches!(
            store.clear_case_officer_if("CS-9", "officer-1", at),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_delete_notification_reports_presence() {
        let store = MemoryStore::new();
        assert!(!store.delete_notification("missing").unwrap());
    }
}
