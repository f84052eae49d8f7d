//! Query filters and pagination.
//!
//! Each filter is a plain value with a `matches` predicate so any store
//! backend can apply it; unset fields match everything.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::models::{
    AccountStatus, Alert, AlertCategory, Case, CaseStatus, NoticePriority, Notification,
    NotificationKind, Priority, RangerMission, RangerStatus, ReportStatus, Role, Specialization,
    TeamRecord, ThreatReport, ThreatType, UserRecord,
};

/// Requested page (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { page: 1, limit }
    }

    /// Clamp to `page >= 1` and `1 <= limit <= max_limit`.
    pub fn normalized(&self, max_limit: usize) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, max_limit.max(1)),
        }
    }

    pub fn skip(&self) -> usize {
        (self.page.max(1) - 1) * self.limit
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
}

impl<T> PageResult<T> {
    pub fn empty(page: Page) -> Self {
        Self {
            items: Vec::new(),
            page: page.page,
            pages: 0,
            total: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            pages: self.pages,
            total: self.total,
        }
    }
}

/// Slice an already-ordered list into one page.
pub fn paginate<T>(all: Vec<T>, page: Page) -> PageResult<T> {
    let total = all.len();
    let pages = if page.limit == 0 {
        0
    } else {
        total.div_ceil(page.limit)
    };
    let items = all.into_iter().skip(page.skip()).take(page.limit).collect();
    PageResult {
        items,
        page: page.page,
        pages,
        total,
    }
}

/// Histogram keyed by wire name.
pub fn count_by<I>(keys: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'static str>,
{
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub roles: Vec<Role>,
    pub status: Option<AccountStatus>,
}

impl UserFilter {
    /// Active users holding any of `roles`.
    pub fn active_in(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
            status: Some(AccountStatus::Active),
        }
    }

    pub fn matches(&self, user: &UserRecord) -> bool {
        (self.roles.is_empty() || self.roles.contains(&user.role))
            && self.status.map_or(true, |s| user.status == s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    pub specialization: Option<Specialization>,
    pub active_only: bool,
}

impl TeamFilter {
    pub fn matches(&self, team: &TeamRecord) -> bool {
        self.specialization.map_or(true, |s| team.specialization == s)
            && (!self.active_only || team.active)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub threat_type: Option<ThreatType>,
}

impl ReportFilter {
    pub fn matches(&self, report: &ThreatReport) -> bool {
        self.status.map_or(true, |s| report.status == s)
            && self.threat_type.map_or(true, |t| report.threat_type == t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Any of these statuses; empty matches all.
    pub statuses: Vec<CaseStatus>,
    pub priority: Option<Priority>,
    pub assigned_officer: Option<String>,
    /// Only cases that have some officer assigned.
    pub has_officer: bool,
    pub threat_type: Option<ThreatType>,
    pub case_ids: Option<Vec<String>>,
}

impl CaseFilter {
    /// Open cases (NEW, IN_PROGRESS, UNDER_INVESTIGATION) held by `officer_id`.
    pub fn open_for_officer(officer_id: &str) -> Self {
        Self {
            statuses: CaseStatus::OPEN.to_vec(),
            assigned_officer: Some(officer_id.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, case: &Case) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&case.status))
            && self.priority.map_or(true, |p| case.priority == p)
            && self
                .assigned_officer
                .as_deref()
                .map_or(true, |o| case.assigned_officer.as_deref() == Some(o))
            && (!self.has_officer || case.assigned_officer.is_some())
            && self.threat_type.map_or(true, |t| case.threat_type == t)
            && self
                .case_ids
                .as_ref()
                .map_or(true, |ids| ids.iter().any(|id| id == &case.case_id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MissionFilter {
    pub assigned_to: Option<String>,
    pub ranger_status: Option<RangerStatus>,
}

impl MissionFilter {
    pub fn matches(&self, mission: &RangerMission) -> bool {
        self.assigned_to
            .as_deref()
            .map_or(true, |a| mission.assigned_to == a)
            && self.ranger_status.map_or(true, |s| mission.ranger_status == s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<String>,
    pub kind: Option<NotificationKind>,
    pub priority: Option<NoticePriority>,
    pub read: Option<bool>,
}

impl NotificationFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        self.user_id
            .as_deref()
            .map_or(true, |u| notification.user_id == u)
            && self.kind.map_or(true, |k| notification.kind == k)
            && self.priority.map_or(true, |p| notification.priority == p)
            && self.read.map_or(true, |r| notification.read == r)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub target_role: Option<Role>,
    pub active_only: bool,
    /// Exclude alerts expired at this instant.
    pub live_at: Option<DateTime<Utc>>,
    pub category: Option<AlertCategory>,
    pub priority: Option<NoticePriority>,
    pub created_by: Option<String>,
}

impl AlertFilter {
    /// Active, unexpired alerts addressed to `role`.
    pub fn visible_to(role: Role, now: DateTime<Utc>) -> Self {
        Self {
            target_role: Some(role),
            active_only: true,
            live_at: Some(now),
            ..Self::default()
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.target_role
            .map_or(true, |r| alert.target_roles.contains(&r))
            && (!self.active_only || alert.active)
            && self.live_at.map_or(true, |now| !alert.is_expired(now))
            && self.category.map_or(true, |c| alert.category == c)
            && self.priority.map_or(true, |p| alert.priority == p)
            && self
                .created_by
                .as_deref()
                .map_or(true, |c| alert.created_by == c)
    }
}
