//! Record models for the document store.
//!
//! These mirror the documents kept per collection: users and teams (the
//! directory), threat reports, cases, ranger missions, notifications and
//! alerts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn parse(raw: &str) -> Option<Self> {
                match raw {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(Role {
    Citizen => "CITIZEN",
    Officer => "OFFICER",
    Admin => "ADMIN",
});

impl Role {
    /// Roles that can hold case and mission assignments.
    pub const STAFF: &'static [Role] = &[Role::Officer, Role::Admin];

    pub fn is_staff(&self) -> bool {
        Role::STAFF.contains(self)
    }
}

wire_enum!(AccountStatus {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
    Suspended => "SUSPENDED",
});

wire_enum!(ThreatType {
    Poaching => "POACHING",
    ForestFire => "FOREST_FIRE",
    InjuredAnimal => "INJURED_ANIMAL",
    IllegalLogging => "ILLEGAL_LOGGING",
    HumanWildlifeConflict => "HUMAN_WILDLIFE_CONFLICT",
    Other => "OTHER",
});

wire_enum!(Specialization {
    Poaching => "POACHING",
    ForestFire => "FOREST_FIRE",
    WildlifeRescue => "WILDLIFE_RESCUE",
    General => "GENERAL",
    Research => "RESEARCH",
});

wire_enum!(Priority {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
    Critical => "CRITICAL",
});

wire_enum!(ReportStatus {
    Pending => "PENDING",
    Validated => "VALIDATED",
    Rejected => "REJECTED",
});

wire_enum!(MediaKind {
    Image => "IMAGE",
    Video => "VIDEO",
});

wire_enum!(CaseStatus {
    New => "NEW",
    InProgress => "IN_PROGRESS",
    UnderInvestigation => "UNDER_INVESTIGATION",
    Resolved => "RESOLVED",
    Closed => "CLOSED",
});

impl CaseStatus {
    /// Statuses that count towards an officer's open caseload.
    pub const OPEN: &'static [CaseStatus] = &[
        CaseStatus::New,
        CaseStatus::InProgress,
        CaseStatus::UnderInvestigation,
    ];

    pub fn is_open(&self) -> bool {
        CaseStatus::OPEN.contains(self)
    }
}

wire_enum!(EvidenceKind {
    Photo => "PHOTO",
    Video => "VIDEO",
    Document => "DOCUMENT",
    Report => "REPORT",
});

wire_enum!(RangerStatus {
    Assigned => "ASSIGNED",
    Accepted => "ACCEPTED",
    EnRoute => "EN_ROUTE",
    OnSite => "ON_SITE",
    ActionTaken => "ACTION_TAKEN",
    Closed => "CLOSED",
    Declined => "DECLINED",
});

wire_enum!(MemberRole {
    Leader => "LEADER",
    Member => "MEMBER",
    Specialist => "SPECIALIST",
});

wire_enum!(NotificationKind {
    CaseAssigned => "CASE_ASSIGNED",
    StatusUpdate => "STATUS_UPDATE",
    Resolution => "RESOLUTION",
    UrgentAlert => "URGENT_ALERT",
    NewReport => "NEW_REPORT",
    System => "SYSTEM",
});

wire_enum!(NoticePriority {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
    Urgent => "URGENT",
});

wire_enum!(AlertCategory {
    Emergency => "EMERGENCY",
    Warning => "WARNING",
    Info => "INFO",
    Announcement => "ANNOUNCEMENT",
});

/// Ordered sequence that only grows.
///
/// Entries can be read and appended; nothing hands out `&mut` access to
/// an existing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppendOnly<T>(Vec<T>);

impl<T> AppendOnly<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, entry: T) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> Default for AppendOnly<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for AppendOnly<T> {
    fn from(entries: Vec<T>) -> Self {
        Self(entries)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub officer_id: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub specialization: Specialization,
    pub members: Vec<TeamMember>,
    pub jurisdiction: Option<String>,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Threat reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReporterInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    pub kind: MediaKind,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatReport {
    pub report_id: String,
    pub threat_type: ThreatType,
    pub location: Location,
    pub date_time: DateTime<Utc>,
    pub description: String,
    pub reporter: ReporterInfo,
    pub media: Vec<MediaItem>,
    pub status: ReportStatus,
    pub urgency: Priority,
    pub validation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub text: String,
    pub added_at: DateTime<Utc>,
    pub added_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub url: String,
    pub kind: EvidenceKind,
    pub description: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTaken {
    pub action: String,
    pub result: Option<String>,
    pub taken_at: DateTime<Utc>,
    pub taken_by: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Investigation {
    pub findings: AppendOnly<Finding>,
    pub evidence: AppendOnly<Evidence>,
    pub actions: AppendOnly<ActionTaken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub action_summary: String,
    pub outcome: String,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    /// `report_id` of the originating threat report.
    pub report_id: String,
    pub threat_type: ThreatType,
    pub location: Location,
    pub reporter: ReporterInfo,
    pub date_time: DateTime<Utc>,
    pub priority: Priority,
    pub status: CaseStatus,
    pub assigned_officer: Option<String>,
    pub assigned_team: Option<String>,
    pub investigation: Investigation,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn is_assigned(&self) -> bool {
        self.assigned_officer.is_some() || self.assigned_team.is_some()
    }
}

// ---------------------------------------------------------------------------
// Ranger missions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: RangerStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionEvidence {
    pub url: String,
    pub kind: EvidenceKind,
    pub description: Option<String>,
    pub gps: Option<GpsPoint>,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionResolution {
    pub action_summary: String,
    pub outcome: String,
    pub proof_urls: Vec<String>,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangerMission {
    /// Unique: one mission per case.
    pub case_id: String,
    pub assigned_to: String,
    pub assigned_by: Option<String>,
    pub ranger_status: RangerStatus,
    pub history: AppendOnly<StatusChange>,
    pub decline_reason: Option<String>,
    pub evidence: AppendOnly<MissionEvidence>,
    pub resolution: Option<MissionResolution>,
    /// Bumped on every replace; the compare-and-swap token.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications and alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NoticePriority,
    pub read: bool,
    pub related_case: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Geofence point for location-based alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub category: AlertCategory,
    pub priority: NoticePriority,
    pub created_by: String,
    pub target_roles: Vec<Role>,
    pub related_case: Option<String>,
    pub location: Option<GeoPoint>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }
}
