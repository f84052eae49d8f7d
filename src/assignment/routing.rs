//! Threat type to team specialization routing.

use serde::Deserialize;

use crate::logging::structured::LogContext;
use crate::storage::{Specialization, ThreatType};

/// Kind of assignee auto-assignment should pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssigneeKind {
    Officer,
    Team,
}

impl AssigneeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssigneeKind::Officer => "OFFICER",
            AssigneeKind::Team => "TEAM",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "OFFICER" => Some(AssigneeKind::Officer),
            "TEAM" => Some(AssigneeKind::Team),
            _ => None,
        }
    }
}

/// Fixed routing table.
pub fn specialization_for(threat_type: ThreatType) -> Specialization {
    match threat_type {
        ThreatType::Poaching => Specialization::Poaching,
        ThreatType::ForestFire => Specialization::ForestFire,
        ThreatType::InjuredAnimal => Specialization::WildlifeRescue,
        ThreatType::IllegalLogging => Specialization::Poaching,
        ThreatType::HumanWildlifeConflict => Specialization::General,
        ThreatType::Other => Specialization::General,
    }
}

/// Specialization a TEAM auto-assignment should look for.
///
/// An explicit override wins over the routing table.
pub fn required_specialization(
    threat_type: ThreatType,
    requested: Option<Specialization>,
    ctx: &LogContext,
) -> Specialization {
    match requested {
        Some(specialization) => {
            log::debug!(
                "{} ROUTING_DECISION specialization={} reason=override",
                ctx,
                specialization
            );
            specialization
        }
        None => {
            let specialization = specialization_for(threat_type);
            log::debug!(
                "{} ROUTING_DECISION specialization={} threat_type={}",
                ctx,
                specialization,
                threat_type
            );
            specialization
        }
    }
}
