//! Officer caseloads and the read-only views built on them.

use std::collections::HashMap;

use serde::Serialize;

use crate::cases::service::load_case;
use crate::config::AssignmentConfig;
use crate::error::DeskResult;
use crate::storage::{
    CaseFilter, CaseStatus, DocumentStore, Priority, Role, Specialization, TeamFilter,
    TeamRecord, UserFilter, UserRecord,
};

use super::routing::specialization_for;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficerWorkload {
    pub officer_id: String,
    /// `None` when the officer is no longer in the directory.
    pub name: Option<String>,
    pub email: Option<String>,
    pub active_cases: usize,
    pub high_priority: usize,
    pub critical_priority: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficerRecommendation {
    pub officer_id: String,
    pub name: String,
    pub email: String,
    pub current_load: usize,
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecommendation {
    pub team_id: String,
    pub name: String,
    pub specialization: Specialization,
    pub member_count: usize,
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub case_id: String,
    pub officers: Vec<OfficerRecommendation>,
    pub teams: Vec<TeamRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficerAvailability {
    pub officer_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub open_cases: usize,
    pub available: bool,
}

/// Open (NEW, IN_PROGRESS, UNDER_INVESTIGATION) case count per officer id.
pub fn open_caseloads(store: &dyn DocumentStore) -> DeskResult<HashMap<String, usize>> {
    let open = store.cases(&CaseFilter {
        statuses: CaseStatus::OPEN.to_vec(),
        has_officer: true,
        ..CaseFilter::default()
    })?;
    let mut loads = HashMap::new();
    for case in open {
        if let Some(officer) = case.assigned_officer {
            *loads.entry(officer).or_insert(0) += 1;
        }
    }
    Ok(loads)
}

/// ACTIVE OFFICER/ADMIN users paired with their open caseload.
pub fn staff_caseloads(store: &dyn DocumentStore) -> DeskResult<Vec<(UserRecord, usize)>> {
    let loads = open_caseloads(store)?;
    Ok(store
        .users(&UserFilter::active_in(Role::STAFF))?
        .into_iter()
        .map(|user| {
            let load = loads.get(&user.id).copied().unwrap_or(0);
            (user, load)
        })
        .collect())
}

/// Lowest caseload wins; equal caseloads go to the smallest user id.
pub fn least_loaded(candidates: &[(UserRecord, usize)]) -> Option<&(UserRecord, usize)> {
    candidates
        .iter()
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)))
}

/// Open-case counts per assigned officer, busiest first.
pub fn workload(store: &dyn DocumentStore) -> DeskResult<Vec<OfficerWorkload>> {
    let open = store.cases(&CaseFilter {
        statuses: CaseStatus::OPEN.to_vec(),
        has_officer: true,
        ..CaseFilter::default()
    })?;

    let mut by_officer: HashMap<String, OfficerWorkload> = HashMap::new();
    for case in &open {
        let Some(officer_id) = case.assigned_officer.as_deref() else {
            continue;
        };
        let entry = by_officer
            .entry(officer_id.to_string())
            .or_insert_with(|| OfficerWorkload {
                officer_id: officer_id.to_string(),
                name: None,
                email: None,
                active_cases: 0,
                high_priority: 0,
                critical_priority: 0,
            });
        entry.active_cases += 1;
        match case.priority {
            Priority::High => entry.high_priority += 1,
            Priority::Critical => entry.critical_priority += 1,
            _ => {}
        }
    }

    let mut rows: Vec<OfficerWorkload> = by_officer.into_values().collect();
    for row in &mut rows {
        if let Some(user) = store.user(&row.officer_id)? {
            row.name = Some(user.name);
            row.email = Some(user.email);
        }
    }
    rows.sort_by(|a, b| {
        b.active_cases
            .cmp(&a.active_cases)
            .then_with(|| a.officer_id.cmp(&b.officer_id))
    });
    Ok(rows)
}

/// Scored assignee suggestions for a case. Writes nothing.
pub fn recommendations(
    store: &dyn DocumentStore,
    config: &AssignmentConfig,
    case_id: &str,
) -> DeskResult<Recommendations> {
    let case = load_case(store, case_id)?;

    let mut officers: Vec<OfficerRecommendation> = staff_caseloads(store)?
        .into_iter()
        .map(|(user, load)| OfficerRecommendation {
            score: config.recommendation_base.saturating_sub(load),
            officer_id: user.id,
            name: user.name,
            email: user.email,
            current_load: load,
        })
        .collect();
    officers.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.officer_id.cmp(&b.officer_id))
    });
    officers.truncate(config.recommendation_top);

    let teams = store
        .teams(&TeamFilter {
            specialization: Some(specialization_for(case.threat_type)),
            active_only: true,
        })?
        .into_iter()
        .map(|team| TeamRecommendation {
            score: if team.members.is_empty() {
                config.team_score_empty
            } else {
                config.team_score_staffed
            },
            member_count: team.members.len(),
            team_id: team.id,
            name: team.name,
            specialization: team.specialization,
        })
        .collect();

    Ok(Recommendations {
        case_id: case.case_id,
        officers,
        teams,
    })
}

/// Active staff sorted by name, optionally only those under the busy
/// threshold.
pub fn available_officers(
    store: &dyn DocumentStore,
    config: &AssignmentConfig,
    available_only: bool,
) -> DeskResult<Vec<OfficerAvailability>> {
    let mut rows: Vec<OfficerAvailability> = staff_caseloads(store)?
        .into_iter()
        .map(|(user, load)| OfficerAvailability {
            officer_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            open_cases: load,
            available: load < config.busy_threshold,
        })
        .filter(|row| !available_only || row.available)
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
}

/// Active teams sorted by name.
pub fn available_teams(
    store: &dyn DocumentStore,
    specialization: Option<Specialization>,
) -> DeskResult<Vec<TeamRecord>> {
    let mut teams = store.teams(&TeamFilter {
        specialization,
        active_only: true,
    })?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::storage::{
        AccountStatus, Case, Investigation, Location, MemoryStore, ReporterInfo, ThreatType,
    };

    fn user(id: &str, name: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.org", id),
            phone: None,
            role: Role::Officer,
            status: AccountStatus::Active,
        }
    }

    fn case(id: &str, officer: Option<&str>, status: CaseStatus, priority: Priority) -> Case {
        let now = Utc::now();
        Case {
            case_id: id.to_string(),
            report_id: "TR-1".to_string(),
            threat_type: ThreatType::Poaching,
            location: Location {
                lat: 6.0,
                lng: 80.0,
                address: "Udawalawe".to_string(),
            },
            reporter: ReporterInfo::default(),
            date_time: now,
            priority,
            status,
            assigned_officer: officer.map(str::to_string),
            assigned_team: None,
            investigation: Investigation::default(),
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Officers a, b, c with open caseloads 3, 1, 4.
    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_user(user("a", "Chaminda"));
        store.put_user(user("b", "Amaya"));
        store.put_user(user("c", "Bandara"));
        let mut n = 0;
        for (officer, load) in [("a", 3), ("b", 1), ("c", 4)] {
            for _ in 0..load {
                n += 1;
                let priority = if n % 2 == 0 { Priority::High } else { Priority::Critical };
                store
                    .insert_case(case(&format!("CS-{}", n), Some(officer), CaseStatus::InProgress, priority))
                    .unwrap();
            }
        }
        // Closed cases do not count.
        store
            .insert_case(case("CS-closed", Some("b"), CaseStatus::Closed, Priority::Low))
            .unwrap();
        store
    }

    #[test]
    fn test_least_loaded_picks_minimum() {
        let store = seeded();
        let loads = staff_caseloads(&store).unwrap();
        assert_eq!(least_loaded(&loads).unwrap().0.id, "b");
    }

    #[test]
    fn test_least_loaded_tie_breaks_on_id() {
        let candidates = vec![(user("z", "Z"), 0), (user("m", "M"), 0), (user("q", "Q"), 2)];
        assert_eq!(least_loaded(&candidates).unwrap().0.id, "m");
        assert!(least_loaded(&[]).is_none());
    }

    #[test]
    fn test_workload_sorted_descending() {
        let store = seeded();
        let rows = workload(&store).unwrap();
        let loads: Vec<usize> = rows.iter().map(|r| r.active_cases).collect();
        assert_eq!(loads, vec![4, 3, 1]);
        assert_eq!(rows[0].name.as_deref(), Some("Bandara"));
        let totals: usize = rows.iter().map(|r| r.high_priority + r.critical_priority).sum();
        assert_eq!(totals, 8);
    }

    #[test]
    fn test_recommendation_scores() {
        let store = seeded();
        store.insert_case(case("CS-target", None, CaseStatus::New, Priority::Low)).unwrap();
        let recs = recommendations(&store, &AssignmentConfig::default(), "CS-target").unwrap();
        let scores: Vec<(String, usize)> = recs
            .officers
            .iter()
            .map(|o| (o.officer_id.clone(), o.score))
            .collect();
        assert_eq!(
            scores,
            vec![("b".to_string(), 9), ("a".to_string(), 7), ("c".to_string(), 6)]
        );
        assert!(recs.teams.is_empty());
    }

    #[test]
    fn test_available_officers() {
        let store = seeded();
        let config = AssignmentConfig {
            busy_threshold: 4,
            ..AssignmentConfig::default()
        };
        let all = available_officers(&store, &config, false).unwrap();
        let names: Vec<&str> = all.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Amaya", "Bandara", "Chaminda"]);

        let free = available_officers(&store, &config, true).unwrap();
        assert_eq!(free.len(), 2);
        assert!(free.iter().all(|o| o.open_cases < 4));
    }
}
