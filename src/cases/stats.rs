//! Case overview statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::DeskResult;
use crate::storage::{count_by, Case, CaseFilter, DocumentStore};

/// Days from case creation to resolution, over resolved cases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionTimes {
    pub resolved_cases: usize,
    pub average_days: f64,
    pub min_days: f64,
    pub max_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOverview {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_threat_type: BTreeMap<String, usize>,
    /// `None` until at least one case has a resolution.
    pub resolution_times: Option<ResolutionTimes>,
}

fn resolution_days(case: &Case) -> Option<f64> {
    let resolution = case.resolution.as_ref()?;
    let seconds = (resolution.resolved_at - case.created_at).num_seconds();
    Some(seconds as f64 / 86_400.0)
}

pub fn resolution_times(cases: &[Case]) -> Option<ResolutionTimes> {
    let days: Vec<f64> = cases.iter().filter_map(resolution_days).collect();
    if days.is_empty() {
        return None;
    }
    let sum: f64 = days.iter().sum();
    Some(ResolutionTimes {
        resolved_cases: days.len(),
        average_days: sum / days.len() as f64,
        min_days: days.iter().copied().fold(f64::INFINITY, f64::min),
        max_days: days.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

pub fn case_overview(store: &dyn DocumentStore) -> DeskResult<CaseOverview> {
    let cases = store.cases(&CaseFilter::default())?;
    Ok(CaseOverview {
        total: cases.len(),
        by_status: count_by(cases.iter().map(|c| c.status.as_str())),
        by_priority: count_by(cases.iter().map(|c| c.priority.as_str())),
        by_threat_type: count_by(cases.iter().map(|c| c.threat_type.as_str())),
        resolution_times: resolution_times(&cases),
    })
}
