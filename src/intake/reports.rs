//! Threat report intake and the validate-or-reject decision.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cases::lifecycle::case_from_report;
use crate::error::{DeskError, DeskResult};
use crate::identity::RequestContext;
use crate::notify::notifications::{notify_by_role_best_effort, NotificationDraft};
use crate::security::{redact_reporter, scan_fields, scrub_text, MAX_TEXT_FIELD};
use crate::storage::{
    count_by, paginate, DocumentStore, Location, NoticePriority, NotificationKind, Page,
    PageResult, Priority, ReportFilter, ReportStatus, ReporterInfo, Role, ThreatReport,
    ThreatType,
};

use super::ids::new_report_id;
use super::media::normalize_media;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Citizen-submitted report, as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    pub threat_type: Option<String>,
    pub location: Option<LocationInput>,
    /// RFC 3339 timestamp of the incident.
    pub date_time: Option<String>,
    pub description: Option<String>,
    pub reporter_info: Option<ReporterInput>,
    #[serde(default)]
    pub media: Vec<Value>,
    pub urgency_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub report_id: String,
    pub status: ReportStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub report_id: String,
    pub status: ReportStatus,
    pub created_case_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_threat_type: BTreeMap<String, usize>,
    pub by_urgency: BTreeMap<String, usize>,
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_timestamp(raw: &str) -> DeskResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DeskError::InvalidArgument(format!("dateTime is not RFC 3339: {}", raw)))
}

/// Checked submission fields, ready to store.
struct AcceptedFields {
    threat_type: ThreatType,
    location: Location,
    date_time: DateTime<Utc>,
    description: String,
    reporter: ReporterInfo,
    urgency: Priority,
}

/// Check required fields and build the stored parts of a report.
fn validate_submission(submission: &ReportSubmission) -> DeskResult<AcceptedFields> {
    let mut missing = Vec::new();

    let threat_raw = trimmed(&submission.threat_type);
    if threat_raw.is_none() {
        missing.push("threatType");
    }
    let location = submission.location.clone().unwrap_or_default();
    if location.lat.is_none() {
        missing.push("location.lat");
    }
    if location.lng.is_none() {
        missing.push("location.lng");
    }
    if trimmed(&location.address).is_none() {
        missing.push("location.address");
    }
    let date_raw = trimmed(&submission.date_time);
    if date_raw.is_none() {
        missing.push("dateTime");
    }
    let description = trimmed(&submission.description);
    if description.is_none() {
        missing.push("description");
    }
    let reporter = submission.reporter_info.clone().unwrap_or_default();
    if trimmed(&reporter.name).is_none() {
        missing.push("reporterInfo.name");
    }

    if !missing.is_empty() {
        return Err(DeskError::InvalidArgument(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let threat_raw = threat_raw.unwrap_or_default();
    let threat_type = ThreatType::parse(threat_raw)
        .ok_or_else(|| DeskError::InvalidArgument(format!("unknown threatType: {}", threat_raw)))?;

    let lat = location.lat.unwrap_or_default();
    let lng = location.lng.unwrap_or_default();
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(DeskError::InvalidArgument(format!(
            "location out of range: lat={} lng={}",
            lat, lng
        )));
    }

    let date_time = parse_timestamp(date_raw.unwrap_or_default())?;

    let description = description.unwrap_or_default();
    if description.len() > MAX_TEXT_FIELD {
        return Err(DeskError::InvalidArgument(format!(
            "description exceeds {} bytes",
            MAX_TEXT_FIELD
        )));
    }

    let urgency = match trimmed(&submission.urgency_level) {
        Some(raw) => Priority::parse(raw)
            .ok_or_else(|| DeskError::InvalidArgument(format!("unknown urgencyLevel: {}", raw)))?,
        None => Priority::Medium,
    };

    Ok(AcceptedFields {
        threat_type,
        location: Location {
            lat,
            lng,
            address: trimmed(&location.address).unwrap_or_default().to_string(),
        },
        date_time,
        description: description.to_string(),
        reporter: ReporterInfo {
            name: trimmed(&reporter.name).unwrap_or_default().to_string(),
            email: trimmed(&reporter.email).map(str::to_string),
            phone: trimmed(&reporter.phone).map(str::to_string),
            is_anonymous: reporter.is_anonymous,
        },
        urgency,
    })
}

/// Validate and persist a citizen report at PENDING.
pub fn submit_report(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    submission: ReportSubmission,
) -> DeskResult<SubmitReceipt> {
    let AcceptedFields {
        threat_type,
        location,
        date_time,
        description,
        reporter,
        urgency,
    } = match validate_submission(&submission) {
        Ok(fields) => fields,
        Err(e) => {
            log::info!("{} REPORT_REJECTED_INPUT reason={}", ctx.log_context(), e);
            return Err(e);
        }
    };
    let anonymous = reporter.is_anonymous;

    let report_id = new_report_id();
    let log_ctx = ctx.log_for(&report_id);

    scan_fields(
        &[
            ("description", description.as_str()),
            ("location.address", location.address.as_str()),
            ("reporterInfo.name", reporter.name.as_str()),
        ],
        &log_ctx,
    );
    let media = normalize_media(&submission.media, &log_ctx);

    let now = Utc::now();
    let report = ThreatReport {
        report_id: report_id.clone(),
        threat_type,
        location,
        date_time,
        description,
        reporter,
        media,
        status: ReportStatus::Pending,
        urgency,
        validation_notes: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_report(report)?;

    log::info!(
        "{} REPORT_SUBMITTED threat_type={} urgency={} anonymous={}",
        log_ctx,
        threat_type,
        urgency,
        anonymous
    );

    let priority = match urgency {
        Priority::High | Priority::Critical => NoticePriority::High,
        _ => NoticePriority::Medium,
    };
    let draft = NotificationDraft::new(
        "New threat report",
        &format!("A new {} report ({}) is awaiting validation", threat_type, report_id),
        NotificationKind::NewReport,
        priority,
    )
    .with_metadata(serde_json::json!({ "reportId": report_id }));
    notify_by_role_best_effort(store, ctx, Role::STAFF, &draft);

    Ok(SubmitReceipt {
        report_id,
        status: ReportStatus::Pending,
    })
}

/// Decide a PENDING report. VALIDATED creates exactly one case.
pub fn validate_report(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    report_id: &str,
    decision: &str,
    notes: Option<&str>,
) -> DeskResult<ValidationOutcome> {
    let decision = ReportStatus::parse(decision)
        .filter(|s| *s != ReportStatus::Pending)
        .ok_or_else(|| {
            DeskError::InvalidArgument(format!(
                "decision must be VALIDATED or REJECTED, got {}",
                decision
            ))
        })?;

    let log_ctx = ctx.log_for(report_id);
    let mut report = store
        .report(report_id)?
        .ok_or_else(|| DeskError::not_found("report", report_id))?;

    if report.status != ReportStatus::Pending {
        return Err(DeskError::InvalidState(format!(
            "report already {}",
            report.status
        )));
    }

    let now = Utc::now();
    report.status = decision;
    if let Some(notes) = notes {
        report.validation_notes = Some(notes.to_string());
    }
    report.updated_at = now;

    let case = match decision {
        ReportStatus::Validated => Some(case_from_report(&report, now)),
        _ => None,
    };
    let created_case_id = case.as_ref().map(|c| c.case_id.clone());

    if !store.commit_report_decision(&report, case)? {
        log::warn!("{} REPORT_DECISION_LOST decision={}", log_ctx, decision);
        return Err(DeskError::Conflict(
            "report was decided by another request".to_string(),
        ));
    }

    log::info!(
        "{} REPORT_DECIDED decision={} case={}",
        log_ctx,
        decision,
        created_case_id.as_deref().unwrap_or("-")
    );

    Ok(ValidationOutcome {
        report_id: report.report_id,
        status: decision,
        created_case_id,
    })
}

/// Replace validation notes. Allowed in any status.
pub fn annotate_report(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    report_id: &str,
    notes: &str,
) -> DeskResult<ThreatReport> {
    let mut report = store
        .report(report_id)?
        .ok_or_else(|| DeskError::not_found("report", report_id))?;

    report.validation_notes = Some(notes.to_string());
    report.updated_at = Utc::now();
    store.update_report(&report)?;

    log::info!("{} REPORT_ANNOTATED", ctx.log_for(report_id));
    Ok(staff_view(report, ctx))
}

/// Staff-facing copy: anonymous reporters lose contact details and the
/// description is scrubbed of emails and phone numbers.
pub fn staff_view(mut report: ThreatReport, ctx: &RequestContext) -> ThreatReport {
    if report.reporter.is_anonymous {
        report.reporter = redact_reporter(&report.reporter);
        let (scrubbed, _) = scrub_text(&report.description, &ctx.log_for(&report.report_id));
        report.description = scrubbed;
    }
    report
}

pub fn get_report(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    report_id: &str,
) -> DeskResult<ThreatReport> {
    let report = store
        .report(report_id)?
        .ok_or_else(|| DeskError::not_found("report", report_id))?;
    Ok(staff_view(report, ctx))
}

/// Newest first.
pub fn list_reports(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    filter: &ReportFilter,
    page: Page,
) -> DeskResult<PageResult<ThreatReport>> {
    let mut reports = store.reports(filter)?;
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(paginate(reports, page).map(|r| staff_view(r, ctx)))
}

pub fn report_stats(store: &dyn DocumentStore) -> DeskResult<ReportStats> {
    let reports = store.reports(&ReportFilter::default())?;
    Ok(ReportStats {
        total: reports.len(),
        by_status: count_by(reports.iter().map(|r| r.status.as_str())),
        by_threat_type: count_by(reports.iter().map(|r| r.threat_type.as_str())),
        by_urgency: count_by(reports.iter().map(|r| r.urgency.as_str())),
    })
}
