//! The desk: one entry point per upward operation.
//!
//! Every method checks the caller against the operation's declared access
//! and then delegates to the owning module. Paging arguments are clamped
//! to the configured maximum.

use std::sync::Arc;

use crate::assignment::{
    self, AutoAssignOutcome, AutoAssignRequest, BulkAssignResult, OfficerAvailability,
    OfficerWorkload, Recommendations,
};
use crate::cases::{
    self, AssignmentOutcome, AssignmentRequest, CaseOverview, CaseView, InvestigationUpdate,
    ResolutionInput,
};
use crate::config::DeskConfig;
use crate::error::DeskResult;
use crate::identity::{authenticate, authorize, Operation, RequestContext};
use crate::intake::{self, ReportStats, ReportSubmission, SubmitReceipt, ValidationOutcome};
use crate::missions::{
    self, AssignedCaseView, FieldResolutionInput, MissionEvidenceInput, ReconcileOutcome,
};
use crate::notify::{
    self, AlertInput, AlertKind, AlertQuery, AlertReceipt, AlertStats, NotificationDraft,
    NotificationStats,
};
use crate::storage::{
    Alert, AlertFilter, Case, CaseFilter, CaseStatus, DocumentStore, GeoPoint, Notification,
    NotificationFilter, Page, PageResult, RangerMission, RangerStatus, ReportFilter, Role,
    Specialization, TeamRecord, ThreatReport,
};

pub struct Desk {
    store: Arc<dyn DocumentStore>,
    config: DeskConfig,
}

impl Desk {
    pub fn new(store: Arc<dyn DocumentStore>, config: DeskConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, DeskConfig::default())
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Build a request context. `None` is an anonymous caller; an id is
    /// resolved against the directory.
    pub fn context(&self, user_id: Option<&str>) -> DeskResult<RequestContext> {
        match user_id {
            None => Ok(RequestContext::anonymous()),
            Some(id) => Ok(RequestContext::for_caller(authenticate(
                self.store(),
                Some(id),
            )?)),
        }
    }

    /// First page at the configured default size.
    pub fn default_page(&self) -> Page {
        Page::first(self.config.pagination.default_limit)
    }

    pub fn default_notification_page(&self) -> Page {
        Page::first(self.config.pagination.notification_default_limit)
    }

    fn guard(&self, ctx: &RequestContext, operation: Operation) -> DeskResult<()> {
        authorize(ctx.caller.as_ref(), operation).inspect_err(|e| {
            crate::log_debug!(
                ctx.log_context(),
                "OPERATION_REFUSED",
                operation = operation,
                code = e.code()
            );
        })
    }

    fn clamp(&self, page: Page) -> Page {
        page.normalized(self.config.pagination.max_limit)
    }

    // -----------------------------------------------------------------------
    // Threat intake
    // -----------------------------------------------------------------------

    pub fn submit_report(
        &self,
        ctx: &RequestContext,
        submission: ReportSubmission,
    ) -> DeskResult<SubmitReceipt> {
        self.guard(ctx, Operation::SubmitReport)?;
        intake::submit_report(self.store(), ctx, submission)
    }

    pub fn validate_report(
        &self,
        ctx: &RequestContext,
        report_id: &str,
        decision: &str,
        notes: Option<&str>,
    ) -> DeskResult<ValidationOutcome> {
        self.guard(ctx, Operation::ValidateReport)?;
        intake::validate_report(self.store(), ctx, report_id, decision, notes)
    }

    pub fn annotate_report(
        &self,
        ctx: &RequestContext,
        report_id: &str,
        notes: &str,
    ) -> DeskResult<ThreatReport> {
        self.guard(ctx, Operation::AnnotateReport)?;
        intake::annotate_report(self.store(), ctx, report_id, notes)
    }

    pub fn get_report(&self, ctx: &RequestContext, report_id: &str) -> DeskResult<ThreatReport> {
        self.guard(ctx, Operation::GetReport)?;
        intake::get_report(self.store(), ctx, report_id)
    }

    pub fn list_reports(
        &self,
        ctx: &RequestContext,
        filter: &ReportFilter,
        page: Page,
    ) -> DeskResult<PageResult<ThreatReport>> {
        self.guard(ctx, Operation::ListReports)?;
        intake::list_reports(self.store(), ctx, filter, self.clamp(page))
    }

    pub fn report_stats(&self, ctx: &RequestContext) -> DeskResult<ReportStats> {
        self.guard(ctx, Operation::ReportStats)?;
        intake::report_stats(self.store())
    }

    // -----------------------------------------------------------------------
    // Case lifecycle
    // -----------------------------------------------------------------------

    pub fn get_case(&self, ctx: &RequestContext, case_id: &str) -> DeskResult<CaseView> {
        self.guard(ctx, Operation::GetCase)?;
        cases::get_case(self.store(), ctx, case_id)
    }

    pub fn list_cases(
        &self,
        ctx: &RequestContext,
        filter: &CaseFilter,
        page: Page,
    ) -> DeskResult<PageResult<Case>> {
        self.guard(ctx, Operation::ListCases)?;
        cases::list_cases(self.store(), filter, self.clamp(page))
    }

    pub fn list_officer_cases(
        &self,
        ctx: &RequestContext,
        officer_id: &str,
        status: Option<CaseStatus>,
        page: Page,
    ) -> DeskResult<PageResult<Case>> {
        self.guard(ctx, Operation::ListOfficerCases)?;
        cases::list_officer_cases(self.store(), officer_id, status, self.clamp(page))
    }

    pub fn case_overview(&self, ctx: &RequestContext) -> DeskResult<CaseOverview> {
        self.guard(ctx, Operation::CaseOverview)?;
        cases::case_overview(self.store())
    }

    pub fn assign_case(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        request: &AssignmentRequest,
    ) -> DeskResult<AssignmentOutcome> {
        self.guard(ctx, Operation::AssignCase)?;
        cases::assign_case(self.store(), ctx, case_id, request)
    }

    pub fn record_investigation(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        update: &InvestigationUpdate,
    ) -> DeskResult<Case> {
        self.guard(ctx, Operation::RecordInvestigation)?;
        cases::record_investigation(self.store(), ctx, case_id, update)
    }

    pub fn resolve_case(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        input: &ResolutionInput,
    ) -> DeskResult<Case> {
        self.guard(ctx, Operation::ResolveCase)?;
        cases::resolve_case(self.store(), ctx, case_id, input)
    }

    pub fn close_case(&self, ctx: &RequestContext, case_id: &str) -> DeskResult<Case> {
        self.guard(ctx, Operation::CloseCase)?;
        cases::close_case(self.store(), ctx, case_id)
    }

    // -----------------------------------------------------------------------
    // Assignment engine
    // -----------------------------------------------------------------------

    pub fn auto_assign(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        request: &AutoAssignRequest,
    ) -> DeskResult<AutoAssignOutcome> {
        self.guard(ctx, Operation::AutoAssign)?;
        assignment::auto_assign(self.store(), ctx, case_id, request)
    }

    pub fn bulk_assign(
        &self,
        ctx: &RequestContext,
        case_ids: &[String],
        request: &AssignmentRequest,
    ) -> DeskResult<BulkAssignResult> {
        self.guard(ctx, Operation::BulkAssign)?;
        assignment::bulk_assign(self.store(), ctx, case_ids, request)
    }

    pub fn workload(&self, ctx: &RequestContext) -> DeskResult<Vec<OfficerWorkload>> {
        self.guard(ctx, Operation::Workload)?;
        assignment::workload(self.store())
    }

    pub fn recommendations(
        &self,
        ctx: &RequestContext,
        case_id: &str,
    ) -> DeskResult<Recommendations> {
        self.guard(ctx, Operation::Recommendations)?;
        assignment::recommendations(self.store(), &self.config.assignment, case_id)
    }

    pub fn available_officers(
        &self,
        ctx: &RequestContext,
        available_only: bool,
    ) -> DeskResult<Vec<OfficerAvailability>> {
        self.guard(ctx, Operation::AvailableOfficers)?;
        assignment::available_officers(self.store(), &self.config.assignment, available_only)
    }

    pub fn available_teams(
        &self,
        ctx: &RequestContext,
        specialization: Option<Specialization>,
    ) -> DeskResult<Vec<TeamRecord>> {
        self.guard(ctx, Operation::AvailableTeams)?;
        assignment::available_teams(self.store(), specialization)
    }

    // -----------------------------------------------------------------------
    // Ranger missions
    // -----------------------------------------------------------------------

    pub fn list_my_missions(
        &self,
        ctx: &RequestContext,
        ranger_status: Option<RangerStatus>,
        page: Page,
    ) -> DeskResult<PageResult<AssignedCaseView>> {
        self.guard(ctx, Operation::ListMyMissions)?;
        missions::list_my_assigned_cases(self.store(), ctx, ranger_status, self.clamp(page))
    }

    pub fn ensure_mission(&self, ctx: &RequestContext, case_id: &str) -> DeskResult<RangerMission> {
        self.guard(ctx, Operation::EnsureMission)?;
        missions::ensure_mission(self.store(), ctx, case_id)
    }

    pub fn accept_mission(&self, ctx: &RequestContext, case_id: &str) -> DeskResult<RangerMission> {
        self.guard(ctx, Operation::AcceptMission)?;
        missions::accept_mission(self.store(), ctx, case_id)
    }

    pub fn decline_mission(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        reason: Option<&str>,
    ) -> DeskResult<RangerMission> {
        self.guard(ctx, Operation::DeclineMission)?;
        missions::decline_mission(self.store(), ctx, case_id, reason)
    }

    pub fn advance_mission(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        next: RangerStatus,
        notes: Option<&str>,
    ) -> DeskResult<RangerMission> {
        self.guard(ctx, Operation::AdvanceMission)?;
        missions::advance_mission(self.store(), ctx, case_id, next, notes)
    }

    pub fn add_mission_evidence(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        input: &MissionEvidenceInput,
    ) -> DeskResult<RangerMission> {
        self.guard(ctx, Operation::AddMissionEvidence)?;
        missions::add_mission_evidence(self.store(), ctx, case_id, input)
    }

    pub fn record_field_resolution(
        &self,
        ctx: &RequestContext,
        case_id: &str,
        input: &FieldResolutionInput,
    ) -> DeskResult<RangerMission> {
        self.guard(ctx, Operation::RecordFieldResolution)?;
        missions::record_field_resolution(self.store(), ctx, case_id, input)
    }

    pub fn reconcile_mission(
        &self,
        ctx: &RequestContext,
        case_id: &str,
    ) -> DeskResult<ReconcileOutcome> {
        self.guard(ctx, Operation::ReconcileMission)?;
        missions::reconcile_mission(self.store(), ctx, case_id)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn notify_by_role(
        &self,
        ctx: &RequestContext,
        roles: &[Role],
        draft: &NotificationDraft,
    ) -> DeskResult<usize> {
        self.guard(ctx, Operation::NotifyByRole)?;
        notify::notify_by_role(self.store(), ctx, roles, draft)
    }

    pub fn list_notifications(
        &self,
        ctx: &RequestContext,
        filter: &NotificationFilter,
        page: Page,
    ) -> DeskResult<PageResult<Notification>> {
        self.guard(ctx, Operation::ListNotifications)?;
        notify::list_notifications(self.store(), ctx, filter, self.clamp(page))
    }

    pub fn unread_count(&self, ctx: &RequestContext) -> DeskResult<usize> {
        self.guard(ctx, Operation::UnreadCount)?;
        notify::unread_count(self.store(), ctx)
    }

    pub fn notification_stats(&self, ctx: &RequestContext) -> DeskResult<NotificationStats> {
        self.guard(ctx, Operation::NotificationStats)?;
        notify::notification_stats(self.store(), ctx)
    }

    pub fn mark_read(&self, ctx: &RequestContext, notification_id: &str) -> DeskResult<Notification> {
        self.guard(ctx, Operation::MarkRead)?;
        notify::mark_read(self.store(), ctx, notification_id)
    }

    pub fn mark_all_read(&self, ctx: &RequestContext) -> DeskResult<usize> {
        self.guard(ctx, Operation::MarkAllRead)?;
        notify::mark_all_read(self.store(), ctx)
    }

    pub fn delete_notification(&self, ctx: &RequestContext, notification_id: &str) -> DeskResult<()> {
        self.guard(ctx, Operation::DeleteNotification)?;
        notify::delete_notification(self.store(), ctx, notification_id)
    }

    pub fn admin_list_notifications(
        &self,
        ctx: &RequestContext,
        filter: &NotificationFilter,
        page: Page,
    ) -> DeskResult<PageResult<Notification>> {
        self.guard(ctx, Operation::AdminListNotifications)?;
        notify::admin_list_notifications(self.store(), filter, self.clamp(page))
    }

    pub fn admin_delete_notification(
        &self,
        ctx: &RequestContext,
        notification_id: &str,
    ) -> DeskResult<()> {
        self.guard(ctx, Operation::AdminDeleteNotification)?;
        notify::admin_delete_notification(self.store(), ctx, notification_id)
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    pub fn send_emergency_alert(
        &self,
        ctx: &RequestContext,
        input: AlertInput,
    ) -> DeskResult<AlertReceipt> {
        self.guard(ctx, Operation::EmergencyAlert)?;
        notify::send_alert(self.store(), ctx, AlertKind::Emergency, input)
    }

    pub fn send_custom_alert(&self, ctx: &RequestContext, input: AlertInput) -> DeskResult<AlertReceipt> {
        self.guard(ctx, Operation::CustomAlert)?;
        notify::send_alert(self.store(), ctx, AlertKind::Custom, input)
    }

    pub fn send_announcement(&self, ctx: &RequestContext, input: AlertInput) -> DeskResult<AlertReceipt> {
        self.guard(ctx, Operation::Announcement)?;
        notify::send_alert(self.store(), ctx, AlertKind::Announcement, input)
    }

    pub fn list_alerts(
        &self,
        ctx: &RequestContext,
        query: &AlertQuery,
        page: Page,
    ) -> DeskResult<PageResult<Alert>> {
        self.guard(ctx, Operation::ListAlerts)?;
        notify::list_alerts(self.store(), ctx, query, self.clamp(page))
    }

    pub fn alert_stats(&self, ctx: &RequestContext) -> DeskResult<AlertStats> {
        self.guard(ctx, Operation::AlertStats)?;
        notify::alert_stats(self.store(), ctx)
    }

    /// `radius_m` falls back to the configured default.
    pub fn location_alerts(
        &self,
        ctx: &RequestContext,
        point: GeoPoint,
        radius_m: Option<f64>,
    ) -> DeskResult<Vec<Alert>> {
        self.guard(ctx, Operation::LocationAlerts)?;
        let radius = radius_m.unwrap_or(self.config.alerts.default_radius_m);
        notify::location_alerts(self.store(), ctx, point, radius)
    }

    pub fn list_all_alerts(
        &self,
        ctx: &RequestContext,
        filter: &AlertFilter,
        page: Page,
    ) -> DeskResult<PageResult<Alert>> {
        self.guard(ctx, Operation::ListAllAlerts)?;
        notify::list_all_alerts(self.store(), filter, self.clamp(page))
    }

    pub fn deactivate_alert(&self, ctx: &RequestContext, alert_id: &str) -> DeskResult<Alert> {
        self.guard(ctx, Operation::DeactivateAlert)?;
        notify::deactivate_alert(self.store(), ctx, alert_id)
    }
}
