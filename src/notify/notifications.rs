//! Per-user notification records.
//!
//! Fan-out only persists records; clients poll for them. Notifications
//! raised as a side effect of a case transition go through the
//! `*_best_effort` helpers: the transition has already been written, so a
//! failed insert is logged rather than returned.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DeskError, DeskResult};
use crate::identity::RequestContext;
use crate::storage::{
    count_by, paginate, DocumentStore, NoticePriority, Notification, NotificationFilter,
    NotificationKind, Page, PageResult, Role, UserFilter,
};

/// Content of a notification before it is addressed to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NoticePriority,
    pub related_case: Option<String>,
    pub metadata: Option<Value>,
}

impl NotificationDraft {
    pub fn new(title: &str, message: &str, kind: NotificationKind, priority: NoticePriority) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            kind,
            priority,
            related_case: None,
            metadata: None,
        }
    }

    pub fn with_case(mut self, case_id: &str) -> Self {
        self.related_case = Some(case_id.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn check(&self) -> DeskResult<()> {
        if self.title.trim().is_empty() || self.message.trim().is_empty() {
            return Err(DeskError::InvalidArgument(
                "title and message are required".to_string(),
            ));
        }
        Ok(())
    }

    fn addressed_to(&self, user_id: &str, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: self.title.clone(),
            message: self.message.clone(),
            kind: self.kind,
            priority: self.priority,
            read: false,
            related_case: self.related_case.clone(),
            metadata: self.metadata.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: usize,
    pub unread: usize,
    pub read: usize,
    pub unread_by_kind: BTreeMap<String, usize>,
    pub unread_by_priority: BTreeMap<String, usize>,
}

/// Persist one notification for `user_id`.
pub fn create_notification(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    user_id: &str,
    draft: &NotificationDraft,
) -> DeskResult<Notification> {
    draft.check()?;
    if store.user(user_id)?.is_none() {
        return Err(DeskError::not_found("user", user_id));
    }

    let notification = draft.addressed_to(user_id, Utc::now());
    store.insert_notifications(vec![notification.clone()])?;

    log::debug!(
        "{} NOTIFICATION_CREATED user={} kind={} case={}",
        ctx.log_context(),
        user_id,
        draft.kind,
        draft.related_case.as_deref().unwrap_or("-")
    );
    Ok(notification)
}

/// One notification per ACTIVE user holding any of `roles`.
///
/// Returns how many were written; zero matching users is not an error.
pub fn notify_by_role(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    roles: &[Role],
    draft: &NotificationDraft,
) -> DeskResult<usize> {
    if roles.is_empty() {
        return Err(DeskError::InvalidArgument("roles must not be empty".to_string()));
    }
    draft.check()?;

    let recipients = store.users(&UserFilter::active_in(roles))?;
    if recipients.is_empty() {
        log::info!(
            "{} NOTIFY_BY_ROLE_NO_RECIPIENTS roles={:?}",
            ctx.log_context(),
            roles
        );
        return Ok(0);
    }

    let now = Utc::now();
    let batch: Vec<Notification> = recipients
        .iter()
        .map(|user| draft.addressed_to(&user.id, now))
        .collect();
    let written = store.insert_notifications(batch)?;

    log::info!(
        "{} NOTIFY_BY_ROLE kind={} roles={:?} recipients={}",
        ctx.log_context(),
        draft.kind,
        roles,
        written
    );
    Ok(written)
}

/// [`create_notification`] for transition side effects; failures are logged.
pub fn notify_user_best_effort(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    user_id: &str,
    draft: &NotificationDraft,
) {
    if let Err(e) = create_notification(store, ctx, user_id, draft) {
        crate::log_error!(
            ctx.log_context(),
            "NOTIFICATION_DROPPED",
            user = user_id,
            kind = draft.kind.as_str(),
            error = e.to_string()
        );
    }
}

/// [`notify_by_role`] for transition side effects; failures are logged.
pub fn notify_by_role_best_effort(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    roles: &[Role],
    draft: &NotificationDraft,
) {
    if let Err(e) = notify_by_role(store, ctx, roles, draft) {
        crate::log_error!(
            ctx.log_context(),
            "NOTIFICATION_FAN_OUT_DROPPED",
            roles = roles,
            kind = draft.kind.as_str(),
            error = e.to_string()
        );
    }
}

fn newest_first(mut notifications: Vec<Notification>) -> Vec<Notification> {
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
}

/// Caller's own notifications, newest first. `filter.user_id` is ignored.
pub fn list_notifications(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    filter: &NotificationFilter,
    page: Page,
) -> DeskResult<PageResult<Notification>> {
    let filter = NotificationFilter {
        user_id: Some(ctx.actor_id()?.to_string()),
        ..filter.clone()
    };
    Ok(paginate(newest_first(store.notifications(&filter)?), page))
}

pub fn unread_count(store: &dyn DocumentStore, ctx: &RequestContext) -> DeskResult<usize> {
    let filter = NotificationFilter {
        read: Some(false),
        ..NotificationFilter::for_user(ctx.actor_id()?)
    };
    Ok(store.notifications(&filter)?.len())
}

pub fn notification_stats(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
) -> DeskResult<NotificationStats> {
    let all = store.notifications(&NotificationFilter::for_user(ctx.actor_id()?))?;
    let unread: Vec<&Notification> = all.iter().filter(|n| !n.read).collect();

    Ok(NotificationStats {
        total: all.len(),
        unread: unread.len(),
        read: all.len() - unread.len(),
        unread_by_kind: count_by(unread.iter().map(|n| n.kind.as_str())),
        unread_by_priority: count_by(unread.iter().map(|n| n.priority.as_str())),
    })
}

fn owned(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    notification_id: &str,
) -> DeskResult<Notification> {
    let notification = store
        .notification(notification_id)?
        .ok_or_else(|| DeskError::not_found("notification", notification_id))?;
    if notification.user_id != ctx.actor_id()? {
        crate::log_warn!(
            ctx.log_context(),
            "NOTIFICATION_NOT_OWNER",
            id = notification_id,
            owner = notification.user_id
        );
        return Err(DeskError::Forbidden(
            "notification belongs to another user".to_string(),
        ));
    }
    Ok(notification)
}

pub fn mark_read(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    notification_id: &str,
) -> DeskResult<Notification> {
    let mut notification = owned(store, ctx, notification_id)?;
    if !notification.read {
        notification.read = true;
        notification.updated_at = Utc::now();
        store.update_notification(&notification)?;
    }
    Ok(notification)
}

/// Returns how many were flipped.
pub fn mark_all_read(store: &dyn DocumentStore, ctx: &RequestContext) -> DeskResult<usize> {
    let filter = NotificationFilter {
        read: Some(false),
        ..NotificationFilter::for_user(ctx.actor_id()?)
    };
    let now = Utc::now();
    let mut flipped = 0;
    for mut notification in store.notifications(&filter)? {
        notification.read = true;
        notification.updated_at = now;
        store.update_notification(&notification)?;
        flipped += 1;
    }
    log::info!("{} NOTIFICATIONS_MARKED_READ count={}", ctx.log_context(), flipped);
    Ok(flipped)
}

pub fn delete_notification(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    notification_id: &str,
) -> DeskResult<()> {
    owned(store, ctx, notification_id)?;
    store.delete_notification(notification_id)?;
    log::info!(
        "{} NOTIFICATION_DELETED id={}",
        ctx.log_context(),
        notification_id
    );
    Ok(())
}

/// Everyone's notifications, newest first.
pub fn admin_list_notifications(
    store: &dyn DocumentStore,
    filter: &NotificationFilter,
    page: Page,
) -> DeskResult<PageResult<Notification>> {
    Ok(paginate(newest_first(store.notifications(filter)?), page))
}

pub fn admin_delete_notification(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    notification_id: &str,
) -> DeskResult<()> {
    if !store.delete_notification(notification_id)? {
        return Err(DeskError::not_found("notification", notification_id));
    }
    log::info!(
        "{} NOTIFICATION_DELETED_BY_ADMIN id={}",
        ctx.log_context(),
        notification_id
    );
    Ok(())
}
