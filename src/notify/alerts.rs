//! Role-targeted broadcast alerts.
//!
//! Alerts are never addressed to a user. The audience is worked out at
//! read time from the caller's role and, for location queries, distance
//! to the alert's geofence point.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DeskError, DeskResult};
use crate::identity::RequestContext;
use crate::storage::{
    count_by, paginate, Alert, AlertCategory, AlertFilter, DocumentStore, GeoPoint,
    NoticePriority, Page, PageResult, Role, UserFilter,
};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Alert request as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInput {
    pub title: String,
    pub message: String,
    pub category: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub target_roles: Vec<String>,
    pub related_case: Option<String>,
    pub location: Option<GeoPoint>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Kind of alert being raised; fixes category and priority defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Emergency,
    Custom,
    Announcement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReceipt {
    pub alert: Alert,
    /// Active users in the target roles at send time. Not a delivery count.
    pub estimated_recipients: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub category: Option<AlertCategory>,
    pub priority: Option<NoticePriority>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
}

/// Great-circle distance in metres.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

fn parse_roles(raw: &[String]) -> DeskResult<Vec<Role>> {
    let mut roles = Vec::with_capacity(raw.len());
    for name in raw {
        let role = Role::parse(name.trim())
            .ok_or_else(|| DeskError::InvalidArgument(format!("unknown role: {}", name)))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

fn parse_or<T>(
    raw: Option<&str>,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
) -> DeskResult<T> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse(value)
            .ok_or_else(|| DeskError::InvalidArgument(format!("unknown {}: {}", field, value))),
        None => Ok(default),
    }
}

/// Validate the input and persist an alert of the given kind.
pub fn send_alert(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    kind: AlertKind,
    input: AlertInput,
) -> DeskResult<AlertReceipt> {
    if input.title.trim().is_empty() || input.message.trim().is_empty() {
        return Err(DeskError::InvalidArgument(
            "title and message are required".to_string(),
        ));
    }
    let roles = parse_roles(&input.target_roles)?;

    let (category, priority, target_roles) = match kind {
        AlertKind::Emergency => {
            let roles = if roles.is_empty() { Role::STAFF.to_vec() } else { roles };
            (AlertCategory::Emergency, NoticePriority::Urgent, roles)
        }
        AlertKind::Custom => {
            if roles.is_empty() {
                return Err(DeskError::InvalidArgument(
                    "targetRoles must not be empty".to_string(),
                ));
            }
            let category = parse_or(
                input.category.as_deref(),
                AlertCategory::Info,
                AlertCategory::parse,
                "category",
            )?;
            let priority = parse_or(
                input.priority.as_deref(),
                NoticePriority::Medium,
                NoticePriority::parse,
                "priority",
            )?;
            (category, priority, roles)
        }
        AlertKind::Announcement => {
            let roles = if roles.is_empty() { Role::ALL.to_vec() } else { roles };
            (AlertCategory::Announcement, NoticePriority::Low, roles)
        }
    };

    let alert = Alert {
        id: Uuid::new_v4().to_string(),
        title: input.title.trim().to_string(),
        message: input.message.trim().to_string(),
        category,
        priority,
        created_by: ctx.actor_id()?.to_string(),
        target_roles,
        related_case: input.related_case,
        location: input.location,
        active: true,
        expires_at: input.expires_at,
        created_at: Utc::now(),
    };

    let estimated_recipients = store.users(&UserFilter::active_in(&alert.target_roles))?.len();
    store.insert_alert(alert.clone())?;

    log::info!(
        "{} ALERT_SENT id={} category={} priority={} roles={:?} estimated_recipients={}",
        ctx.log_context(),
        alert.id,
        alert.category,
        alert.priority,
        alert.target_roles,
        estimated_recipients
    );

    Ok(AlertReceipt {
        alert,
        estimated_recipients,
    })
}

fn visible_filter(ctx: &RequestContext, query: &AlertQuery) -> DeskResult<AlertFilter> {
    let role = ctx.caller()?.role;
    Ok(AlertFilter {
        category: query.category,
        priority: query.priority,
        ..AlertFilter::visible_to(role, Utc::now())
    })
}

fn newest_first(mut alerts: Vec<Alert>) -> Vec<Alert> {
    alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    alerts
}

/// Active, unexpired alerts for the caller's role, newest first.
pub fn list_alerts(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    query: &AlertQuery,
    page: Page,
) -> DeskResult<PageResult<Alert>> {
    let filter = visible_filter(ctx, query)?;
    Ok(paginate(newest_first(store.alerts(&filter)?), page))
}

pub fn alert_stats(store: &dyn DocumentStore, ctx: &RequestContext) -> DeskResult<AlertStats> {
    let alerts = store.alerts(&visible_filter(ctx, &AlertQuery::default())?)?;
    Ok(AlertStats {
        total: alerts.len(),
        by_category: count_by(alerts.iter().map(|a| a.category.as_str())),
        by_priority: count_by(alerts.iter().map(|a| a.priority.as_str())),
    })
}

/// Visible alerts whose geofence point lies within `radius_m` of `point`,
/// nearest first.
pub fn location_alerts(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    point: GeoPoint,
    radius_m: f64,
) -> DeskResult<Vec<Alert>> {
    if !(radius_m.is_finite() && radius_m > 0.0) {
        return Err(DeskError::InvalidArgument(format!(
            "radius must be positive, got {}",
            radius_m
        )));
    }

    let mut nearby: Vec<(f64, Alert)> = store
        .alerts(&visible_filter(ctx, &AlertQuery::default())?)?
        .into_iter()
        .filter_map(|alert| {
            let distance = haversine_m(point, alert.location?);
            (distance <= radius_m).then_some((distance, alert))
        })
        .collect();
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

    log::debug!(
        "{} LOCATION_ALERTS lat={} lng={} radius_m={} found={}",
        ctx.log_context(),
        point.lat,
        point.lng,
        radius_m,
        nearby.len()
    );
    Ok(nearby.into_iter().map(|(_, alert)| alert).collect())
}

/// Every alert regardless of audience or state, newest first.
pub fn list_all_alerts(
    store: &dyn DocumentStore,
    filter: &AlertFilter,
    page: Page,
) -> DeskResult<PageResult<Alert>> {
    Ok(paginate(newest_first(store.alerts(filter)?), page))
}

pub fn deactivate_alert(
    store: &dyn DocumentStore,
    ctx: &RequestContext,
    alert_id: &str,
) -> DeskResult<Alert> {
    let mut alert = store
        .alert(alert_id)?
        .ok_or_else(|| DeskError::not_found("alert", alert_id))?;
    if alert.active {
        alert.active = false;
        store.update_alert(&alert)?;
        crate::log_info!(ctx.log_context(), "ALERT_DEACTIVATED", id = alert_id);
    }
    Ok(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Caller;
    use crate::storage::{AccountStatus, MemoryStore, UserRecord};

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, role) in [
            ("off-1", Role::Officer),
            ("adm-1", Role::Admin),
            ("cit-1", Role::Citizen),
            ("cit-2", Role::Citizen),
        ] {
            store.put_user(UserRecord {
                id: id.to_string(),
                name: id.to_string(),
                email: format!("{}@example.org", id),
                phone: None,
                role,
                status: AccountStatus::Active,
            });
        }
        store
    }

    fn as_user(id: &str, role: Role) -> RequestContext {
        RequestContext::for_caller(Caller::new(id, role))
    }

    fn input(title: &str) -> AlertInput {
        AlertInput {
            title: title.to_string(),
            message: "Stay clear of the eastern firebreak".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_haversine() {
        let colombo = GeoPoint { lat: 6.9271, lng: 79.8612 };
        assert!(haversine_m(colombo, colombo) < 1e-6);
        // One thousandth of a degree of latitude is roughly 111 metres.
        let north = GeoPoint { lat: 6.9281, lng: 79.8612 };
        let d = haversine_m(colombo, north);
        assert!((d - 111.2).abs() < 1.0, "distance {}", d);
    }

    #[test]
    fn test_emergency_defaults() {
        let store = seeded();
        let receipt = send_alert(
            &store,
            &as_user("off-1", Role::Officer),
            AlertKind::Emergency,
            input("Fire"),
        )
        .unwrap();
        assert_eq!(receipt.alert.category, AlertCategory::Emergency);
        assert_eq!(receipt.alert.priority, NoticePriority::Urgent);
        assert_eq!(receipt.estimated_recipients, 2);
    }

    #[test]
    fn test_custom_requires_roles() {
        let store = seeded();
        let ctx = as_user("adm-1", Role::Admin);
        let err = send_alert(&store, &ctx, AlertKind::Custom, input("x")).unwrap_err();
        assert!(matches!(err, DeskError::InvalidArgument(_)));

        let mut bad = input("x");
        bad.target_roles = vec!["RANGER".to_string()];
        assert!(send_alert(&store, &ctx, AlertKind::Custom, bad).is_err());

        let mut ok = input("x");
        ok.target_roles = vec!["CITIZEN".to_string()];
        let receipt = send_alert(&store, &ctx, AlertKind::Custom, ok).unwrap();
        assert_eq!(receipt.alert.category, AlertCategory::Info);
        assert_eq!(receipt.alert.priority, NoticePriority::Medium);
        assert_eq!(receipt.estimated_recipients, 2);
    }

    #[test]
    fn test_visibility_by_role_and_deactivation() {
        let store = seeded();
        let admin = as_user("adm-1", Role::Admin);
        let receipt = send_alert(&store, &admin, AlertKind::Emergency, input("Fire")).unwrap();
        send_alert(&store, &admin, AlertKind::Announcement, input("Open day")).unwrap();

        let citizen = as_user("cit-1", Role::Citizen);
        let seen = list_alerts(&store, &citizen, &AlertQuery::default(), Page::first(10)).unwrap();
        assert_eq!(seen.total, 1);
        assert_eq!(seen.items[0].category, AlertCategory::Announcement);

        let officer = as_user("off-1", Role::Officer);
        assert_eq!(alert_stats(&store, &officer).unwrap().total, 2);

        deactivate_alert(&store, &admin, &receipt.alert.id).unwrap();
        assert_eq!(alert_stats(&store, &officer).unwrap().total, 1);
    }

    #[test]
    fn test_expired_alerts_hidden() {
        let store = seeded();
        let admin = as_user("adm-1", Role::Admin);
        let mut expired = input("Old");
        expired.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        send_alert(&store, &admin, AlertKind::Announcement, expired).unwrap();
        assert_eq!(alert_stats(&store, &admin).unwrap().total, 0);
    }

    #[test]
    fn test_location_alerts_within_radius() {
        let store = seeded();
        let admin = as_user("adm-1", Role::Admin);
        let mut near = input("Near");
        near.location = Some(GeoPoint { lat: 6.9271, lng: 79.8612 });
        let mut far = input("Far");
        far.location = Some(GeoPoint { lat: 7.2906, lng: 80.6337 });
        send_alert(&store, &admin, AlertKind::Emergency, near).unwrap();
        send_alert(&store, &admin, AlertKind::Emergency, far).unwrap();
        send_alert(&store, &admin, AlertKind::Emergency, input("Nowhere")).unwrap();

        let here = GeoPoint { lat: 6.9275, lng: 79.8615 };
        let found = location_alerts(&store, &admin, here, 1000.0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Near");
        assert!(location_alerts(&store, &admin, here, 0.0).is_err());
    }
}
