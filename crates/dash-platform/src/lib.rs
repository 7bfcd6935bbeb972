//! Dashboard Service Platform
//!
//! REST surface of the dashboard service, mounted under `/dashboard/v1`:
//! - `/`: endpoint index
//! - `registrations/`: dashboard configurations, firing REGISTER, CHANGE (PUT and PATCH), DELETE
//! - `dashboards/`: populated dashboards, firing INVOKE
//! - `notifications/`: webhook subscriptions
//! - `status/`: upstream availability

pub mod dashboard_api;
pub mod error;
pub mod index_api;
pub mod notification_api;
pub mod registration;
pub mod status_api;

pub use dashboard_api::{dashboards_router, DashboardsState};
pub use error::{PlatformError, Result};
pub use index_api::index_router;
pub use notification_api::{notifications_router, NotificationsState};
pub use registration::{
    registrations_router, InMemoryRegistrationRepository, MongoRegistrationRepository,
    Registration, RegistrationRepository, RegistrationsState,
};
pub use status_api::{status_router, StatusState};

use dash_notify::{EventKind, Notifier};
use tracing::debug;
use utoipa_axum::router::OpenApiRouter;

/// Fire an event after the triggering write succeeded.
///
/// A matching error is logged by the notifier and never fails the request.
pub(crate) async fn fire_event(notifier: &Notifier, event: EventKind, country: &str) {
    match notifier.notify(event, country).await {
        Ok(scheduled) => debug!(event = %event, country = %country, scheduled, "Event fired"),
        Err(e) => debug!(event = %event, country = %country, error = %e, "Event not delivered"),
    }
}

/// State of every API router
#[derive(Clone)]
pub struct PlatformState {
    pub notifications: NotificationsState,
    pub registrations: RegistrationsState,
    pub dashboards: DashboardsState,
    pub status: StatusState,
}

pub fn platform_router(state: PlatformState) -> OpenApiRouter {
    OpenApiRouter::new()
        .merge(index_router())
        .merge(registrations_router(state.registrations))
        .merge(dashboards_router(state.dashboards))
        .merge(notifications_router(state.notifications))
        .merge(status_router(state.status))
}
