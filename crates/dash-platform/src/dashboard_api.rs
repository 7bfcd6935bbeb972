//! Dashboards API
//!
//! Reading a populated dashboard fires INVOKE for its country.

use axum::{
    extract::{Path, State},
    Json,
};
use dash_notify::subscription::timestamp_now;
use dash_notify::{EventKind, Notifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::error::{ErrorResponse, PlatformError};
use crate::fire_event;
use crate::registration::{Features, RegistrationRepository};

/// Dashboard view of one registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub id: String,
    pub country: String,
    pub iso_code: String,
    pub features: Features,
    pub last_retrieval: String,
}

#[derive(Clone)]
pub struct DashboardsState {
    pub repo: Arc<dyn RegistrationRepository>,
    pub notifier: Arc<Notifier>,
}

/// Retrieve a populated dashboard
#[utoipa::path(
    get,
    path = "/dashboard/v1/dashboards/{id}",
    tag = "dashboards",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse)
    )
)]
pub async fn get_dashboard(
    State(state): State<DashboardsState>,
    Path(id): Path<String>,
) -> Result<Json<DashboardResponse>, PlatformError> {
    let registration = state
        .repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Registration", &id))?;

    fire_event(&state.notifier, EventKind::Invoke, &registration.iso_code).await;

    Ok(Json(DashboardResponse {
        id: registration.id,
        country: registration.country,
        iso_code: registration.iso_code,
        features: registration.features,
        last_retrieval: timestamp_now(),
    }))
}

pub fn dashboards_router(state: DashboardsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_dashboard))
        .with_state(state)
}
