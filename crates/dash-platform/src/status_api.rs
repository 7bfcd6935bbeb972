//! Service Status API

use axum::{extract::State, http::StatusCode, Json};
use dash_notify::{SubscriptionService, UrlProbe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

pub const API_VERSION: &str = "v1";

/// Status of upstream dependencies
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// HTTP status returned by the countries API
    pub countriesapi: u16,
    /// 200 when the webhook store answers, 503 otherwise
    pub notificationdb: u16,
    /// Registered webhooks, -1 when the store is unavailable
    pub webhooks: i64,
    pub version: String,
    /// Seconds since start
    pub uptime: f64,
}

#[derive(Clone)]
pub struct StatusState {
    pub subscriptions: Arc<SubscriptionService>,
    pub probe: Arc<dyn UrlProbe>,
    pub countries_api_url: String,
    pub started_at: Instant,
}

impl StatusState {
    fn countries_probe_url(&self) -> String {
        format!("{}/alpha/no", self.countries_api_url.trim_end_matches('/'))
    }
}

/// Service status
#[utoipa::path(
    get,
    path = "/dashboard/v1/status/",
    tag = "status",
    responses(
        (status = 200, description = "Service status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<StatusState>) -> Json<StatusResponse> {
    let url = state.countries_probe_url();
    let countriesapi = match state.probe.probe(&url).await {
        Ok(status) => status,
        Err(e) => {
            warn!(url = %url, error = %e, "Countries API unreachable");
            StatusCode::SERVICE_UNAVAILABLE.as_u16()
        }
    };

    let (notificationdb, webhooks) = match state.subscriptions.count().await {
        Ok(count) => (StatusCode::OK.as_u16(), count as i64),
        Err(e) => {
            warn!(error = %e, "Webhook store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE.as_u16(), -1)
        }
    };

    Json(StatusResponse {
        countriesapi,
        notificationdb,
        webhooks,
        version: API_VERSION.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

pub fn status_router(state: StatusState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_status))
        .with_state(state)
}
