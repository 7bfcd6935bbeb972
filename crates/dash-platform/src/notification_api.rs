//! Notifications API
//!
//! Webhook registration, lookup and removal.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use dash_notify::{Subscription, SubscriptionRequest, SubscriptionService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::error::{ErrorResponse, PlatformError};

/// Register webhook request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterWebhookRequest {
    /// Callback url; `http://localhost:` urls need a 4-digit port and a path
    #[serde(default)]
    pub url: String,

    /// Two letter country code, empty for every country
    #[serde(default)]
    pub country: String,

    /// One of REGISTER, CHANGE, DELETE, INVOKE
    #[serde(default)]
    pub event: String,
}

impl From<RegisterWebhookRequest> for SubscriptionRequest {
    fn from(req: RegisterWebhookRequest) -> Self {
        SubscriptionRequest::new(req.url, req.event, req.country)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookCreatedResponse {
    pub id: String,
}

/// Webhook response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub id: String,
    pub url: String,
    pub country: String,
    pub event: String,
}

impl From<Subscription> for WebhookResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            url: s.url,
            country: s.country,
            event: s.event.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationsState {
    pub service: Arc<SubscriptionService>,
}

/// Register a webhook
#[utoipa::path(
    post,
    path = "/dashboard/v1/notifications/",
    tag = "notifications",
    request_body = RegisterWebhookRequest,
    responses(
        (status = 201, description = "Webhook registered", body = WebhookCreatedResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn register_webhook(
    State(state): State<NotificationsState>,
    payload: Result<Json<RegisterWebhookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WebhookCreatedResponse>), PlatformError> {
    let Json(req) = payload?;
    let subscription = state.service.register(&req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(WebhookCreatedResponse { id: subscription.id }),
    ))
}

/// List all webhooks
#[utoipa::path(
    get,
    path = "/dashboard/v1/notifications/",
    tag = "notifications",
    responses(
        (status = 200, description = "Registered webhooks", body = Vec<WebhookResponse>)
    )
)]
pub async fn list_webhooks(
    State(state): State<NotificationsState>,
) -> Result<Json<Vec<WebhookResponse>>, PlatformError> {
    let subscriptions = state.service.list().await?;
    Ok(Json(subscriptions.into_iter().map(Into::into).collect()))
}

/// Get a webhook by id
#[utoipa::path(
    get,
    path = "/dashboard/v1/notifications/{id}",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "Webhook id")
    ),
    responses(
        (status = 200, description = "Webhook found", body = WebhookResponse),
        (status = 404, description = "Webhook not found", body = ErrorResponse)
    )
)]
pub async fn get_webhook(
    State(state): State<NotificationsState>,
    Path(id): Path<String>,
) -> Result<Json<WebhookResponse>, PlatformError> {
    let subscription = state.service.get(&id).await?;
    Ok(Json(subscription.into()))
}

/// Delete a webhook
#[utoipa::path(
    delete,
    path = "/dashboard/v1/notifications/{id}",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "Webhook id")
    ),
    responses(
        (status = 204, description = "Webhook deleted"),
        (status = 404, description = "Webhook not found", body = ErrorResponse)
    )
)]
pub async fn delete_webhook(
    State(state): State<NotificationsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn notifications_router(state: NotificationsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(register_webhook, list_webhooks))
        .routes(routes!(get_webhook, delete_webhook))
        .with_state(state)
}
