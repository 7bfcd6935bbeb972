//! Endpoint Index
//!
//! Lists the service endpoints at the API root.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

pub const BASE_PATH: &str = "/dashboard/v1/";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointInfo {
    pub url: String,
    pub method: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    pub endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("registrations/", "POST", "Register a new dashboard configuration"),
    ("registrations/", "GET", "View all registered dashboard configurations"),
    ("registrations/{id}", "GET", "View a registered dashboard configuration"),
    ("registrations/{id}", "PUT", "Replace a registered dashboard configuration"),
    ("registrations/{id}", "PATCH", "Update parts of a registered dashboard configuration"),
    ("registrations/{id}", "DELETE", "Delete a registered dashboard configuration"),
    ("dashboards/{id}", "GET", "Retrieve a populated dashboard"),
    ("notifications/", "POST", "Register a webhook"),
    ("notifications/", "GET", "View all registered webhooks"),
    ("notifications/{id}", "GET", "View a registered webhook"),
    ("notifications/{id}", "DELETE", "Delete a webhook"),
    ("status/", "GET", "Monitor service availability"),
];

/// Service endpoints
#[utoipa::path(
    get,
    path = "/dashboard/v1/",
    tag = "index",
    responses(
        (status = 200, description = "Endpoint listing", body = IndexResponse)
    )
)]
pub async fn get_index() -> Json<IndexResponse> {
    let endpoints = ENDPOINTS
        .iter()
        .map(|(path, method, description)| EndpointInfo {
            url: format!("{BASE_PATH}{path}"),
            method: method.to_string(),
            description: description.to_string(),
        })
        .collect();

    Json(IndexResponse { endpoints })
}

pub fn index_router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(get_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_index_lists_every_api() {
        let Json(index) = get_index().await;
        assert_eq!(index.endpoints.len(), ENDPOINTS.len());
        assert!(index.endpoints.iter().all(|e| e.url.starts_with("/dashboard/v1/")));
        assert!(index
            .endpoints
            .iter()
            .any(|e| e.method == "PATCH" && e.url == "/dashboard/v1/registrations/{id}"));
    }
}
