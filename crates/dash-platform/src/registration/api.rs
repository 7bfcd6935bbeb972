//! Dashboard Registrations API
//!
//! CRUD over dashboard configurations. Every successful write fires the
//! matching webhook event for the registration's country.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use dash_notify::subscription::timestamp_now;
use dash_notify::{CountryLookup, EventKind, IdAllocator, Notifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::entity::{normalize_currencies, Features, Registration};
use super::repository::RegistrationRepository;
use crate::error::{ErrorResponse, PlatformError};
use crate::fire_event;

/// Feature flags as submitted; every field is required
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeaturesRequest {
    pub temperature: Option<bool>,
    pub precipitation: Option<bool>,
    pub capital: Option<bool>,
    pub coordinates: Option<bool>,
    pub population: Option<bool>,
    pub area: Option<bool>,
    pub target_currencies: Option<Vec<String>>,
}

/// Create, replace or patch registration request.
///
/// On PATCH empty strings and absent features keep the stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub country: String,

    #[serde(default)]
    pub iso_code: String,

    #[serde(default)]
    pub features: FeaturesRequest,
}

/// Checked registration content, without id or timestamp
#[derive(Debug, PartialEq, Eq)]
struct RegistrationContent {
    country: String,
    iso_code: String,
    features: Features,
}

impl RegistrationRequest {
    fn validate(self) -> Result<RegistrationContent, PlatformError> {
        let country = self.country.trim().to_string();
        let iso_code = self.iso_code.trim().to_ascii_uppercase();

        if country.is_empty() && iso_code.is_empty() {
            return Err(PlatformError::bad_request(
                "Fields 'country' and 'isoCode' are empty",
            ));
        }

        let f = self.features;
        let mut missing = Vec::new();
        if country.is_empty() {
            missing.push("country");
        }
        if iso_code.is_empty() {
            missing.push("isoCode");
        }
        for (name, present) in [
            ("temperature", f.temperature.is_some()),
            ("precipitation", f.precipitation.is_some()),
            ("capital", f.capital.is_some()),
            ("coordinates", f.coordinates.is_some()),
            ("population", f.population.is_some()),
            ("area", f.area.is_some()),
            (
                "targetCurrencies",
                f.target_currencies.as_ref().is_some_and(|c| !c.is_empty()),
            ),
        ] {
            if !present {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(PlatformError::bad_request(format!(
                "Missing fields: {}",
                missing.join(", ")
            )));
        }

        check_iso_format(&iso_code)?;

        Ok(RegistrationContent {
            country,
            iso_code,
            features: Features {
                temperature: f.temperature.unwrap_or_default(),
                precipitation: f.precipitation.unwrap_or_default(),
                capital: f.capital.unwrap_or_default(),
                coordinates: f.coordinates.unwrap_or_default(),
                population: f.population.unwrap_or_default(),
                area: f.area.unwrap_or_default(),
                target_currencies: normalize_currencies(&f.target_currencies.unwrap_or_default()),
            },
        })
    }

    /// Overlay the supplied fields on a stored registration
    fn merge_into(self, stored: &Registration) -> Result<RegistrationContent, PlatformError> {
        let country = match self.country.trim() {
            "" => stored.country.clone(),
            country => country.to_string(),
        };
        let iso_code = match self.iso_code.trim() {
            "" => stored.iso_code.clone(),
            iso_code => iso_code.to_ascii_uppercase(),
        };
        check_iso_format(&iso_code)?;

        let f = self.features;
        let current = &stored.features;
        let target_currencies = match f.target_currencies {
            Some(codes) if !codes.is_empty() => normalize_currencies(&codes),
            _ => current.target_currencies.clone(),
        };

        Ok(RegistrationContent {
            country,
            iso_code,
            features: Features {
                temperature: f.temperature.unwrap_or(current.temperature),
                precipitation: f.precipitation.unwrap_or(current.precipitation),
                capital: f.capital.unwrap_or(current.capital),
                coordinates: f.coordinates.unwrap_or(current.coordinates),
                population: f.population.unwrap_or(current.population),
                area: f.area.unwrap_or(current.area),
                target_currencies,
            },
        })
    }
}

fn check_iso_format(iso_code: &str) -> Result<(), PlatformError> {
    if iso_code.len() != 2 || !iso_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PlatformError::bad_request(format!(
            "isoCode '{iso_code}' is not a two letter country code"
        )));
    }
    Ok(())
}

/// Registrations are only stored for countries the lookup knows
async fn ensure_known_country(
    countries: &dyn CountryLookup,
    iso_code: &str,
) -> Result<(), PlatformError> {
    match countries.resolve(iso_code).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(PlatformError::bad_request(format!(
            "isoCode '{iso_code}' does not match a known country"
        ))),
        Err(e) => Err(PlatformError::internal(format!("Country lookup failed: {e}"))),
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCreatedResponse {
    pub id: String,
    pub last_change: String,
}

/// Registration response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub country: String,
    pub iso_code: String,
    pub features: Features,
    pub last_change: String,
}

impl From<Registration> for RegistrationResponse {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            country: r.country,
            iso_code: r.iso_code,
            features: r.features,
            last_change: r.last_change,
        }
    }
}

#[derive(Clone)]
pub struct RegistrationsState {
    pub repo: Arc<dyn RegistrationRepository>,
    pub notifier: Arc<Notifier>,
    pub countries: Arc<dyn CountryLookup>,
    pub ids: IdAllocator,
}

/// Register a dashboard configuration
#[utoipa::path(
    post,
    path = "/dashboard/v1/registrations/",
    tag = "registrations",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Registration created", body = RegistrationCreatedResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn create_registration(
    State(state): State<RegistrationsState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationCreatedResponse>), PlatformError> {
    let Json(req) = payload?;
    let content = req.validate()?;
    ensure_known_country(state.countries.as_ref(), &content.iso_code).await?;

    let id = state.ids.allocate(state.repo.as_ref()).await?;
    let registration = Registration::new(
        id,
        content.country,
        content.iso_code,
        content.features,
        timestamp_now(),
    );
    state.repo.insert(&registration).await?;
    info!(registration_id = %registration.id, iso_code = %registration.iso_code, "Dashboard registered");

    fire_event(&state.notifier, EventKind::Register, &registration.iso_code).await;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationCreatedResponse {
            id: registration.id,
            last_change: registration.last_change,
        }),
    ))
}

/// List all dashboard configurations
#[utoipa::path(
    get,
    path = "/dashboard/v1/registrations/",
    tag = "registrations",
    responses(
        (status = 200, description = "Registrations", body = Vec<RegistrationResponse>)
    )
)]
pub async fn list_registrations(
    State(state): State<RegistrationsState>,
) -> Result<Json<Vec<RegistrationResponse>>, PlatformError> {
    let registrations = state.repo.find_all().await?;
    Ok(Json(registrations.into_iter().map(Into::into).collect()))
}

/// Get a dashboard configuration
#[utoipa::path(
    get,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    responses(
        (status = 200, description = "Registration found", body = RegistrationResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse)
    )
)]
pub async fn get_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>, PlatformError> {
    let registration = state
        .repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Registration", &id))?;
    Ok(Json(registration.into()))
}

/// Replace a dashboard configuration
#[utoipa::path(
    put,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    request_body = RegistrationRequest,
    responses(
        (status = 200, description = "Registration updated", body = RegistrationResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse)
    )
)]
pub async fn update_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<RegistrationResponse>, PlatformError> {
    let Json(req) = payload?;
    let content = req.validate()?;
    ensure_known_country(state.countries.as_ref(), &content.iso_code).await?;

    let registration = Registration::new(
        id,
        content.country,
        content.iso_code,
        content.features,
        timestamp_now(),
    );
    if !state.repo.replace(&registration).await? {
        return Err(PlatformError::not_found("Registration", registration.id));
    }
    info!(registration_id = %registration.id, iso_code = %registration.iso_code, "Dashboard updated");

    fire_event(&state.notifier, EventKind::Change, &registration.iso_code).await;

    Ok(Json(registration.into()))
}

/// Partially update a dashboard configuration
#[utoipa::path(
    patch,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    request_body = RegistrationRequest,
    responses(
        (status = 200, description = "Registration updated", body = RegistrationResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Registration not found", body = ErrorResponse)
    )
)]
pub async fn patch_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<RegistrationResponse>, PlatformError> {
    let Json(req) = payload?;
    let stored = state
        .repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Registration", &id))?;

    let content = req.merge_into(&stored)?;
    ensure_known_country(state.countries.as_ref(), &content.iso_code).await?;

    let registration = Registration::new(
        stored.id,
        content.country,
        content.iso_code,
        content.features,
        timestamp_now(),
    );
    if !state.repo.replace(&registration).await? {
        return Err(PlatformError::not_found("Registration", registration.id));
    }
    info!(registration_id = %registration.id, iso_code = %registration.iso_code, "Dashboard patched");

    fire_event(&state.notifier, EventKind::Change, &registration.iso_code).await;

    Ok(Json(registration.into()))
}

/// Delete a dashboard configuration
#[utoipa::path(
    delete,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    responses(
        (status = 204, description = "Registration deleted"),
        (status = 404, description = "Registration not found", body = ErrorResponse)
    )
)]
pub async fn delete_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    let registration = state
        .repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Registration", &id))?;

    if !state.repo.delete_by_id(&id).await? {
        return Err(PlatformError::not_found("Registration", id));
    }
    info!(registration_id = %id, "Dashboard deleted");

    fire_event(&state.notifier, EventKind::Delete, &registration.iso_code).await;

    Ok(StatusCode::NO_CONTENT)
}

pub fn registrations_router(state: RegistrationsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_registration, list_registrations))
        .routes(routes!(
            get_registration,
            update_registration,
            patch_registration,
            delete_registration
        ))
        .with_state(state)
}
