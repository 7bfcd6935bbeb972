//! Dashboard Service Server
//!
//! Serves the dashboard REST APIs under `/dashboard/v1` and delivers
//! webhook notifications for registration events.
//!
//! ## Configuration
//!
//! Read from `config.toml` (or `DASHBOARD_CONFIG`), then overridden by
//! environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` / `DASHBOARD_HTTP_PORT` | `8080` | HTTP port |
//! | `DASHBOARD_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `DASHBOARD_MONGODB_DATABASE` | `dashboard` | MongoDB database name |
//! | `DASHBOARD_STORAGE_BACKEND` | `mongodb` | `mongodb` or `memory` |
//! | `DASHBOARD_COUNTRIES_API` | REST Countries v3.1 | Country lookup base URL |
//! | `LOG_FORMAT` | `text` | `json` for structured output |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

use dash_config::{AppConfig, StorageBackend};
use dash_notify::{
    Dispatcher, DispatcherConfig, EventMatcher, HttpUrlProbe, IdAllocator,
    InMemorySubscriptionStore, MongoSubscriptionStore, Notifier, RestCountriesLookup,
    SubscriptionService, SubscriptionStore, SubscriptionValidator, UrlProbe,
};
use dash_platform::{
    platform_router, DashboardsState, InMemoryRegistrationRepository,
    MongoRegistrationRepository, NotificationsState, PlatformState, RegistrationRepository,
    RegistrationsState, StatusState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dash_common::logging::init_logging("dash-server");

    info!("Starting Dashboard Service");
    let started_at = Instant::now();

    let config = AppConfig::load()?;
    let (subscriptions, registrations) = open_stores(&config).await?;

    let n = &config.notifications;
    let ids = IdAllocator::new(n.id_length, n.max_id_attempts);

    let probe: Arc<dyn UrlProbe> = Arc::new(HttpUrlProbe::new(n.probe_timeout())?);
    let countries = Arc::new(RestCountriesLookup::new(
        config.countries.api_base_url.clone(),
        n.probe_timeout(),
    )?);
    let validator = SubscriptionValidator::new(probe.clone(), countries.clone());
    let service = Arc::new(SubscriptionService::new(subscriptions.clone(), validator, ids));

    let dispatcher = Arc::new(Dispatcher::new(DispatcherConfig {
        request_timeout: n.delivery_timeout(),
        connect_timeout: n.connect_timeout(),
        max_in_flight: n.max_in_flight,
    })?);
    let notifier = Arc::new(Notifier::new(
        EventMatcher::new(subscriptions),
        dispatcher.clone(),
    ));
    info!(
        max_in_flight = n.max_in_flight,
        delivery_timeout_secs = n.delivery_timeout_secs,
        "Webhook dispatcher initialized"
    );

    let state = PlatformState {
        notifications: NotificationsState { service: service.clone() },
        registrations: RegistrationsState {
            repo: registrations.clone(),
            notifier: notifier.clone(),
            countries,
            ids,
        },
        dashboards: DashboardsState {
            repo: registrations,
            notifier,
        },
        status: StatusState {
            subscriptions: service,
            probe,
            countries_api_url: config.countries.api_base_url.clone(),
            started_at,
        },
    };

    let (router, mut openapi) = platform_router(state).split_for_parts();
    openapi.info.title = "Dashboard Service API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description =
        Some("Dashboard configurations, dashboards and webhook notifications".to_string());

    let app = Router::new()
        .merge(router)
        .route("/health", get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = config.http.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Dashboard Service listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining webhook deliveries");
    dispatcher.shutdown(n.shutdown_grace()).await;

    info!("Dashboard Service shutdown complete");
    Ok(())
}

async fn open_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn SubscriptionStore>, Arc<dyn RegistrationRepository>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            Ok((
                Arc::new(InMemorySubscriptionStore::new()),
                Arc::new(InMemoryRegistrationRepository::new()),
            ))
        }
        StorageBackend::Mongodb => {
            let mongo = &config.mongodb;
            info!("Connecting to MongoDB: {}/{}", mongo.uri, mongo.database);
            let client = mongodb::Client::with_uri_str(&mongo.uri).await?;
            let db = client.database(&mongo.database);
            Ok((
                Arc::new(MongoSubscriptionStore::with_collection(&db, &mongo.webhooks_collection)),
                Arc::new(MongoRegistrationRepository::with_collection(
                    &db,
                    &mongo.registrations_collection,
                )),
            ))
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
