//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "dashboard.toml",
    "./config/config.toml",
    "/etc/dashboard/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching defaults");
        }

        if let Ok(path) = env::var("DASHBOARD_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(val) = lookup(key) {
        match val.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(key, value = %val, "Ignoring unparseable environment override"),
        }
    }
}

/// Apply `DASHBOARD_*` overrides read through `lookup`.
///
/// `PORT` is honoured as well and loses to `DASHBOARD_HTTP_PORT` when both are set.
pub(crate) fn apply_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    // HTTP
    parse_into(&lookup, "PORT", &mut config.http.port);
    parse_into(&lookup, "DASHBOARD_HTTP_PORT", &mut config.http.port);
    if let Some(val) = lookup("DASHBOARD_HTTP_HOST") {
        config.http.host = val;
    }

    // MongoDB
    if let Some(val) = lookup("DASHBOARD_MONGODB_URI") {
        config.mongodb.uri = val;
    }
    if let Some(val) = lookup("DASHBOARD_MONGODB_DATABASE") {
        config.mongodb.database = val;
    }

    // Storage
    if let Some(val) = lookup("DASHBOARD_STORAGE_BACKEND") {
        config.storage.backend = val.parse()?;
    }

    // Notifications
    let n = &mut config.notifications;
    parse_into(&lookup, "DASHBOARD_ID_LENGTH", &mut n.id_length);
    parse_into(&lookup, "DASHBOARD_MAX_ID_ATTEMPTS", &mut n.max_id_attempts);
    parse_into(&lookup, "DASHBOARD_DELIVERY_TIMEOUT_SECS", &mut n.delivery_timeout_secs);
    parse_into(&lookup, "DASHBOARD_CONNECT_TIMEOUT_SECS", &mut n.connect_timeout_secs);
    parse_into(&lookup, "DASHBOARD_MAX_IN_FLIGHT", &mut n.max_in_flight);
    parse_into(&lookup, "DASHBOARD_SHUTDOWN_GRACE_SECS", &mut n.shutdown_grace_secs);
    parse_into(&lookup, "DASHBOARD_PROBE_TIMEOUT_SECS", &mut n.probe_timeout_secs);

    // Countries
    if let Some(val) = lookup("DASHBOARD_COUNTRIES_API") {
        config.countries.api_base_url = val;
    }

    Ok(())
}
