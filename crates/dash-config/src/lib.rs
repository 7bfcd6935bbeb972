//! Dashboard Configuration
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub countries: CountriesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub webhooks_collection: String,
    pub registrations_collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "dashboard".to_string(),
            webhooks_collection: "webhooks".to_string(),
            registrations_collection: "dashboards".to_string(),
        }
    }
}

/// Which store backs subscriptions and registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongodb,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::Mongodb),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::ValidationError(format!(
                "unknown storage backend '{}', expected mongodb or memory",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Mongodb,
        }
    }
}

/// Webhook registration and delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Length of generated subscription and registration ids
    pub id_length: usize,
    /// Draws before id allocation gives up
    pub max_id_attempts: u32,
    pub delivery_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Upper bound on concurrently running deliveries
    pub max_in_flight: usize,
    pub shutdown_grace_secs: u64,
    /// Timeout for the reachability probe made at registration time
    pub probe_timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            id_length: 5,
            max_id_attempts: 10,
            delivery_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_in_flight: 64,
            shutdown_grace_secs: 5,
            probe_timeout_secs: 5,
        }
    }
}

impl NotificationConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// External country registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountriesConfig {
    pub api_base_url: String,
}

impl Default for CountriesConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://129.241.150.113:8080/v3.1".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.notifications;
        if n.id_length == 0 {
            return Err(ConfigError::ValidationError("notifications.id_length must be positive".into()));
        }
        if n.max_id_attempts == 0 {
            return Err(ConfigError::ValidationError("notifications.max_id_attempts must be positive".into()));
        }
        if n.max_in_flight == 0 {
            return Err(ConfigError::ValidationError("notifications.max_in_flight must be positive".into()));
        }
        if n.delivery_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("notifications.delivery_timeout_secs must be positive".into()));
        }
        if self.countries.api_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("countries.api_base_url is required".into()));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Dashboard service configuration
# DASHBOARD_* environment variables override these settings

[http]
port = 8080
host = "0.0.0.0"

[mongodb]
uri = "mongodb://localhost:27017"
database = "dashboard"
webhooks_collection = "webhooks"
registrations_collection = "dashboards"

[storage]
backend = "mongodb"  # mongodb or memory

[notifications]
id_length = 5
max_id_attempts = 10
delivery_timeout_secs = 10
connect_timeout_secs = 5
max_in_flight = 64
shutdown_grace_secs = 5
probe_timeout_secs = 5

[countries]
api_base_url = "http://129.241.150.113:8080/v3.1"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.notifications.id_length, 5);
        assert_eq!(config.storage.backend, StorageBackend::Mongodb);
        assert_eq!(config.http.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_example_toml_round_trips_to_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(parsed.http.port, defaults.http.port);
        assert_eq!(parsed.mongodb.webhooks_collection, defaults.mongodb.webhooks_collection);
        assert_eq!(parsed.notifications.max_in_flight, defaults.notifications.max_in_flight);
        assert_eq!(parsed.countries.api_base_url, defaults.countries.api_base_url);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[notifications]\nmax_in_flight = 8\n\n[storage]\nbackend = \"memory\"").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.notifications.max_in_flight, 8);
        assert_eq!(config.notifications.id_length, 5);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.notifications.max_in_flight = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AppConfig::default();
        config.notifications.id_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("Mongo".parse::<StorageBackend>().unwrap(), StorageBackend::Mongodb);
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("firestore".parse::<StorageBackend>().is_err());
    }
}
