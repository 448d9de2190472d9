//! Configuration for the payments service.
//!
//! Supports YAML file and environment variable overrides.

use serde::Deserialize;
use std::path::Path;

use crate::fees::FeeSchedule;

/// Processor environment a credential or identifier belongs to.
///
/// External identifiers (payout accounts, customers) are minted in one
/// environment and rejected by the other; every stored reference carries
/// this tag so cross-environment reuse is detected before it reaches the
/// processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Test,
    Live,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Live => "live",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// gRPC server binding.
    pub server: ServerConfig,
    /// Booking/profile document store.
    pub storage: StorageConfig,
    /// Payment processor credentials and environment.
    pub processor: ProcessorConfig,
    /// Fee schedule applied to new authorizations.
    pub fees: FeeSchedule,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port for the payments gRPC service.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50061,
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// MongoDB connection string.
    pub uri: String,
    /// Database holding the bookings and profiles collections.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "pawbook".to_string(),
        }
    }
}

/// Payment processor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Base URL of the processor REST API.
    pub base_url: String,
    /// Secret API key.
    pub secret_key: String,
    /// Which processor environment this deployment talks to.
    pub environment: Environment,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stripe.com".to_string(),
            secret_key: String::new(),
            environment: Environment::Test,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Defaults
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_string(),
            None => std::env::var("PAWBOOK_CONFIG").unwrap_or_else(|_| "config.yaml".to_string()),
        };

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(uri) = std::env::var("MONGODB_URI") {
            self.storage.uri = uri;
        }

        if let Ok(db) = std::env::var("MONGODB_DATABASE") {
            self.storage.database = db;
        }

        if let Ok(url) = std::env::var("PROCESSOR_BASE_URL") {
            self.processor.base_url = url;
        }

        if let Ok(key) = std::env::var("PROCESSOR_SECRET_KEY") {
            self.processor.secret_key = key;
        }

        if let Ok(env) = std::env::var("PROCESSOR_ENVIRONMENT") {
            match env.as_str() {
                "test" => self.processor.environment = Environment::Test,
                "live" => self.processor.environment = Environment::Live,
                _ => {}
            }
        }
    }

    /// Reject configurations that would fail on the first processor call.
    fn validate(&self) -> Result<(), ConfigError> {
        let key = &self.processor.secret_key;
        if key.starts_with("sk_test_") && self.processor.environment == Environment::Live {
            return Err(ConfigError::Invalid(
                "test-mode secret key configured for the live environment".to_string(),
            ));
        }
        if key.starts_with("sk_live_") && self.processor.environment == Environment::Test {
            return Err(ConfigError::Invalid(
                "live-mode secret key configured for the test environment".to_string(),
            ));
        }

        if self.fees.platform_fee_bps >= 10_000 {
            return Err(ConfigError::Invalid(format!(
                "platform fee of {} bps would consume the whole charge",
                self.fees.platform_fee_bps
            )));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.server.port, 50061);
        assert_eq!(config.processor.environment, Environment::Test);
        assert_eq!(config.fees.platform_fee_bps, 500);
    }

    #[test]
    fn parses_yaml_sections() {
        let yaml = r#"
server:
  port: 9090
processor:
  secret_key: sk_test_abc
  environment: test
fees:
  platform_fee_bps: 700
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.fees.platform_fee_bps, 700);
        // Unspecified sections keep their defaults.
        assert_eq!(config.storage.database, "pawbook");
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("SERVER_PORT", "7001");
        std::env::set_var("PROCESSOR_ENVIRONMENT", "live");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 7001);
        assert_eq!(config.processor.environment, Environment::Live);

        std::env::remove_var("SERVER_PORT");
        std::env::remove_var("PROCESSOR_ENVIRONMENT");
    }

    #[test]
    fn rejects_cross_environment_key() {
        let mut config = Config::default();
        config.processor.secret_key = "sk_test_abc".to_string();
        config.processor.environment = Environment::Live;
        assert!(config.validate().is_err());
    }
}
