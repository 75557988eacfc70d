//! Configuration for the routing engine

use routing_types::{RoutingError, RoutingResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long an action waits for a busy document before giving up
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Fail routing when a responder is not in the directory
    #[serde(default = "default_true")]
    pub require_known_principals: bool,

    /// Audit configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            require_known_principals: true,
            audit: AuditConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Audit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Records kept per document, oldest evicted first; 0 means unbounded
    #[serde(default)]
    pub max_records_per_document: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_records_per_document: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `ROUTING_*` environment variables (`ROUTING_AUDIT__ENABLED` for
    /// nested keys)
    pub fn load(path: Option<&str>) -> RoutingResult<Self> {
        let mut builder = config::Config::builder();

        let defaults = config::Config::try_from(&EngineConfig::default()).map_err(config_error)?;
        builder = builder.add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ROUTING")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)
    }

    /// Parse an inline TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> RoutingResult<Self> {
        toml::from_str(source).map_err(|e| RoutingError::Config(e.to_string()))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// A configuration for tests: short lock timeout, lenient directory
    pub fn development() -> Self {
        Self {
            lock_timeout_ms: 250,
            require_known_principals: false,
            ..Default::default()
        }
    }
}

fn config_error(e: config::ConfigError) -> RoutingError {
    RoutingError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
        assert!(config.require_known_principals);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.max_records_per_document, 0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_toml_str() {
        let config = EngineConfig::from_toml_str(
            r#"
            lock_timeout_ms = 100

            [audit]
            max_records_per_document = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.lock_timeout_ms, 100);
        assert_eq!(config.audit.max_records_per_document, 50);
        assert!(config.audit.enabled);
        assert!(config.require_known_principals);

        assert!(matches!(
            EngineConfig::from_toml_str("lock_timeout_ms = \"soon\""),
            Err(RoutingError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "require_known_principals = false").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "json = true").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = EngineConfig::load(Some(&path)).unwrap();
        assert!(!config.require_known_principals);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = EngineConfig::load(Some("/nonexistent/routing.toml")).unwrap();
        assert_eq!(config.lock_timeout_ms, 5000);
    }
}
