//! # Observability Configuration
//!
//! Environment-specific configuration for logging and metrics.

use std::env;

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the ocr_prep crate
    pub log_level: String,
    /// Explicit log format ("pretty" or "json"); derived from the environment when unset
    pub log_format: Option<String>,
    /// Whether to install the Prometheus metrics recorder
    pub enable_metrics: bool,
    /// File the rendered metrics snapshot is written to at exit
    pub metrics_dump_path: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: None,
            enable_metrics: true,
            metrics_dump_path: None,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").ok(),
            enable_metrics: env::var("ENABLE_METRICS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            metrics_dump_path: env::var("METRICS_DUMP_PATH").ok().filter(|p| !p.trim().is_empty()),
        }
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Pretty output for development unless a format is forced
    pub fn use_pretty_logs(&self) -> bool {
        match self.log_format.as_deref() {
            Some(format) => format.eq_ignore_ascii_case("pretty"),
            None => self.is_development(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(format!("Invalid log level: {}", self.log_level));
        }

        if let Some(format) = &self.log_format {
            if !format.eq_ignore_ascii_case("pretty") && !format.eq_ignore_ascii_case("json") {
                return Err(format!("Invalid log format: {}", format));
            }
        }

        if self.metrics_dump_path.is_some() && !self.enable_metrics {
            return Err("METRICS_DUMP_PATH is set but metrics are disabled".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(config.use_pretty_logs());
    }

    #[test]
    fn test_log_format_override() {
        let config = ObservabilityConfig {
            environment: "production".to_string(),
            log_format: Some("pretty".to_string()),
            ..Default::default()
        };
        assert!(config.use_pretty_logs());

        let config = ObservabilityConfig {
            log_format: Some("json".to_string()),
            ..Default::default()
        };
        assert!(!config.use_pretty_logs());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ObservabilityConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ObservabilityConfig {
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ObservabilityConfig {
            enable_metrics: false,
            metrics_dump_path: Some("/tmp/metrics.prom".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
