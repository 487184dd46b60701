//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{parse_destinations, LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load defaults, then the optional TOML file, then environment overrides,
/// and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto `config`.
///
/// `lookup` abstracts `std::env::var` so the mapping can be tested without
/// touching the process environment.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup("APP_NAME") {
        config.service.name = name;
    }
    if let Some(addr) = lookup("APP_BIND_ADDRESS") {
        config.service.bind_address = addr;
    }
    if let Some(raw) = lookup("APP_URL_DESTINO") {
        config.destinations = parse_destinations(&raw);
    }
    if let Some(raw) = lookup("APP_ERRORS") {
        config.faults.error_percent = parse_env("APP_ERRORS", &raw)?;
    }
    if let Some(raw) = lookup("APP_LATENCY") {
        config.faults.max_latency_ms = parse_env("APP_LATENCY", &raw)?;
    }
    if let Some(endpoint) = lookup("OTLP_ENDPOINT") {
        config.observability.otlp_endpoint = endpoint.trim_end_matches('/').to_string();
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(raw) = lookup("LOG_FORMAT") {
        config.observability.log_format = match raw.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: "LOG_FORMAT",
                    value: raw,
                })
            }
        };
    }
    if let Some(raw) = lookup("METRICS_POLL_INTERVAL_MS") {
        config.observability.poll_interval_ms = parse_env("METRICS_POLL_INTERVAL_MS", &raw)?;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: raw.to_string(),
    })
}
