//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URL shapes.
//! Validation is a pure function that returns every problem it finds, not
//! just the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("error_percent must be within 0..=100, got {0}")]
    ErrorPercent(u8),

    #[error("invalid destination URL '{url}': {reason}")]
    Destination { url: String, reason: String },

    #[error("invalid OTLP endpoint '{url}': {reason}")]
    OtlpEndpoint { url: String, reason: String },

    #[error("poll_interval_ms must be greater than zero")]
    PollInterval,
}

/// Check a loaded configuration before it is accepted.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    if config.service.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.service.bind_address.clone()));
    }

    if config.faults.error_percent > 100 {
        errors.push(ValidationError::ErrorPercent(config.faults.error_percent));
    }

    for destination in &config.destinations {
        if let Err(reason) = check_http_url(destination) {
            errors.push(ValidationError::Destination {
                url: destination.clone(),
                reason,
            });
        }
    }

    let endpoint = &config.observability.otlp_endpoint;
    if !endpoint.is_empty() {
        if let Err(reason) = check_http_url(endpoint) {
            errors.push(ValidationError::OtlpEndpoint {
                url: endpoint.clone(),
                reason,
            });
        }
    }

    if config.observability.poll_interval_ms == 0 {
        errors.push(ValidationError::PollInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
