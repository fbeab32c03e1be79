//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Service
    if let Err(e) = validate_log_level(&config.service.log_level) {
        errors.push(e);
    }

    if config.service.metrics_port == 0 {
        errors.push(ValidationError::new(
            "service.metrics_port",
            "metrics port must be greater than 0",
        ));
    }

    // Engine
    if config.engine.slack_buffer_minutes < 0 {
        errors.push(ValidationError::new(
            "engine.slack_buffer_minutes",
            "slack buffer cannot be negative",
        ));
    }

    if let Some(radius) = config.engine.prefilter_radius_meters {
        if radius.is_nan() || radius <= 0.0 {
            errors.push(ValidationError::new(
                "engine.prefilter_radius_meters",
                "prefilter radius must be greater than 0",
            ));
        }
    }

    // Provider
    if config.provider.endpoint.is_empty() {
        errors.push(ValidationError::new(
            "provider.endpoint",
            "provider endpoint is required",
        ));
    } else if let Err(e) = validate_url(&config.provider.endpoint) {
        errors.push(ValidationError::new("provider.endpoint", e));
    }

    if config.provider.api_key_env.is_empty() {
        errors.push(ValidationError::new(
            "provider.api_key_env",
            "API key environment variable name is required",
        ));
    }

    if config.provider.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "provider.timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.provider.fallback_speed_kmh <= 0.0 {
        errors.push(ValidationError::new(
            "provider.fallback_speed_kmh",
            "must be greater than 0",
        ));
    }

    // Store
    if !config.store.in_memory && config.store.database_path.is_empty() {
        errors.push(ValidationError::new(
            "store.database_path",
            "database path is required unless the store is in-memory",
        ));
    }

    // Channel
    if config.channel.capacity == 0 {
        errors.push(ValidationError::new(
            "channel.capacity",
            "must be greater than 0",
        ));
    }

    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok(())
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "service.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
