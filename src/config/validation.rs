//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, ports valid)
//! - Check that URLs, origins and addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must not be 0")]
    ZeroPort,

    #[error("upstream.url is not a valid http(s) URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("uploads.{0} must be greater than 0")]
    ZeroLimit(&'static str),

    #[error("uploads.{0} must not be empty")]
    Empty(&'static str),

    #[error("uploads.allowed_mime_types contains an invalid entry: {0}")]
    InvalidMimeType(String),

    #[error("cors.allowed_origins contains an invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("rate_limit.{0} must be greater than 0 when rate limiting is enabled")]
    ZeroRateLimit(&'static str),

    #[error("observability.metrics_address is not a socket address: {0}")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    // Placeholder URLs are fine; they select local mode.
    if let Some(raw) = config.upstream.forward_url() {
        match url::Url::parse(raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
            _ => errors.push(ValidationError::InvalidUpstreamUrl(raw.to_string())),
        }
    }

    let uploads = &config.uploads;
    if uploads.max_files == 0 {
        errors.push(ValidationError::ZeroLimit("max_files"));
    }
    if uploads.max_file_size == 0 {
        errors.push(ValidationError::ZeroLimit("max_file_size"));
    }
    if uploads.field_name.trim().is_empty() {
        errors.push(ValidationError::Empty("field_name"));
    }
    if uploads.scratch_dir.trim().is_empty() {
        errors.push(ValidationError::Empty("scratch_dir"));
    }
    if uploads.allowed_mime_types.is_empty() {
        errors.push(ValidationError::Empty("allowed_mime_types"));
    }
    for mime in &uploads.allowed_mime_types {
        if !is_mime_essence(mime) {
            errors.push(ValidationError::InvalidMimeType(mime.clone()));
        }
    }

    for origin in &config.cors.allowed_origins {
        if origin != "*" && HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroRateLimit("max_requests"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroRateLimit("window_secs"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `type/subtype` with no parameters or whitespace.
fn is_mime_essence(value: &str) -> bool {
    let mut parts = value.split('/');
    let (Some(kind), Some(subtype), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let valid = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'))
    };
    valid(kind) && valid(subtype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = RelayConfig::default();
        config.listener.port = 0;
        config.uploads.max_files = 0;
        config.uploads.allowed_mime_types = vec!["text/plain; charset=utf-8".into()];
        config.rate_limit.window_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroPort,
                ValidationError::ZeroLimit("max_files"),
                ValidationError::InvalidMimeType("text/plain; charset=utf-8".into()),
                ValidationError::ZeroRateLimit("window_secs"),
            ]
        );
    }

    #[test]
    fn rejects_non_http_upstream() {
        let mut config = RelayConfig::default();
        config.upstream.url = Some("ftp://files.acme.io/drop".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidUpstreamUrl(_)));
    }

    #[test]
    fn disabled_rate_limit_skips_its_checks() {
        let mut config = RelayConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_requests = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn mime_essence_shape() {
        assert!(is_mime_essence("application/vnd.ms-excel"));
        assert!(is_mime_essence("image/svg+xml"));
        assert!(!is_mime_essence("image"));
        assert!(!is_mime_essence("a/b/c"));
        assert!(!is_mime_essence("/png"));
    }
}
