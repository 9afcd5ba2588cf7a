//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the security section is complete enough to run a gate at all
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GateConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("security.allowed_issuers must not be empty")]
    NoAllowedIssuers,

    #[error("exactly one key source must be configured (security.jwks_path or security.issuer_url)")]
    KeySourceMisconfigured,

    #[error("security.issuer_url '{0}' is not a valid http(s) URL")]
    InvalidIssuerUrl(String),

    #[error("security.issuer_url is set but both jwks and openid-configuration resolution are disabled")]
    NoResolutionMethod,

    #[error("security.clock_skew_tolerance_secs {0} exceeds the 300s bound")]
    SkewToleranceTooLarge(u64),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("security.refresh_timeout_secs must be greater than zero")]
    ZeroRefreshTimeout,

    #[error("security.refresh_interval_secs must be greater than zero")]
    ZeroRefreshInterval,
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let sec = &config.security;

    if sec.allowed_issuers.is_empty() {
        errors.push(ValidationError::NoAllowedIssuers);
    }

    match (&sec.jwks_path, &sec.issuer_url) {
        (Some(_), None) => {}
        (None, Some(url)) => {
            match url::Url::parse(url) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                _ => errors.push(ValidationError::InvalidIssuerUrl(url.clone())),
            }
            if !sec.jwks_enabled && !sec.openid_configuration_enabled {
                errors.push(ValidationError::NoResolutionMethod);
            }
        }
        _ => errors.push(ValidationError::KeySourceMisconfigured),
    }

    if sec.clock_skew_tolerance_secs > 300 {
        errors.push(ValidationError::SkewToleranceTooLarge(
            sec.clock_skew_tolerance_secs,
        ));
    }

    if sec.refresh_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRefreshTimeout);
    }

    if sec.refresh_interval_secs == 0 {
        errors.push(ValidationError::ZeroRefreshInterval);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> GateConfig {
        let mut config = GateConfig::default();
        config.listener.bind_address = "127.0.0.1:8080".into();
        config.security.allowed_issuers = vec!["https://idp.example".into()];
        config.security.jwks_path = Some("keys.json".into());
        config
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_default_config_as_incomplete() {
        let errors = validate_config(&GateConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::NoAllowedIssuers));
        assert!(errors.contains(&ValidationError::KeySourceMisconfigured));
    }

    #[test]
    fn rejects_both_key_sources() {
        let mut config = valid_config();
        config.security.issuer_url = Some("https://idp.example".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::KeySourceMisconfigured));
    }

    #[test]
    fn rejects_non_http_issuer_url() {
        let mut config = valid_config();
        config.security.jwks_path = None;
        config.security.issuer_url = Some("ftp://idp.example".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidIssuerUrl(_))));
    }

    #[test]
    fn rejects_remote_source_with_no_resolution_method() {
        let mut config = valid_config();
        config.security.jwks_path = None;
        config.security.issuer_url = Some("https://idp.example".into());
        config.security.jwks_enabled = false;
        config.security.openid_configuration_enabled = false;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::NoResolutionMethod));
    }

    #[test]
    fn rejects_zero_max_connections() {
        let mut config = valid_config();
        config.listener.max_connections = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroMaxConnections));
    }

    #[test]
    fn rejects_zero_refresh_interval() {
        let mut config = valid_config();
        config.security.refresh_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroRefreshInterval));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = GateConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
