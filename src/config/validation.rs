//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject an empty or non-absolute upstream target
//! - Validate value ranges (timeout > 0, bind address parses)
//!
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No upstream target was given.
    EmptyTarget,
    /// The upstream target is not an absolute http(s) URL.
    InvalidTarget { target: String, reason: String },
    /// The header timeout is zero.
    ZeroTimeout,
    /// The bind address is not a socket address.
    InvalidBindAddress(String),
    /// The debug proxy URL does not parse.
    InvalidDebugProxy(String),
    /// The metrics address is not a socket address.
    InvalidMetricsAddress(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyTarget => {
                write!(f, "no target domain given, provide one with '--domain'")
            }
            ValidationError::InvalidTarget { target, reason } => {
                write!(f, "invalid target '{}': {}", target, reason)
            }
            ValidationError::ZeroTimeout => write!(f, "upstream timeout must be greater than zero"),
            ValidationError::InvalidBindAddress(addr) => write!(f, "invalid bind address '{}'", addr),
            ValidationError::InvalidDebugProxy(url) => write!(f, "invalid debug proxy url '{}'", url),
            ValidationError::InvalidMetricsAddress(addr) => {
                write!(f, "invalid metrics address '{}'", addr)
            }
        }
    }
}

/// Validate a configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let target = config.upstream.target.trim();
    if target.is_empty() {
        errors.push(ValidationError::EmptyTarget);
    } else {
        match Url::parse(target) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                errors.push(ValidationError::InvalidTarget {
                    target: target.to_string(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::InvalidTarget {
                    target: target.to_string(),
                    reason: "missing host".to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidTarget {
                target: target.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if config.debug.enabled && Url::parse(&config.debug.proxy_url).is_err() {
        errors.push(ValidationError::InvalidDebugProxy(config.debug.proxy_url.clone()));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let mut config = ProxyConfig::default();
        config.upstream.target = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyTarget]);
    }

    #[test]
    fn test_relative_and_foreign_targets_rejected() {
        let mut config = ProxyConfig::default();
        config.upstream.target = "api.openai.com".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::InvalidTarget { .. }
        ));

        config.upstream.target = "ftp://files.example.com".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::InvalidTarget { .. }
        ));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = ProxyConfig::default();
        config.upstream.target = String::new();
        config.upstream.timeout_secs = 0;
        config.listener.bind_address = "nowhere".into();
        config.observability.metrics_address = Some("also-nowhere".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_debug_proxy_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.debug.proxy_url = "not a url".into();
        assert!(validate_config(&config).is_ok());

        config.debug.enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidDebugProxy("not a url".into())]
        );
    }
}
