//! Configuration loading from the command line and the environment.

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that switches on local debug mode.
pub const DEBUG_MODE_ENV: &str = "ENV";

/// Value of [`DEBUG_MODE_ENV`] that enables local debug mode.
pub const DEBUG_MODE_VALUE: &str = "local";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Raw values gathered at startup, before validation.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    pub target: Option<String>,
    pub bind_address: Option<String>,
    pub metrics_address: Option<String>,
    pub log_level: Option<String>,
    /// Value of the debug mode environment variable, if set.
    pub debug_mode: Option<String>,
}

/// True when the environment value selects local debug mode.
pub fn is_debug_mode(value: Option<&str>) -> bool {
    value == Some(DEBUG_MODE_VALUE)
}

/// Build and validate the configuration.
pub fn load_config(source: ConfigSource) -> Result<ProxyConfig, ConfigError> {
    let mut config = ProxyConfig::default();

    if let Some(target) = source.target {
        config.upstream.target = target.trim().to_string();
    }
    if let Some(bind_address) = source.bind_address {
        config.listener.bind_address = bind_address;
    }
    if let Some(log_level) = source.log_level {
        config.observability.log_level = log_level;
    }
    config.observability.metrics_address = source.metrics_address;
    config.debug.enabled = is_debug_mode(source.debug_mode.as_deref());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_mode_sentinel() {
        assert!(is_debug_mode(Some("local")));
        assert!(!is_debug_mode(Some("LOCAL")));
        assert!(!is_debug_mode(Some("production")));
        assert!(!is_debug_mode(Some("")));
        assert!(!is_debug_mode(None));
    }

    #[test]
    fn test_load_applies_overrides() {
        let config = load_config(ConfigSource {
            target: Some("http://127.0.0.1:3000".into()),
            bind_address: Some("127.0.0.1:9100".into()),
            metrics_address: Some("127.0.0.1:9102".into()),
            log_level: Some("debug".into()),
            debug_mode: Some("local".into()),
        })
        .unwrap();

        assert_eq!(config.upstream.target, "http://127.0.0.1:3000");
        assert_eq!(config.listener.bind_address, "127.0.0.1:9100");
        assert_eq!(config.observability.metrics_address.as_deref(), Some("127.0.0.1:9102"));
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.debug.enabled);
    }

    #[test]
    fn test_load_defaults() {
        let config = load_config(ConfigSource::default()).unwrap();
        assert_eq!(config.upstream.target, "https://api.openai.com");
        assert!(!config.debug.enabled);
    }

    #[test]
    fn test_empty_target_is_fatal() {
        let err = load_config(ConfigSource {
            target: Some("  ".into()),
            ..Default::default()
        })
        .unwrap_err();

        let ConfigError::Validation(errors) = &err;
        assert_eq!(errors, &vec![ValidationError::EmptyTarget]);
        assert!(err.to_string().contains("--domain"));
    }
}
