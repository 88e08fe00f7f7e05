//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits so the effective configuration can be logged
//! and so every section carries its defaults in one place.

use serde::{Deserialize, Serialize};

/// Default upstream the relay forwards to.
pub const DEFAULT_TARGET: &str = "https://api.openai.com";

/// Local intercepting proxy used in debug mode.
pub const DEFAULT_DEBUG_PROXY_URL: &str = "http://127.0.0.1:10809";

/// Root configuration for the relay.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Local debug mode (intercepting proxy, relaxed TLS).
    pub debug: DebugConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9001".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute base URL of the upstream (e.g., "https://api.openai.com").
    /// The rewritten request path is appended to it verbatim.
    pub target: String,

    /// Connect + response-header timeout in seconds.
    /// Body streaming is not bounded by this value.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            timeout_secs: 300,
        }
    }
}

/// Local debug mode configuration.
///
/// Never enabled by default. When enabled, outbound traffic goes through
/// `proxy_url` and upstream certificates are NOT verified.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub proxy_url: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            proxy_url: DEFAULT_DEBUG_PROXY_URL.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus scrape endpoint bind address. No exporter when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
