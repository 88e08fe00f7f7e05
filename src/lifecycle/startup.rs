//! Startup orchestration.
//!
//! Subsystems initialise in order; any error is fatal and the listener is
//! bound last.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Error that prevents the relay from serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid address '{addr}': {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

fn parse_addr(addr: &str) -> Result<SocketAddr, StartupError> {
    addr.parse().map_err(|source| StartupError::Address {
        addr: addr.to_string(),
        source,
    })
}

/// Bring the relay up and serve until `shutdown` fires.
pub async fn start(config: ProxyConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    tracing::info!(
        target_url = %config.upstream.target,
        bind_address = %config.listener.bind_address,
        timeout_secs = config.upstream.timeout_secs,
        debug_mode = config.debug.enabled,
        "Configuration loaded"
    );
    if let Ok(json) = serde_json::to_string(&config) {
        tracing::debug!(config = %json, "Effective configuration");
    }

    if let Some(addr) = &config.observability.metrics_address {
        metrics::init_metrics(parse_addr(addr)?)?;
    }

    let bind_addr = parse_addr(&config.listener.bind_address)?;
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: bind_addr,
            source,
        })?;

    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
