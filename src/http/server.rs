//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request tracing)
//! - Serve on a bound listener until shutdown
//! - Hand every request to the forwarder and mirror the upstream response

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::request::RequestId;
use crate::http::response::mirror_upstream;
use crate::observability::metrics;
use crate::upstream::{Forwarder, TransportError, TransportPolicy};

/// Error raised while assembling the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid upstream target: {0}")]
    Target(#[from] url::ParseError),
}

/// Application state injected into handlers.
///
/// Read-only after startup; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The transport policy is resolved here, once; the handler only ever sees
    /// the resulting dispatcher.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let policy = TransportPolicy::from_config(&config);
        let dispatcher = policy.build_dispatcher(Duration::from_secs(config.upstream.timeout_secs))?;
        let forwarder = Forwarder::new(&config.upstream, dispatcher)?;
        Ok(Self::with_forwarder(config, forwarder))
    }

    /// Create a server around an existing forwarder.
    pub fn with_forwarder(config: ProxyConfig, forwarder: Forwarder) -> Self {
        Self {
            router: Self::build_router(AppState { forwarder }),
            config: Arc::new(config),
        }
    }

    /// Build the Axum router: every path and every method goes to the proxy.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until the
    /// shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.target,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Forwards the request and streams the upstream response back.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = RequestId::new();

    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let request_target = parts.uri.to_string();

    match state
        .forwarder
        .forward(request_id, parts.method, &request_target, &parts.headers, body)
        .await
    {
        Ok(upstream) => {
            let status = upstream.status();
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %parts.uri.path(),
                status = status.as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Upstream responded"
            );
            metrics::record_request(&method, status.as_u16(), start_time);
            mirror_upstream(upstream, request_id)
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %parts.uri.path(),
                kind = e.kind(),
                error = %e,
                "Proxy request failed"
            );
            metrics::record_upstream_error(&method, e.kind());
            e.into_response()
        }
    }
}
