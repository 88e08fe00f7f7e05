//! Outbound transport policy.
//!
//! The policy is resolved once from the configuration and turned into a
//! [`Dispatcher`]. The request path only ever sees the dispatcher.
//!
//! Neither transport adds headers of its own. `Host` is set by the forwarder;
//! everything else on the wire came from the inbound request.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, Uri},
};
use hyper::body::Incoming;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
};
use tokio::net::TcpStream;
use url::Url;

use crate::config::ProxyConfig;
use crate::http::response::ProxyError;

/// How outbound connections are made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportPolicy {
    /// Connect straight to the upstream, verifying its certificate.
    Direct,
    /// Go through a local intercepting proxy and accept any certificate.
    /// Development inspection only.
    DebugProxy { proxy_url: String },
}

/// Error raised while building the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid debug proxy '{url}': {reason}")]
    Proxy { url: String, reason: String },

    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
}

impl TransportPolicy {
    /// Resolve the policy from an already validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Self {
        if config.debug.enabled {
            Self::DebugProxy {
                proxy_url: config.debug.proxy_url.clone(),
            }
        } else {
            Self::Direct
        }
    }

    /// Build the dispatcher for this policy.
    ///
    /// Only the connect phase is bounded here; waiting for response headers is
    /// bounded by the forwarder and the body is never bounded, so long streamed
    /// completions are not cut off.
    pub fn build_dispatcher(&self, connect_timeout: Duration) -> Result<Dispatcher, TransportError> {
        match self {
            Self::Direct => {
                let mut http = HttpConnector::new();
                http.enforce_http(false);
                http.set_connect_timeout(Some(connect_timeout));

                let tls = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
                let https = HttpsConnector::from((http, tls));
                let client = Client::builder(TokioExecutor::new())
                    .retry_canceled_requests(false)
                    .build(https);
                Ok(Dispatcher::Direct(client))
            }
            Self::DebugProxy { proxy_url } => {
                let proxy_addr = proxy_authority(proxy_url)?;
                let tls = native_tls::TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?;
                tracing::warn!(
                    proxy = %proxy_url,
                    "Local debug mode: routing upstream traffic through proxy, TLS verification disabled"
                );
                Ok(Dispatcher::DebugProxy(DebugProxy {
                    proxy_addr,
                    tls: tokio_native_tls::TlsConnector::from(tls),
                    connect_timeout,
                }))
            }
        }
    }
}

/// `host:port` of the debug proxy.
fn proxy_authority(proxy_url: &str) -> Result<String, TransportError> {
    let invalid = |reason: String| TransportError::Proxy {
        url: proxy_url.to_string(),
        reason,
    };
    let url = Url::parse(proxy_url).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| invalid("missing port".to_string()))?;
    Ok(format!("{}:{}", host, port))
}

/// Sends one request upstream and yields the response head.
#[derive(Clone)]
pub enum Dispatcher {
    /// Pooled client, plain TCP or verified TLS.
    Direct(Client<HttpsConnector<HttpConnector>, Body>),
    /// One connection per request through the debug proxy.
    DebugProxy(DebugProxy),
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatcher::Direct(_) => f.write_str("Dispatcher::Direct"),
            Dispatcher::DebugProxy(proxy) => f
                .debug_tuple("Dispatcher::DebugProxy")
                .field(&proxy.proxy_addr)
                .finish(),
        }
    }
}

impl Dispatcher {
    /// Dispatch `request`, whose URI must be absolute.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, ProxyError> {
        match self {
            Dispatcher::Direct(client) => client.request(request).await.map_err(|e| {
                if e.is_connect() {
                    ProxyError::Connect(error_chain(&e))
                } else {
                    ProxyError::Upstream(error_chain(&e))
                }
            }),
            Dispatcher::DebugProxy(proxy) => proxy.send(request).await,
        }
    }
}

/// Local intercepting proxy transport.
///
/// `http` targets are sent to the proxy in absolute form. `https` targets go
/// through a CONNECT tunnel and an unverified TLS session.
#[derive(Clone)]
pub struct DebugProxy {
    proxy_addr: String,
    tls: tokio_native_tls::TlsConnector,
    connect_timeout: Duration,
}

impl DebugProxy {
    async fn send(&self, mut request: Request<Body>) -> Result<Response<Incoming>, ProxyError> {
        let uri = request.uri().clone();
        let stream = self.connect().await?;

        if uri.scheme_str() != Some("https") {
            return send_on(TokioIo::new(stream), request).await;
        }

        let host = uri
            .host()
            .ok_or_else(|| ProxyError::BuildRequest(format!("no host in '{}'", uri)))?;
        let port = uri.port_u16().unwrap_or(443);
        let tunnel = open_tunnel(stream, &format!("{}:{}", host, port)).await?;

        let domain = host.trim_start_matches('[').trim_end_matches(']');
        let tls = self
            .tls
            .connect(domain, TokioIo::new(tunnel))
            .await
            .map_err(|e| ProxyError::Connect(error_chain(&e)))?;

        *request.uri_mut() = origin_form(&uri)?;
        send_on(TokioIo::new(tls), request).await
    }

    async fn connect(&self) -> Result<TcpStream, ProxyError> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.proxy_addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ProxyError::Connect(format!(
                "debug proxy {}: {}",
                self.proxy_addr, e
            ))),
            Err(_) => Err(ProxyError::Connect(format!(
                "debug proxy {}: connect timed out",
                self.proxy_addr
            ))),
        }
    }
}

/// Ask the proxy for a tunnel to `authority` and hand back the raw stream.
async fn open_tunnel(stream: TcpStream, authority: &str) -> Result<hyper::upgrade::Upgraded, ProxyError> {
    let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Body>(TokioIo::new(stream))
        .await
        .map_err(|e| ProxyError::Connect(error_chain(&e)))?;
    tokio::spawn(async move {
        if let Err(e) = conn.with_upgrades().await {
            tracing::debug!(error = %e, "Debug proxy tunnel closed");
        }
    });

    let request = Request::builder()
        .method(Method::CONNECT)
        .uri(authority)
        .header(header::HOST, authority)
        .body(Body::empty())
        .map_err(|e| ProxyError::BuildRequest(e.to_string()))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| ProxyError::Connect(error_chain(&e)))?;

    if !response.status().is_success() {
        return Err(ProxyError::Connect(format!(
            "debug proxy refused tunnel to {}: {}",
            authority,
            response.status()
        )));
    }

    hyper::upgrade::on(response)
        .await
        .map_err(|e| ProxyError::Connect(error_chain(&e)))
}

/// Run a single HTTP/1.1 exchange on an established connection.
async fn send_on<T>(io: T, request: Request<Body>) -> Result<Response<Incoming>, ProxyError>
where
    T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProxyError::Connect(error_chain(&e)))?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "Debug proxy connection closed");
        }
    });

    sender
        .send_request(request)
        .await
        .map_err(|e| ProxyError::Upstream(error_chain(&e)))
}

fn origin_form(uri: &Uri) -> Result<Uri, ProxyError> {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    path_and_query
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| ProxyError::BuildRequest(e.to_string()))
}

/// Display an error together with its sources, `outer: inner: root`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
