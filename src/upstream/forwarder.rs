//! Forwarding of one inbound request to the upstream.
//!
//! # Responsibilities
//! - Validate the request target, rewrite the path, build the upstream URL
//! - Build the outbound request (method, headers, streamed body)
//! - Dispatch it once, bounded by the header timeout
//!
//! # Design Decisions
//! - Single attempt, never retried
//! - The inbound body is streamed through, never buffered
//! - The timeout covers connect + response headers only; the body stream that
//!   follows is not bounded, so long completions are never cut off

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{HeaderMap, Method, Request, Response, Uri},
};
use hyper::body::Incoming;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::request::{
    build_target_url, copy_request_headers, host_header, rewrite_path, validate_request_target,
    RequestId,
};
use crate::http::response::ProxyError;
use crate::upstream::transport::Dispatcher;

/// Forwards requests to the single configured upstream.
#[derive(Debug, Clone)]
pub struct Forwarder {
    /// Base URL exactly as configured; paths are appended to it verbatim.
    target: String,
    /// Parsed form of `target`, used to resolve origin-form request targets.
    base: Url,
    dispatcher: Dispatcher,
    header_timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder for an already validated upstream configuration.
    pub fn new(config: &UpstreamConfig, dispatcher: Dispatcher) -> Result<Self, url::ParseError> {
        let base = Url::parse(&config.target)?;
        Ok(Self {
            target: config.target.clone(),
            base,
            dispatcher,
            header_timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Override the header timeout.
    pub fn with_header_timeout(mut self, timeout: Duration) -> Self {
        self.header_timeout = timeout;
        self
    }

    pub fn header_timeout(&self) -> Duration {
        self.header_timeout
    }

    /// Turn an inbound request target (`/release/v1/chat?x=1`) into the
    /// upstream URL string.
    ///
    /// The target must parse as a URL; the path and query are then taken from
    /// it raw, with no dot-segment or percent-encoding normalisation.
    pub fn target_url(&self, request_target: &str) -> Result<String, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidUrl {
            target: request_target.to_string(),
            reason,
        };

        validate_request_target(&self.base, request_target).map_err(|e| invalid(e.to_string()))?;
        let raw: Uri = request_target
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| invalid(e.to_string()))?;

        Ok(build_target_url(&self.target, &rewrite_path(raw.path()), raw.query()))
    }

    /// Forward one request and wait for the upstream response headers.
    pub async fn forward(
        &self,
        request_id: RequestId,
        method: Method,
        request_target: &str,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<Response<Incoming>, ProxyError> {
        let target_url = self.target_url(request_target)?;

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            upstream = %target_url,
            "Forwarding request"
        );

        let uri: Uri = target_url
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ProxyError::BuildRequest(e.to_string()))?;
        let body = if body.is_end_stream() { Body::empty() } else { body };

        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .map_err(|e| ProxyError::BuildRequest(e.to_string()))?;
        copy_request_headers(headers, request.headers_mut());
        let host = host_header(request.uri())?;
        request.headers_mut().insert(axum::http::header::HOST, host);

        match tokio::time::timeout(self.header_timeout, self.dispatcher.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Timeout(self.header_timeout)),
        }
    }
}
