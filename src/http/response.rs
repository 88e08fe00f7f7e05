//! Response handling and transformation.
//!
//! # Responsibilities
//! - Mirror the upstream response (status, headers, body) to the client
//! - Map per-request failures to 500 responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Headers are copied as-is, hop-by-hop ones included
//! - Every failure is a 500; there is no structured error schema

use std::time::Duration;

use axum::{
    body::Body,
    http::{self, header, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::http::relay::ChunkedRelay;
use crate::http::request::RequestId;

/// Failures that abort a request before any byte reaches the client.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The inbound request target is not a valid URL.
    #[error("invalid request URL '{target}': {reason}")]
    InvalidUrl { target: String, reason: String },

    /// The outbound request could not be built.
    #[error("error creating proxy request: {0}")]
    BuildRequest(String),

    /// No connection to the upstream (DNS, TCP, TLS or proxy tunnel).
    #[error("error sending proxy request: {0}")]
    Connect(String),

    /// The exchange with the upstream failed after connecting.
    #[error("error sending proxy request: {0}")]
    Upstream(String),

    /// No response headers arrived in time.
    #[error("upstream did not respond within {} seconds", .0.as_secs())]
    Timeout(Duration),
}

impl ProxyError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidUrl { .. } => "invalid_url",
            ProxyError::BuildRequest(_) => "build_request",
            ProxyError::Connect(_) => "connect",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::Timeout(_) => "timeout",
        }
    }

    /// Body sent to the client.
    ///
    /// A malformed inbound URL gets the generic status text; everything else
    /// carries the underlying error message.
    fn client_message(&self) -> String {
        match self {
            ProxyError::InvalidUrl { .. } => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.client_message(),
        )
            .into_response()
    }
}

/// Build the client response from the upstream one.
///
/// The status is set once, the header map moves over whole (every repeated
/// value included) and the body is relayed chunk by chunk. Ownership of the
/// upstream body moves into the relay, so the upstream connection is released
/// whenever the body finishes, fails or is dropped by a disconnecting client.
pub fn mirror_upstream(upstream: http::Response<Incoming>, request_id: RequestId) -> Response {
    let (parts, body) = upstream.into_parts();

    let relay = ChunkedRelay::new(Body::new(body).into_data_stream(), request_id);
    let mut response = Response::new(Body::from_stream(relay));
    *response.status_mut() = parts.status;
    *response.headers_mut() = parts.headers;
    response
}
