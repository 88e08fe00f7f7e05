//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a request ID for log correlation
//! - Validate the inbound request target
//! - Rewrite the path and build the upstream URL
//! - Copy inbound headers onto the outbound request
//!
//! # Design Decisions
//! - The request ID only lives in log fields; it is never sent anywhere
//! - Paths and queries stay percent-encoded end to end
//! - Header values are appended, never inserted, so repeated keys survive

use axum::http::header::{HeaderMap, HeaderValue, HOST};
use axum::http::Uri;
use url::Url;

use crate::http::response::ProxyError;
use uuid::Uuid;

/// Path segments stripped from every request, at most once each.
pub const STRIPPED_SEGMENTS: [&str; 2] = ["/release", "/test"];

/// Unique identifier attached to every log line of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that the inbound request target parses as a URL.
///
/// Origin-form targets (`/v1/chat?x=1`) are resolved against `base`;
/// absolute-form targets are parsed on their own.
pub fn validate_request_target(base: &Url, target: &str) -> Result<Url, url::ParseError> {
    Url::options().base_url(Some(base)).parse(target)
}

/// Remove the first `/release` and then the first `/test` from the path.
///
/// Neither match is anchored: `/v1/test/x` loses its `/test` too.
pub fn rewrite_path(path: &str) -> String {
    STRIPPED_SEGMENTS
        .iter()
        .fold(path.to_string(), |path, segment| path.replacen(segment, "", 1))
}

/// Concatenate the upstream base, the rewritten path and the raw query.
pub fn build_target_url(base: &str, path: &str, query: Option<&str>) -> String {
    let mut url = String::with_capacity(base.len() + path.len() + query.map_or(0, |q| q.len() + 1));
    url.push_str(base);
    url.push_str(path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Append every inbound header value to the outbound map.
///
/// `Host` is left to the client so the upstream sees its own authority.
pub fn copy_request_headers(inbound: &HeaderMap, outbound: &mut HeaderMap) {
    for (name, value) in inbound.iter() {
        if name == HOST {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
}

/// `Host` value for the upstream: its host, plus the port when one is given.
pub fn host_header(uri: &Uri) -> Result<HeaderValue, ProxyError> {
    let host = uri
        .host()
        .ok_or_else(|| ProxyError::BuildRequest(format!("no host in '{}'", uri)))?;
    let value = match uri.port_u16() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).map_err(|e| ProxyError::BuildRequest(e.to_string()))
}
