//! Streaming reverse proxy for a single upstream API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ upstream::Forwarder ──▶ Upstream
//!                 (catch-all)      (rewrite, headers,      (e.g. api.openai.com)
//!                                   300s header timeout)
//!     Client ◀── http::relay ◀──── http::response ◀────── Upstream
//!                (≤1 KiB frames)   (status + headers)
//! ```
//!
//! Every request goes to the same upstream. `/release` and `/test` are
//! removed from the path once each, everything else (method, query, headers,
//! body) passes through, and the upstream response is streamed back as it
//! arrives.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
