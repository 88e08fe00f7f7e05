//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap) + ENV variable
//!     → loader.rs (gather overrides, resolve debug mode)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to the handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults so only the target needs attention
//! - The environment is read once, here, never per request

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigSource};
pub use schema::{DebugConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, UpstreamConfig};
