//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig
//!     → transport.rs (TransportPolicy resolved once → Dispatcher)
//!     → forwarder.rs (one outbound request per inbound request)
//! ```
//!
//! # Design Decisions
//! - One dispatcher for the process; the direct one pools connections
//! - The handler never inspects the environment or the debug flag

pub mod forwarder;
pub mod transport;

pub use forwarder::Forwarder;
pub use transport::{Dispatcher, TransportError, TransportPolicy};
