//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → request.rs (validate target, rewrite path, copy headers)
//!     → upstream::Forwarder (dispatch, header timeout)
//!     → response.rs (status + headers mirrored, errors → 500)
//!     → relay.rs (body re-chunked and streamed)
//!     → Send to client
//! ```

pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use relay::{ChunkedRelay, RELAY_CHUNK_SIZE};
pub use request::RequestId;
pub use response::ProxyError;
pub use server::{AppState, HttpServer, ServerError};
