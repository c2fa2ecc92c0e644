//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound connection
//!     → server.rs (axum setup, middleware, catch-all route)
//!     → request.rs (attach x-request-id)
//!     → forward.rs (select backend, proxy, tag response)
//!     → Response to client (or 503/502 on failure)
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use forward::{ForwardError, X_FORWARDED_SERVER};
pub use server::{AppState, HttpServer};
