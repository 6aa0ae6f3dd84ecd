//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → handler.rs (method check, loop check, body capture)
//!     → request.rs (request ID)
//!     → forward::Forwarder (detached)
//!     → 202 Accepted to caller
//! ```

pub mod handler;
pub mod request;
pub mod server;

pub use request::{X_RELAY_DROPPED, X_RELAY_REQUEST_ID};
pub use server::HttpServer;
