//! Webhook fan-out relay library.
//!
//! Accepts inbound webhook calls and forwards each one, fire-and-forget, to
//! every destination of the matching relay.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::RelayServiceConfig;
pub use forward::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
