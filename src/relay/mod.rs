//! Relay identity and loop prevention.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     RelayConfig[]
//!     → identity.rs (join base path, generate missing paths, derive IDs)
//!     → types.rs (ResolvedRelay / Destination, immutable)
//!     → one route per relay in http::server
//!
//! Per call:
//!     inbound X-Relay-Trace → trace.rs contains(own ID)? → drop
//!     outbound X-Relay-Trace ← trace.rs append(own ID)
//! ```
//!
//! # Design Decisions
//! - Resolved relays are values carried into each handler, not a global registry
//! - IDs live only for the process; nothing is persisted

pub mod identity;
pub mod trace;
pub mod types;

pub use identity::{resolve_relays, ResolveError};
pub use types::{Destination, ResolvedRelay};
