//! Forwarding engine.
//!
//! # Data Flow
//! ```text
//! InboundRequest (from http::handler)
//!     → dispatcher.rs (one task per destination)
//!         → wait for admission slot (shared semaphore)
//!         → headers.rs (sanitize + overrides) + trace append + request ID
//!         → send with per-attempt deadline
//!         → outcome.rs (classify) → log + metrics
//! ```
//!
//! # Design Decisions
//! - Best-effort, at most one attempt per destination per call
//! - Outcomes never reach the inbound caller
//! - Attempts are independent: one failing never affects its siblings

pub mod dispatcher;
pub mod headers;
pub mod outcome;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherError, Forwarder, InboundRequest};
pub use outcome::ForwardOutcome;
