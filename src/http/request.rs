//! Request correlation.
//!
//! # Responsibilities
//! - Generate a request ID per inbound call
//! - Name the relay-specific headers
//!
//! # Design Decisions
//! - IDs are 12 random bytes as lowercase base-32: URL-safe and compact
//! - The request ID is for log correlation only, never for loop prevention
//! - Generation failure degrades to an empty ID instead of failing the call

use axum::http::HeaderName;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::relay::identity::random_token;

/// Correlation header set on the inbound response and every outbound attempt.
pub const X_RELAY_REQUEST_ID: HeaderName = HeaderName::from_static("x-relay-request-id");

/// Response header naming why forwarding was skipped.
pub const X_RELAY_DROPPED: HeaderName = HeaderName::from_static("x-relay-dropped");

/// Drop reason sent when a relay sees its own ID in the trace.
pub const DROP_SELF_LOOP: &str = "self_loop";

const REQUEST_ID_BYTES: usize = 12;

/// Generate a request ID from the operating system's randomness source.
pub fn new_request_id() -> String {
    new_request_id_with(&mut OsRng)
}

/// Generate a request ID from `rng`, returning an empty string on failure.
pub fn new_request_id_with<R: RngCore + ?Sized>(rng: &mut R) -> String {
    match random_token(rng, REQUEST_ID_BYTES) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Request ID generation failed, continuing without one");
            String::new()
        }
    }
}
