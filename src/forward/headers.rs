//! Outbound header sanitization.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from the inbound set
//! - Drop the inbound `Host` so the destination's own host is used
//! - Apply per-destination static overrides
//!
//! # Design Decisions
//! - Overrides replace every same-named inbound value
//! - A `host` override is ignored, never applied

use axum::http::{header, HeaderMap, HeaderName};

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true for headers that describe a single transport hop.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    // HeaderName is always stored lowercase.
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy inbound headers minus hop-by-hop fields and `Host`.
pub fn sanitize(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || name == header::HOST {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
    outbound
}

/// Apply static overrides on top of `headers`, skipping any `host` entry.
pub fn apply_overrides(headers: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        if name == header::HOST {
            tracing::debug!("Ignoring host header override");
            continue;
        }
        headers.remove(name);
        for value in overrides.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
}
