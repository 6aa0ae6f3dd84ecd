//! Per-relay entry point.
//!
//! # Data Flow
//! ```text
//! inbound call
//!     → method check            (405, nothing forwarded)
//!     → trace self-loop check   (202 + X-Relay-Dropped, body drained)
//!     → body capture            (400 on read failure)
//!     → request ID
//!     → Forwarder::forward      (detached, returns immediately)
//!     → 202 Accepted + X-Relay-Request-Id
//! ```

use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::forward::dispatcher::{Forwarder, InboundRequest};
use crate::http::request::{DROP_SELF_LOOP, X_RELAY_DROPPED, X_RELAY_REQUEST_ID};
use crate::observability::metrics;
use crate::relay::trace;
use crate::relay::types::ResolvedRelay;

/// State carried by one relay's route.
#[derive(Clone)]
pub struct RelayEndpoint {
    pub relay: Arc<ResolvedRelay>,
    pub forwarder: Arc<dyn Forwarder>,
    pub max_body_bytes: usize,
    /// Request ID source; returns an empty string when generation fails.
    pub new_request_id: fn() -> String,
}

/// Accept an inbound webhook call and hand it to the forwarder.
pub async fn relay_handler(
    State(endpoint): State<RelayEndpoint>,
    request: Request<Body>,
) -> Response {
    let relay = &endpoint.relay;
    let (parts, body) = request.into_parts();

    if !relay.allows_method(&parts.method) {
        tracing::warn!(
            relay = %relay.name,
            path = %relay.listen_path,
            method = %parts.method,
            "Method not allowed"
        );
        metrics::record_inbound(&relay.name, StatusCode::METHOD_NOT_ALLOWED.as_u16());
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let inbound_trace = trace::from_headers(&parts.headers);
    if !relay.id.is_empty() && trace::contains(&inbound_trace, &relay.id) {
        // Drain so the connection can be reused; the content is discarded.
        let _ = body::to_bytes(body, endpoint.max_body_bytes).await;
        let request_id = (endpoint.new_request_id)();
        tracing::info!(
            request_id = %request_id,
            relay = %relay.name,
            relay_id = %relay.id,
            trace = %inbound_trace,
            "Self-loop detected, dropping"
        );
        metrics::record_inbound(&relay.name, StatusCode::ACCEPTED.as_u16());
        return accepted(&request_id, Some(DROP_SELF_LOOP));
    }

    let body = match body::to_bytes(body, endpoint.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                relay = %relay.name,
                path = %relay.listen_path,
                error = %e,
                "Read body failed"
            );
            metrics::record_inbound(&relay.name, StatusCode::BAD_REQUEST.as_u16());
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let request_id = (endpoint.new_request_id)();
    tracing::debug!(
        request_id = %request_id,
        relay = %relay.name,
        method = %parts.method,
        body_bytes = body.len(),
        "Accepted inbound call"
    );

    endpoint.forwarder.forward(InboundRequest {
        request_id: request_id.clone(),
        relay_name: relay.name.clone(),
        relay_id: relay.id.clone(),
        method: parts.method,
        headers: parts.headers,
        body,
        destinations: relay.destinations.clone(),
    });

    metrics::record_inbound(&relay.name, StatusCode::ACCEPTED.as_u16());
    accepted(&request_id, None)
}

/// Health probe.
pub async fn health_handler() -> &'static str {
    "ok"
}

fn accepted(request_id: &str, dropped: Option<&'static str>) -> Response {
    let mut response = (StatusCode::ACCEPTED, "accepted").into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(X_RELAY_REQUEST_ID, value);
    }
    if let Some(reason) = dropped {
        headers.insert(X_RELAY_DROPPED, HeaderValue::from_static(reason));
    }
    response
}
