//! Bounded-concurrency fan-out of inbound calls to their destinations.
//!
//! # Responsibilities
//! - Spawn one attempt per destination without waiting on any of them
//! - Cap in-flight attempts process-wide with a single semaphore
//! - Enforce a per-attempt deadline
//! - Build the outbound request (method, headers, trace, request ID, body)
//! - Classify and log each attempt's outcome
//!
//! # Design Decisions
//! - Attempts run under the dispatcher's own cancellation token, never the
//!   inbound call's, so writing the 202 cannot abort them
//! - Permits are held as RAII guards; release happens on every exit path
//! - No retries: each destination gets at most one attempt per call

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::schema::{DEFAULT_CONCURRENCY, DEFAULT_FORWARD_TIMEOUT_MS};
use crate::forward::headers::{apply_overrides, sanitize};
use crate::forward::outcome::ForwardOutcome;
use crate::http::request::X_RELAY_REQUEST_ID;
use crate::observability::metrics;
use crate::relay::trace::{self, TRACE_HEADER};
use crate::relay::types::Destination;

/// Everything a fan-out needs from one accepted inbound call.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Correlation ID; may be empty if generation failed.
    pub request_id: String,
    pub relay_name: String,
    pub relay_id: String,
    pub method: Method,
    pub headers: HeaderMap,
    /// Captured body, shared unchanged by every attempt.
    pub body: Bytes,
    pub destinations: Arc<[Destination]>,
}

/// Hand-off point between the HTTP entry point and the forwarding engine.
pub trait Forwarder: Send + Sync {
    /// Start forwarding `request` and return without waiting.
    fn forward(&self, request: InboundRequest);
}

/// Error type for dispatcher construction.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum in-flight attempts across all relays.
    pub concurrency: usize,
    /// Deadline for each attempt.
    pub forward_timeout: Duration,
}

/// The fan-out engine. Cheap to clone; clones share the semaphore and scope.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    admission: Arc<Semaphore>,
    timeout: Duration,
    background: CancellationToken,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatcherError> {
        let concurrency = if config.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            config.concurrency
        };
        let timeout = if config.forward_timeout.is_zero() {
            Duration::from_millis(DEFAULT_FORWARD_TIMEOUT_MS)
        } else {
            config.forward_timeout
        };

        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            admission: Arc::new(Semaphore::new(concurrency)),
            timeout,
            background: CancellationToken::new(),
            concurrency,
        })
    }

    /// Spawn one attempt per destination and return their handles.
    ///
    /// Dropping the handles does not cancel the attempts.
    pub fn spawn_attempts(&self, request: InboundRequest) -> Vec<JoinHandle<ForwardOutcome>> {
        let request = Arc::new(request);
        (0..request.destinations.len())
            .map(|index| {
                let dispatcher = self.clone();
                let request = request.clone();
                tokio::spawn(async move {
                    let destination = &request.destinations[index];
                    dispatcher.forward_one(&request, destination).await
                })
            })
            .collect()
    }

    /// Forward `request` to a single destination.
    pub async fn forward_one(
        &self,
        request: &InboundRequest,
        destination: &Destination,
    ) -> ForwardOutcome {
        let _permit = tokio::select! {
            biased;
            _ = self.background.cancelled() => {
                return self.report(request, destination, ForwardOutcome::Abandoned);
            }
            permit = self.admission.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return self.report(request, destination, ForwardOutcome::Abandoned),
            },
        };
        let _in_flight = InFlightGuard::new();

        let start = Instant::now();
        let outbound = self.build_request(request, destination);

        let outcome = tokio::select! {
            biased;
            _ = self.background.cancelled() => ForwardOutcome::Canceled {
                latency: start.elapsed(),
            },
            result = tokio::time::timeout(self.timeout, outbound.send()) => {
                let latency = start.elapsed();
                match result {
                    // The response is dropped unread, which closes it.
                    Ok(Ok(response)) => ForwardOutcome::Delivered {
                        status: response.status().as_u16(),
                        latency,
                    },
                    Ok(Err(e)) if e.is_timeout() => ForwardOutcome::TimedOut { latency },
                    Ok(Err(e)) => ForwardOutcome::Failed {
                        latency,
                        error: e.to_string(),
                    },
                    Err(_) => ForwardOutcome::TimedOut { latency },
                }
            }
        };

        self.report(request, destination, outcome)
    }

    fn build_request(
        &self,
        request: &InboundRequest,
        destination: &Destination,
    ) -> reqwest::RequestBuilder {
        let method = destination
            .method
            .clone()
            .unwrap_or_else(|| request.method.clone());

        let mut headers = sanitize(&request.headers);
        apply_overrides(&mut headers, &destination.headers);

        if !request.relay_id.is_empty() {
            let outbound_trace =
                trace::append(&trace::from_headers(&request.headers), &request.relay_id);
            match HeaderValue::from_str(&outbound_trace) {
                Ok(value) => {
                    headers.insert(TRACE_HEADER, value);
                }
                Err(e) => tracing::warn!(
                    request_id = %request.request_id,
                    relay = %request.relay_name,
                    error = %e,
                    "Trace header not representable, forwarding inbound trace as-is"
                ),
            }
        }

        if let Ok(value) = HeaderValue::from_str(&request.request_id) {
            headers.insert(X_RELAY_REQUEST_ID, value);
        }

        self.client
            .request(method, destination.url.clone())
            .headers(headers)
            .body(request.body.clone())
    }

    fn report(
        &self,
        request: &InboundRequest,
        destination: &Destination,
        outcome: ForwardOutcome,
    ) -> ForwardOutcome {
        let dest_url = destination.url.as_str();
        let latency_ms = outcome.latency().map(|l| l.as_millis() as u64).unwrap_or(0);

        match &outcome {
            ForwardOutcome::Delivered { status, .. } => tracing::info!(
                request_id = %request.request_id,
                relay = %request.relay_name,
                relay_id = %request.relay_id,
                dest_url,
                status,
                latency_ms,
                "Forward completed"
            ),
            ForwardOutcome::TimedOut { .. } => tracing::warn!(
                request_id = %request.request_id,
                relay = %request.relay_name,
                relay_id = %request.relay_id,
                dest_url,
                latency_ms,
                "Forward timed out"
            ),
            ForwardOutcome::Canceled { .. } => tracing::warn!(
                request_id = %request.request_id,
                relay = %request.relay_name,
                relay_id = %request.relay_id,
                dest_url,
                latency_ms,
                "Forward canceled"
            ),
            ForwardOutcome::Failed { error, .. } => tracing::error!(
                request_id = %request.request_id,
                relay = %request.relay_name,
                relay_id = %request.relay_id,
                dest_url,
                latency_ms,
                error = %error,
                "Forward failed"
            ),
            ForwardOutcome::Abandoned => tracing::debug!(
                request_id = %request.request_id,
                relay = %request.relay_name,
                dest_url,
                "Forward abandoned before admission"
            ),
        }

        metrics::record_forward(&request.relay_name, &outcome);
        outcome
    }

    /// Cancel the background scope: queued attempts abandon, in-flight ones
    /// end as canceled.
    pub fn shutdown(&self) {
        self.background.cancel();
    }

    /// Admission slots currently free.
    pub fn available_slots(&self) -> usize {
        self.admission.available_permits()
    }

    /// Configured admission capacity.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Configured per-attempt deadline.
    pub fn forward_timeout(&self) -> Duration {
        self.timeout
    }
}

impl Forwarder for Dispatcher {
    fn forward(&self, request: InboundRequest) {
        tracing::debug!(
            request_id = %request.request_id,
            relay = %request.relay_name,
            destinations = request.destinations.len(),
            "Dispatching"
        );
        // Fire-and-forget: outcomes are logged by each attempt.
        drop(self.spawn_attempts(request));
    }
}

struct InFlightGuard;

impl InFlightGuard {
    fn new() -> Self {
        metrics::inc_in_flight();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        metrics::dec_in_flight();
    }
}
