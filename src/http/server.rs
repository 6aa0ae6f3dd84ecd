//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: one route per resolved relay plus `/healthz`
//! - Wire up middleware (tracing, inbound body timeout)
//! - Serve on a bound listener until shutdown, then drain with a deadline
//!
//! # Design Decisions
//! - The inbound deadline bounds body reads only: a stalled body is a read
//!   error in the handler (`400`, or ignored by the self-loop drain)

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::RequestBodyTimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::forward::dispatcher::Forwarder;
use crate::http::handler::{health_handler, relay_handler, RelayEndpoint};
use crate::http::request::new_request_id;
use crate::relay::identity::HEALTH_PATH;
use crate::relay::types::ResolvedRelay;

/// HTTP server for the webhook relay.
pub struct HttpServer {
    router: Router,
    shutdown_grace: Duration,
}

impl HttpServer {
    /// Create a new HTTP server serving `relays` and forwarding through `forwarder`.
    pub fn new(
        config: &ServerConfig,
        relays: Vec<ResolvedRelay>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let router = Self::build_router(config, relays, forwarder);
        Self {
            router,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ServerConfig,
        relays: Vec<ResolvedRelay>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Router {
        let mut router = Router::new().route(HEALTH_PATH, any(health_handler));

        for relay in relays {
            let path = relay.listen_path.clone();
            let endpoint = RelayEndpoint {
                relay: Arc::new(relay),
                forwarder: forwarder.clone(),
                max_body_bytes: config.max_body_bytes,
                new_request_id,
            };
            router = router.route(&path, any(relay_handler).with_state(endpoint));
        }

        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        )
    }

    /// Router with all relay routes and middleware, without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then give in-progress calls
    /// the configured grace period.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let (stopping_tx, stopping_rx) = tokio::sync::oneshot::channel::<()>();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining inbound calls");
                let _ = stopping_tx.send(());
            })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            biased;
            result = &mut serve => result?,
            _ = stopping_rx => {
                match tokio::time::timeout(self.shutdown_grace, &mut serve).await {
                    Ok(result) => result?,
                    Err(_) => tracing::warn!(
                        grace_secs = self.shutdown_grace.as_secs(),
                        "Grace period elapsed, closing remaining connections"
                    ),
                }
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
