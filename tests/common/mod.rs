//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Bytes, Body},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use webhook_relay::config::{DestinationConfig, RelayConfig, RelayServiceConfig};
use webhook_relay::forward::{Dispatcher, DispatcherConfig};
use webhook_relay::relay::{resolve_relays, ResolvedRelay};
use webhook_relay::{HttpServer, Shutdown};

/// A request as seen by a destination.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<Captured>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    delay: Duration,
}

/// A destination server that records every request it receives.
pub struct RecordingDestination {
    pub addr: SocketAddr,
    recorder: Recorder,
}

impl RecordingDestination {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.recorder.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.recorder.requests.lock().unwrap().len()
    }

    /// Highest number of requests observed in progress at once.
    pub fn max_active(&self) -> usize {
        self.recorder.max_active.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` requests arrived, or panic after `timeout`.
    pub async fn wait_for(&self, n: usize, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.count() < n {
            if tokio::time::Instant::now() >= deadline {
                panic!("expected {} requests, got {}", n, self.count());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn record(State(recorder): State<Recorder>, request: Request<Body>) -> StatusCode {
    let now = recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
    recorder.max_active.fetch_max(now, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    recorder.requests.lock().unwrap().push(Captured {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body,
    });

    if !recorder.delay.is_zero() {
        tokio::time::sleep(recorder.delay).await;
    }
    recorder.active.fetch_sub(1, Ordering::SeqCst);
    StatusCode::OK
}

/// Start a recording destination that answers 200 after `delay`.
pub async fn start_destination(delay: Duration) -> RecordingDestination {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorder = Recorder {
        delay,
        ..Default::default()
    };

    let app = Router::new().fallback(record).with_state(recorder.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    RecordingDestination { addr, recorder }
}

/// A running relay server.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub relays: Vec<ResolvedRelay>,
    pub dispatcher: Dispatcher,
    pub shutdown: Shutdown,
}

impl RunningRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
        self.dispatcher.shutdown();
    }
}

/// Bind an ephemeral port for a relay server that is started later.
pub async fn bind_relay() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Resolve `config` and serve it on `listener`.
pub async fn spawn_relay(listener: TcpListener, mut config: RelayServiceConfig) -> RunningRelay {
    let addr = listener.local_addr().unwrap();
    config.server.listen_addr = addr.to_string();
    webhook_relay::config::validation::apply_defaults(&mut config);
    webhook_relay::config::validation::validate_config(&config).unwrap();

    let relays = resolve_relays(&config).unwrap();
    let dispatcher = Dispatcher::new(DispatcherConfig {
        concurrency: config.server.concurrency,
        forward_timeout: config.server.forward_timeout(),
    })
    .unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config.server, relays.clone(), Arc::new(dispatcher.clone()));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningRelay {
        addr,
        relays,
        dispatcher,
        shutdown,
    }
}

/// Config with a single relay at `path` forwarding to `urls`.
pub fn single_relay(path: &str, urls: &[String]) -> RelayServiceConfig {
    let mut config = RelayServiceConfig::default();
    config.relays.push(relay(path, urls));
    config
}

pub fn relay(path: &str, urls: &[String]) -> RelayConfig {
    RelayConfig {
        name: path.trim_start_matches('/').to_string(),
        listen_path: path.to_string(),
        methods: Vec::new(),
        destinations: urls
            .iter()
            .map(|url| DestinationConfig {
                url: url.clone(),
                ..Default::default()
            })
            .collect(),
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
