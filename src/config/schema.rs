//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cap on in-flight destination attempts.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Default per-attempt forward timeout in milliseconds.
pub const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 10_000;

/// Root configuration for the webhook relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RelayServiceConfig {
    /// Listener and forwarding settings.
    pub server: ServerConfig,

    /// Relay definitions (one inbound route each).
    pub relays: Vec<RelayConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Required.
    pub listen_addr: String,

    /// Prefix prepended to every relay listen path.
    pub base_path: String,

    /// Per-destination forward timeout in milliseconds (0 = default).
    pub forward_timeout_ms: u64,

    /// Maximum in-flight destination attempts, process-wide (0 = default).
    pub concurrency: usize,

    /// Largest inbound body accepted, in bytes.
    pub max_body_bytes: usize,

    /// Idle timeout for reading an inbound body, in seconds.
    pub request_timeout_secs: u64,

    /// How long in-progress inbound calls may run after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn forward_timeout(&self) -> Duration {
        let ms = if self.forward_timeout_ms == 0 {
            DEFAULT_FORWARD_TIMEOUT_MS
        } else {
            self.forward_timeout_ms
        };
        Duration::from_millis(ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: String::new(),
            base_path: String::new(),
            forward_timeout_ms: DEFAULT_FORWARD_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// One inbound route plus its destination fan-out set.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Display name for logging/metrics.
    pub name: String,

    /// Listen path; a random one is generated when empty.
    pub listen_path: String,

    /// Allowed inbound methods (default: POST).
    pub methods: Vec<String>,

    /// Destinations every accepted call is forwarded to.
    pub destinations: Vec<DestinationConfig>,
}

/// A single forwarding target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    /// Target URL.
    #[serde(default)]
    pub url: String,

    /// Method override; the inbound method is used when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,

    /// Static headers replacing same-named inbound headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Free-form note, only used in logs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
