//! Configuration defaulting and validation.
//!
//! # Responsibilities
//! - Fill in defaults for omitted or zero values
//! - Normalize methods and the base path
//! - Semantic validation (serde handles syntactic)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{
    RelayServiceConfig, ServerConfig, DEFAULT_CONCURRENCY, DEFAULT_FORWARD_TIMEOUT_MS,
};
use crate::relay::identity::clean_path;
use crate::relay::types::{Destination, DestinationError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.listen_addr is required")]
    MissingListenAddr,

    #[error("relays must be a non-empty array")]
    NoRelays,

    #[error("relays[{relay}].methods contains an empty method")]
    EmptyMethod { relay: usize },

    #[error("relays[{relay}].methods contains an invalid method {method:?}")]
    InvalidMethod { relay: usize, method: String },

    #[error("relays[{relay}].destinations must be non-empty")]
    NoDestinations { relay: usize },

    #[error("relays[{relay}].destinations[{destination}]: {source}")]
    Destination {
        relay: usize,
        destination: usize,
        #[source]
        source: DestinationError,
    },

    #[error("relays[{relay}].listen_path must start with '/' (got {path:?})")]
    ListenPathNotAbsolute { relay: usize, path: String },
}

/// Fill defaults and normalize values in place.
pub fn apply_defaults(config: &mut RelayServiceConfig) {
    let defaults = ServerConfig::default();
    let server = &mut config.server;
    if server.concurrency == 0 {
        server.concurrency = DEFAULT_CONCURRENCY;
    }
    if server.forward_timeout_ms == 0 {
        server.forward_timeout_ms = DEFAULT_FORWARD_TIMEOUT_MS;
    }
    if server.max_body_bytes == 0 {
        server.max_body_bytes = defaults.max_body_bytes;
    }
    if server.request_timeout_secs == 0 {
        server.request_timeout_secs = defaults.request_timeout_secs;
    }
    server.base_path = normalize_base_path(&server.base_path);

    for relay in &mut config.relays {
        if relay.methods.is_empty() {
            relay.methods = vec!["POST".to_string()];
        }
        for method in &mut relay.methods {
            *method = method.trim().to_ascii_uppercase();
        }
        for destination in &mut relay.destinations {
            destination.method = destination.method.trim().to_ascii_uppercase();
        }
    }
}

/// Validate a defaulted configuration, collecting every problem.
pub fn validate_config(config: &RelayServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.listen_addr.trim().is_empty() {
        errors.push(ValidationError::MissingListenAddr);
    }
    if config.relays.is_empty() {
        errors.push(ValidationError::NoRelays);
    }

    for (i, relay) in config.relays.iter().enumerate() {
        for method in &relay.methods {
            let method = method.trim();
            if method.is_empty() {
                errors.push(ValidationError::EmptyMethod { relay: i });
            } else if axum::http::Method::from_bytes(method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    relay: i,
                    method: method.to_string(),
                });
            }
        }

        if relay.destinations.is_empty() {
            errors.push(ValidationError::NoDestinations { relay: i });
        }
        for (d, destination) in relay.destinations.iter().enumerate() {
            if let Err(source) = Destination::from_config(destination) {
                errors.push(ValidationError::Destination {
                    relay: i,
                    destination: d,
                    source,
                });
            }
        }

        if !relay.listen_path.is_empty() && !relay.listen_path.starts_with('/') {
            errors.push(ValidationError::ListenPathNotAbsolute {
                relay: i,
                path: relay.listen_path.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Normalize the base path: leading slash, cleaned, no trailing slash, `/` → empty.
pub fn normalize_base_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() || path == "/" {
        return String::new();
    }
    let cleaned = clean_path(path);
    if cleaned == "/" {
        String::new()
    } else {
        cleaned.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DestinationConfig, RelayConfig};

    fn valid_config() -> RelayServiceConfig {
        let mut config = RelayServiceConfig::default();
        config.server.listen_addr = "127.0.0.1:8080".into();
        config.relays.push(RelayConfig {
            name: "github".into(),
            listen_path: "/github".into(),
            methods: Vec::new(),
            destinations: vec![DestinationConfig {
                url: "http://127.0.0.1:9000/hook".into(),
                ..Default::default()
            }],
        });
        config
    }

    #[test]
    fn test_defaults_applied() {
        let mut config = valid_config();
        config.server.concurrency = 0;
        config.server.forward_timeout_ms = 0;
        config.server.base_path = " hooks/ ".into();
        config.relays[0].destinations[0].method = " patch ".into();

        apply_defaults(&mut config);

        assert_eq!(config.server.concurrency, 50);
        assert_eq!(config.server.forward_timeout_ms, 10_000);
        assert_eq!(config.server.base_path, "/hooks");
        assert_eq!(config.relays[0].methods, vec!["POST".to_string()]);
        assert_eq!(config.relays[0].destinations[0].method, "PATCH");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_methods_normalized() {
        let mut config = valid_config();
        config.relays[0].methods = vec![" post".into(), "put ".into()];
        apply_defaults(&mut config);
        assert_eq!(config.relays[0].methods, vec!["POST", "PUT"]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.server.listen_addr = "  ".into();
        config.relays[0].listen_path = "github".into();
        config.relays[0].methods = vec!["  ".into()];
        config.relays.push(RelayConfig {
            name: "empty".into(),
            ..Default::default()
        });

        apply_defaults(&mut config);
        let errors = validate_config(&config).unwrap_err();

        assert_eq!(errors.len(), 4, "got: {:?}", errors);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingListenAddr)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyMethod { relay: 0 })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ListenPathNotAbsolute { relay: 0, .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::NoDestinations { relay: 1 })));
    }

    #[test]
    fn test_no_relays() {
        let mut config = valid_config();
        config.relays.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[..], [ValidationError::NoRelays]));
    }

    #[test]
    fn test_destination_errors_reported() {
        let mut config = valid_config();
        config.relays[0].destinations.push(DestinationConfig::default());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "relays[0].destinations[1]: url is required"
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("//"), "");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/api//v1/"), "/api/v1");
        assert_eq!(normalize_base_path("/api/../hooks"), "/hooks");
    }
}
