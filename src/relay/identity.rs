//! Relay identity and listen path resolution.
//!
//! # Responsibilities
//! - Join the base path with each relay's listen path and clean the result
//! - Generate a random path segment for relays that declare none
//! - Derive the relay ID from the resolved path
//!
//! # Design Decisions
//! - The ID is a truncated SHA-256 digest of the path: stable for the process
//!   lifetime, short enough for a header, and it does not reveal the path to
//!   downstream relays reading the trace
//! - Randomness failure at startup is fatal, never retried

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::Method;
use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::schema::RelayServiceConfig;
use crate::relay::types::{Destination, DestinationError, ResolvedRelay};

/// Length of a relay ID in base-32 characters.
pub const RELAY_ID_LEN: usize = 16;

/// Random bytes behind a generated listen path.
const PATH_TOKEN_BYTES: usize = 16;

/// Route served by the health handler; relays may not claim it.
pub const HEALTH_PATH: &str = "/healthz";

/// Errors raised while turning configuration into resolved relays.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("generate listen_path for relays[{relay}]: {source}")]
    RandomSource {
        relay: usize,
        #[source]
        source: rand::Error,
    },

    #[error("relays[{relay}] resolves to {path:?}, which is already used by another relay")]
    DuplicatePath { relay: usize, path: String },

    #[error("relays[{relay}] resolves to {path:?}, which is reserved")]
    ReservedPath { relay: usize, path: String },

    #[error("relays[{relay}] resolves to {path:?}, which contains route parameter syntax")]
    UnroutablePath { relay: usize, path: String },

    #[error("relays[{relay}].destinations[{destination}]: {source}")]
    Destination {
        relay: usize,
        destination: usize,
        #[source]
        source: DestinationError,
    },

    #[error("relays[{relay}].methods contains an invalid method {method:?}")]
    Method { relay: usize, method: String },
}

/// Resolve every relay using the operating system's randomness source.
pub fn resolve_relays(config: &RelayServiceConfig) -> Result<Vec<ResolvedRelay>, ResolveError> {
    resolve_relays_with(config, &mut OsRng)
}

/// Resolve every relay, drawing generated path tokens from `rng`.
pub fn resolve_relays_with<R: RngCore + ?Sized>(
    config: &RelayServiceConfig,
    rng: &mut R,
) -> Result<Vec<ResolvedRelay>, ResolveError> {
    let mut resolved = Vec::with_capacity(config.relays.len());
    let mut seen = HashSet::new();

    for (i, relay) in config.relays.iter().enumerate() {
        let declared = relay.listen_path.trim();
        let listen_path = if declared.is_empty() {
            let token = random_token(rng, PATH_TOKEN_BYTES)
                .map_err(|source| ResolveError::RandomSource { relay: i, source })?;
            join_paths(&config.server.base_path, &format!("/{}", token))
        } else {
            join_paths(&config.server.base_path, declared)
        };

        if listen_path == HEALTH_PATH {
            return Err(ResolveError::ReservedPath { relay: i, path: listen_path });
        }
        if !is_routable(&listen_path) {
            return Err(ResolveError::UnroutablePath { relay: i, path: listen_path });
        }
        if !seen.insert(listen_path.clone()) {
            return Err(ResolveError::DuplicatePath { relay: i, path: listen_path });
        }

        let methods = relay
            .methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
                    ResolveError::Method {
                        relay: i,
                        method: m.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let destinations = relay
            .destinations
            .iter()
            .enumerate()
            .map(|(d, dest)| {
                Destination::from_config(dest).map_err(|source| ResolveError::Destination {
                    relay: i,
                    destination: d,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        resolved.push(ResolvedRelay {
            id: relay_id(&listen_path),
            name: relay.name.clone(),
            listen_path,
            methods,
            destinations: Arc::from(destinations),
        });
    }

    Ok(resolved)
}

/// Derive the relay ID: lowercase unpadded base-32 of SHA-256, truncated.
pub fn relay_id(listen_path: &str) -> String {
    let digest = Sha256::digest(listen_path.as_bytes());
    let mut id = BASE32_NOPAD.encode(&digest).to_ascii_lowercase();
    id.truncate(RELAY_ID_LEN);
    id
}

/// Fill `n_bytes` from `rng` and encode them as a lowercase, unpadded base-32 token.
pub fn random_token<R: RngCore + ?Sized>(
    rng: &mut R,
    n_bytes: usize,
) -> Result<String, rand::Error> {
    let mut bytes = vec![0u8; n_bytes];
    rng.try_fill_bytes(&mut bytes)?;
    Ok(BASE32_NOPAD.encode(&bytes).to_ascii_lowercase())
}

/// Join a base prefix and a listen path into one cleaned absolute path.
pub fn join_paths(base_path: &str, listen_path: &str) -> String {
    let base_path = base_path.trim();
    let listen_path = listen_path.trim();

    let base = match base_path {
        "" | "/" => "",
        b => b,
    };
    let mut joined = String::with_capacity(base.len() + listen_path.len() + 2);
    if !base.is_empty() {
        if !base.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(base);
    }
    if !listen_path.is_empty() {
        if !listen_path.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(listen_path);
    }
    clean_path(&joined)
}

/// Lexically clean an absolute path.
///
/// Collapses repeated slashes, removes `.` segments, resolves `..` against the
/// preceding segment (never above the root) and drops any trailing slash.
/// An empty input yields `/`.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

fn is_routable(path: &str) -> bool {
    !path.contains(['{', '}'])
        && path
            .split('/')
            .all(|segment| !segment.starts_with(':') && !segment.starts_with('*'))
}
