//! Runtime relay and destination types.
//!
//! Built once from configuration at startup; read-only afterwards and shared
//! behind `Arc` by every handler and forward attempt.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::config::schema::DestinationConfig;

/// Why a destination entry could not be turned into a [`Destination`].
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("url is required")]
    MissingUrl,

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported url scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

/// A resolved forwarding target.
#[derive(Debug, Clone)]
pub struct Destination {
    pub url: Url,
    /// Method override; `None` means reuse the inbound method.
    pub method: Option<Method>,
    /// Static header overrides. A `host` entry is kept here but never applied.
    pub headers: HeaderMap,
    pub description: String,
}

impl Destination {
    pub fn from_config(config: &DestinationConfig) -> Result<Self, DestinationError> {
        let raw_url = config.url.trim();
        if raw_url.is_empty() {
            return Err(DestinationError::MissingUrl);
        }
        let url = Url::parse(raw_url).map_err(|source| DestinationError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DestinationError::UnsupportedScheme(url.scheme().to_string()));
        }

        let method = match config.method.trim() {
            "" => None,
            m => Some(
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| DestinationError::InvalidMethod(m.to_string()))?,
            ),
        };

        let mut headers = HeaderMap::with_capacity(config.headers.len());
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| DestinationError::InvalidHeaderName(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| DestinationError::InvalidHeaderValue(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        Ok(Self {
            url,
            method,
            headers,
            description: config.description.clone(),
        })
    }
}

/// A relay with a concrete listen path and identity.
#[derive(Debug, Clone)]
pub struct ResolvedRelay {
    /// Short digest of the listen path; the loop-prevention key.
    pub id: String,
    pub name: String,
    pub listen_path: String,
    /// Allowed inbound methods; empty allows all.
    pub methods: Vec<Method>,
    pub destinations: Arc<[Destination]>,
}

impl ResolvedRelay {
    /// Case-insensitive method check against the allowed set.
    pub fn allows_method(&self, method: &Method) -> bool {
        if self.methods.is_empty() {
            return true;
        }
        let inbound = method.as_str().trim();
        self.methods
            .iter()
            .any(|allowed| allowed.as_str().trim().eq_ignore_ascii_case(inbound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest(url: &str) -> DestinationConfig {
        DestinationConfig {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_destination_from_config() {
        let mut config = dest("http://hooks.internal:9000/in");
        config.method = " put ".into();
        config.headers.insert("X-Token".into(), "abc".into());
        config.headers.insert("Host".into(), "evil.example".into());

        let d = Destination::from_config(&config).unwrap();
        assert_eq!(d.url.as_str(), "http://hooks.internal:9000/in");
        assert_eq!(d.method, Some(Method::PUT));
        assert_eq!(d.headers.get("x-token").unwrap(), "abc");
        assert!(d.headers.contains_key("host"));
    }

    #[test]
    fn test_destination_rejects_bad_input() {
        assert!(matches!(
            Destination::from_config(&dest("  ")),
            Err(DestinationError::MissingUrl)
        ));
        assert!(matches!(
            Destination::from_config(&dest("not a url")),
            Err(DestinationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Destination::from_config(&dest("ftp://example.com/x")),
            Err(DestinationError::UnsupportedScheme(_))
        ));

        let mut bad_header = dest("http://example.com");
        bad_header.headers.insert("bad header".into(), "v".into());
        assert!(matches!(
            Destination::from_config(&bad_header),
            Err(DestinationError::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn test_allows_method() {
        let relay = ResolvedRelay {
            id: "id".into(),
            name: "r".into(),
            listen_path: "/r".into(),
            methods: vec![Method::POST, Method::PUT],
            destinations: Arc::from(Vec::new()),
        };
        assert!(relay.allows_method(&Method::POST));
        assert!(relay.allows_method(&Method::from_bytes(b"post").unwrap()));
        assert!(!relay.allows_method(&Method::GET));

        let open = ResolvedRelay { methods: Vec::new(), ..relay };
        assert!(open.allows_method(&Method::DELETE));
    }
}
