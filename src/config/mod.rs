//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (defaults, normalization, semantic checks)
//!     → RelayServiceConfig (validated, immutable)
//!     → relay::identity resolves relays from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Unknown fields are rejected so typos fail loudly
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::DestinationConfig;
pub use schema::ObservabilityConfig;
pub use schema::RelayConfig;
pub use schema::RelayServiceConfig;
pub use schema::ServerConfig;
