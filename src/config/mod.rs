//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to each listener at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart since
//!   socket paths cannot move under a running listener
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BackendConfig;
pub use schema::GatewayConfig;
pub use schema::HttpListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::StreamListenerConfig;
pub use schema::TlsConfig;
