//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! compiled defaults
//!     → config file (TOML, optional)
//!     → CLI / environment overrides (PORT, UPLOAD_URL)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → handed to the server once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; handlers never read the environment
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::CorsConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use schema::RelayConfig;
pub use schema::UploadConfig;
pub use schema::UpstreamConfig;
