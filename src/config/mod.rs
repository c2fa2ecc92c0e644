//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.json
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → Config (validated, immutable)
//!     → consumed by main to build the registry, monitor, and server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changing it means restarting
//! - Only `port` and `servers` are required; everything else defaults
//! - Any configuration problem is fatal before the listener binds

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AdminConfig, Config, HealthCheckConfig, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
