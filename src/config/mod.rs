//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the process restarts to pick up changes
//! - All fields have defaults to allow minimal configs, but the security
//!   section has no usable default: a gate without issuers or keys is fatal
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{GateConfig, ListenerConfig, SecurityConfig, TlsConfig};
pub use validation::{validate_config, ValidationError};
