//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → shared via Arc with the engine and transport bindings
//! ```
//!
//! # Design Decisions
//! - Config is a plain options record; it carries no behavior
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    EngineConfig, HttpConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig, WebSocketConfig,
};
pub use validation::{validate_config, ValidationError};
