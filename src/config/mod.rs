//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or BreakerConfig built in code
//!     → loader.rs (parse & deserialize, numeric fields leniently)
//!     → validation.rs (resolve to Settings, substitute defaults)
//!     → Settings (validated, immutable)
//!     → owned by one Breaker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a breaker is built
//! - All fields have defaults to allow minimal configs
//! - Invalid numeric values never fail: they resolve to documented defaults
//!   and are reported as adjustments
//! - A file that is not valid TOML is still an error

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, BreakerConfig, Numeric, ObservabilityConfig};
pub use validation::{Adjustment, Settings};
