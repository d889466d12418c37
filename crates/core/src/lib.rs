//! # lovesta-core
//!
//! Shared foundation for the Lovesta crates: application and database
//! configuration, configuration errors and the logging bootstrap used by
//! the command line tools.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, ConnectionConfig, DatabaseConfig, Environment};
pub use logging::{init_logging, LoggingConfig};
