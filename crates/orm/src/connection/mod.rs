//! Connection Management
//!
//! A lazily opened, shared database handle built from a named connection
//! in the application configuration.

pub mod pool;

pub use pool::*;
