//! # lovesta-orm: Database Layer for Lovesta
//!
//! Connection handling, the schema builder handed to migrations, and the
//! batch migration runner that applies and reverts migrations from the
//! application and every plugin.
//!
//! ```ignore
//! let connection = Connection::from_config(&config.database)?;
//! let registry = MigrationRegistry::new()
//!     .with::<CreateUsers>("App.Database.Migrations.CreateUsers");
//! let runner = MigrationRunner::new(connection, registry, MigrationConfig::from(&config)).await?;
//! let applied = runner.run(&runner.all_migration_paths()?).await?;
//! ```

pub mod backends;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod plugins;

pub use backends::{DatabaseBackendType, DatabaseValue};
pub use connection::{connection_url, Connection};
pub use error::{OrmError, OrmResult};
pub use migrations::*;
pub use plugins::{discover_plugins, PluginDir};

/// Re-exported so migration files only depend on this crate
pub use async_trait::async_trait;
