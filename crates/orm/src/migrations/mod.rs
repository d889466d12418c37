//! Migration System
//!
//! Discovery of migration files across the application and its plugins,
//! the ledger of applied batches, and the runner that applies and reverts
//! them.

pub mod definitions;
pub mod ledger;
pub mod manager;
pub mod naming;
pub mod registry;
pub mod rollback;
pub mod runner;
pub mod schema_builder;
pub mod sql_script;

pub use definitions::*;
pub use ledger::Ledger;
pub use manager::{snake_migration_name, MigrationManager, APP_MIGRATIONS_TARGET, TIMESTAMP_FORMAT};
pub use naming::{class_name_from_file_name, namespace_for_path, namespace_map, studly, APP_MIGRATIONS_NAMESPACE};
pub use registry::MigrationRegistry;
pub use runner::MigrationRunner;
pub use schema_builder::{InsertBuilder, Schema, TableBuilder};
pub use sql_script::{split_sql_statements, SqlScriptMigration};
