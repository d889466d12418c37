//! Migration Definitions - Core types shared by the migration system
//!
//! Ledger records, discovered migration files, status rows and the
//! configuration that tells the runner where migrations live.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use lovesta_core::AppConfig;
use serde::Serialize;
use std::path::PathBuf;

use super::schema_builder::Schema;
use crate::error::OrmResult;

/// A reversible schema change.
///
/// Both directions are required. `is_reversible` lets a migration without a
/// meaningful `down` body report that, and rollback then skips it with a
/// warning instead of calling `down`.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Apply the change
    async fn up(&self, schema: &Schema) -> OrmResult<()>;

    /// Revert the change
    async fn down(&self, schema: &Schema) -> OrmResult<()>;

    fn is_reversible(&self) -> bool {
        true
    }
}

/// A row of the ledger table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Base file name without extension
    pub name: String,
    /// Batch the migration was applied in
    pub batch: i64,
    /// When the migration was applied, if the backend reported it
    pub applied_at: Option<NaiveDateTime>,
}

/// A migration file found on disk. Recomputed on every runner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub absolute_path: PathBuf,
    pub directory: PathBuf,
    /// `2025-07-21_160532_create_home_table`
    pub base_name: String,
    /// `CreateHomeTable`
    pub class_name: String,
    /// `Home.Migrations`
    pub namespace: String,
}

impl MigrationFile {
    /// Namespace and class name joined with `.`
    pub fn full_class_name(&self) -> String {
        format!("{}.{}", self.namespace, self.class_name)
    }

    pub fn extension(&self) -> Option<&str> {
        self.absolute_path.extension().and_then(|ext| ext.to_str())
    }

    /// Whether the file is a self-describing SQL script
    pub fn is_sql_script(&self) -> bool {
        self.extension() == Some("sql")
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Application root; every other path is relative to it
    pub base_path: PathBuf,
    /// Application migrations, relative to `base_path`
    pub database_dir: PathBuf,
    /// Plugins root, relative to `base_path`
    pub plugins_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
    /// File extensions treated as migrations
    pub extensions: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            database_dir: PathBuf::from("database/migrations"),
            plugins_dir: PathBuf::from("plugins"),
            migrations_table: "migrations".to_string(),
            extensions: vec!["rs".to_string(), "sql".to_string()],
        }
    }
}

impl MigrationConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    pub fn with_migrations_table(mut self, table: impl Into<String>) -> Self {
        self.migrations_table = table.into();
        self
    }

    /// Absolute application migrations directory
    pub fn app_migrations_path(&self) -> PathBuf {
        self.base_path.join(&self.database_dir)
    }

    /// Absolute plugins root
    pub fn plugins_path(&self) -> PathBuf {
        self.base_path.join(&self.plugins_dir)
    }

    pub fn is_migration_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext == extension)
    }
}

impl From<&AppConfig> for MigrationConfig {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.base_path()).with_migrations_table(config.database.migrations_table.clone())
    }
}

/// Whether a migration has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MigrationState {
    Pending,
    Applied { batch: i64 },
}

/// One line of the status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub state: MigrationState,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self.state, MigrationState::Applied { .. })
    }
}

/// Kind of file produced by migration scaffolding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationKind {
    /// Rust struct implementing `Migration`, registered by the host binary
    #[default]
    Rust,
    /// Self-contained SQL script with up and down sections
    Sql,
}

impl MigrationKind {
    pub fn extension(&self) -> &'static str {
        match self {
            MigrationKind::Rust => "rs",
            MigrationKind::Sql => "sql",
        }
    }
}
