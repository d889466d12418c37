//! Migration Runner - Executes migrations against the database
//!
//! Discovers migration files, filters out the ones already in the ledger,
//! applies the rest in file-name order under one new batch and records
//! them. Rollback lives in [`super::rollback`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::definitions::{Migration, MigrationConfig, MigrationFile, MigrationState, MigrationStatus};
use super::ledger::Ledger;
use super::manager::MigrationManager;
use super::registry::MigrationRegistry;
use super::schema_builder::Schema;
use super::sql_script::SqlScriptMigration;
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};

/// Migration runner that executes migrations against a database
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    manager: MigrationManager,
    ledger: Ledger,
    schema: Schema,
    registry: Arc<MigrationRegistry>,
}

impl MigrationRunner {
    /// Create a runner and make sure the ledger table exists
    pub async fn new(
        connection: Connection,
        registry: impl Into<Arc<MigrationRegistry>>,
        config: MigrationConfig,
    ) -> OrmResult<Self> {
        let ledger = Ledger::new(connection.clone(), config.migrations_table.clone())?;
        ledger.ensure_table().await?;

        Ok(Self {
            manager: MigrationManager::with_config(config),
            ledger,
            schema: Schema::new(connection),
            registry: registry.into(),
        })
    }

    /// Get the migration manager
    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn connection(&self) -> &Connection {
        self.schema.connection()
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }

    /// See [`MigrationManager::all_migration_paths`]
    pub fn all_migration_paths(&self) -> OrmResult<Vec<PathBuf>> {
        self.manager.all_migration_paths()
    }

    /// See [`MigrationManager::find_migration_file`]
    pub fn find_migration_file(&self, base_name: &str) -> OrmResult<Option<PathBuf>> {
        self.manager.find_migration_file(base_name)
    }

    /// Apply every pending migration found in `paths` under one new batch.
    ///
    /// Returns the applied names in order. Files that cannot be resolved to a
    /// migration are logged and skipped. A failing `up` stops the run; the
    /// migrations applied before it stay recorded.
    pub async fn run<P: AsRef<Path>>(&self, paths: &[P]) -> OrmResult<Vec<String>> {
        let namespaces = self.manager.namespace_map(paths);
        let applied: HashSet<String> = self.ledger.applied_names().await?.into_iter().collect();

        let pending: Vec<MigrationFile> = self
            .manager
            .discover(paths, &namespaces)?
            .into_values()
            .filter(|file| !applied.contains(&file.base_name))
            .collect();

        if pending.is_empty() {
            tracing::info!("Nothing to migrate.");
            return Ok(Vec::new());
        }

        let batch = self.ledger.next_batch().await?;
        let mut migrated = Vec::new();

        for file in &pending {
            let migration = match self.resolve(file) {
                Ok(migration) => migration,
                Err(e) => {
                    tracing::error!("{}. Check namespace/class name.", e);
                    continue;
                }
            };

            if let Err(e) = migration.up(&self.schema).await {
                tracing::error!("Error migrating {}: {}", file.base_name, e);
                return Err(OrmError::MigrationFailed {
                    migration: file.base_name.clone(),
                    source: Box::new(e),
                });
            }

            self.ledger.record(&file.base_name, batch).await?;
            tracing::info!("Migrated: {} (Batch: {})", file.base_name, batch);
            migrated.push(file.base_name.clone());
        }

        if migrated.is_empty() {
            tracing::info!("Nothing to migrate.");
        } else {
            tracing::info!("Successfully migrated {} files in batch {}.", migrated.len(), batch);
        }
        Ok(migrated)
    }

    /// Every migration file in `paths` with its ledger state
    pub async fn status<P: AsRef<Path>>(&self, paths: &[P]) -> OrmResult<Vec<MigrationStatus>> {
        let namespaces = self.manager.namespace_map(paths);
        let records = self.ledger.records().await?;

        let statuses = self
            .manager
            .discover(paths, &namespaces)?
            .into_values()
            .map(|file| {
                let state = records
                    .iter()
                    .find(|record| record.name == file.base_name)
                    .map_or(MigrationState::Pending, |record| MigrationState::Applied {
                        batch: record.batch,
                    });
                MigrationStatus {
                    name: file.base_name,
                    path: file.absolute_path,
                    state,
                }
            })
            .collect();

        Ok(statuses)
    }

    /// Turn a discovered file into a runnable migration: SQL scripts are
    /// parsed, everything else is looked up in the registry by full class name
    pub fn resolve(&self, file: &MigrationFile) -> OrmResult<Box<dyn Migration>> {
        if file.is_sql_script() {
            return Ok(Box::new(SqlScriptMigration::from_file(&file.absolute_path)?));
        }

        let class = file.full_class_name();
        self.registry
            .resolve(&class)
            .ok_or_else(|| OrmError::ClassResolution {
                class,
                file: file.absolute_path.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lovesta_core::DatabaseConfig;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CreateUsers;

    #[async_trait]
    impl Migration for CreateUsers {
        async fn up(&self, schema: &Schema) -> OrmResult<()> {
            schema
                .table("users")
                .add_column("id INTEGER NOT NULL")
                .add_column("email TEXT NOT NULL")
                .add_primary_key("id")
                .create()
                .await
        }

        async fn down(&self, schema: &Schema) -> OrmResult<()> {
            schema.drop_table("users").await
        }
    }

    async fn runner(root: &Path, registry: MigrationRegistry) -> MigrationRunner {
        let connection = Connection::from_config(&DatabaseConfig::sqlite(root.join("app.db"))).unwrap();
        MigrationRunner::new(connection, registry, MigrationConfig::new(root))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unregistered_class_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let migrations = temp_dir.path().join("database/migrations");
        fs::create_dir_all(&migrations).unwrap();
        fs::write(migrations.join("2025-01-01_000000_create_users.rs"), "").unwrap();
        fs::write(migrations.join("2025-01-02_000000_create_posts.rs"), "").unwrap();

        let registry = MigrationRegistry::new().with::<CreateUsers>("App.Database.Migrations.CreateUsers");
        let runner = runner(temp_dir.path(), registry).await;

        let applied = runner.run(&[&migrations]).await.unwrap();
        assert_eq!(applied, vec!["2025-01-01_000000_create_users"]);

        let status = runner.status(&[&migrations]).await.unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].state, MigrationState::Applied { batch: 1 });
        assert_eq!(status[1].state, MigrationState::Pending);
    }

    #[tokio::test]
    async fn test_sql_script_resolves_without_registry() {
        let temp_dir = TempDir::new().unwrap();
        let migrations = temp_dir.path().join("database/migrations");
        fs::create_dir_all(&migrations).unwrap();
        fs::write(
            migrations.join("2025-02-01_000000_create_pages.sql"),
            "-- Up migration\nCREATE TABLE pages (id INTEGER PRIMARY KEY, title TEXT);\n\n-- Down migration\nDROP TABLE pages;\n",
        )
        .unwrap();

        let runner = runner(temp_dir.path(), MigrationRegistry::new()).await;
        let applied = runner.run(&[&migrations]).await.unwrap();
        assert_eq!(applied, vec!["2025-02-01_000000_create_pages"]);

        let rows = runner
            .connection()
            .query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'pages'", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_up_keeps_earlier_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let migrations = temp_dir.path().join("database/migrations");
        fs::create_dir_all(&migrations).unwrap();
        fs::write(migrations.join("2025-01-01_000000_create_users.rs"), "").unwrap();
        fs::write(
            migrations.join("2025-01-02_000000_broken.sql"),
            "-- Up migration\nINSERT INTO missing_table (id) VALUES (1);\n-- Down migration\n",
        )
        .unwrap();

        let registry = MigrationRegistry::new().with::<CreateUsers>("App.Database.Migrations.CreateUsers");
        let runner = runner(temp_dir.path(), registry).await;

        let err = runner.run(&[&migrations]).await.unwrap_err();
        assert!(matches!(err, OrmError::MigrationFailed { ref migration, .. } if migration == "2025-01-02_000000_broken"));
        assert_eq!(
            runner.ledger().applied_names().await.unwrap(),
            vec!["2025-01-01_000000_create_users"]
        );
    }
}
