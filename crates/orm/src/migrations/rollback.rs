//! Migration Rollback - Handles rolling back applied migrations
//!
//! Reverts the most recent batch in descending name order, and resets the
//! whole ledger for `fresh`.

use std::path::{Path, PathBuf};

use super::runner::MigrationRunner;
use crate::error::{OrmError, OrmResult};

impl MigrationRunner {
    /// Revert the highest batch.
    ///
    /// Migrations whose file is gone, whose class cannot be resolved, or that
    /// are not reversible are skipped with a log entry. A failing `down`
    /// stops the rollback; migrations reverted before it stay removed.
    pub async fn rollback(&self) -> OrmResult<Vec<String>> {
        let batch = self.ledger().latest_batch().await?;
        if batch == 0 {
            tracing::info!("No migrations to rollback.");
            return Ok(Vec::new());
        }

        // names_in_batch is already in descending order
        let names = self.ledger().names_in_batch(batch).await?;

        let mut located: Vec<(String, PathBuf)> = Vec::with_capacity(names.len());
        for name in names {
            match self.find_migration_file(&name)? {
                Some(path) => located.push((name, path)),
                None => tracing::warn!("Migration file not found for rollback: {}", name),
            }
        }

        let mut directories: Vec<PathBuf> = located
            .iter()
            .filter_map(|(_, path)| path.parent().map(Path::to_path_buf))
            .collect();
        directories.sort();
        directories.dedup();
        let namespaces = self.manager().namespace_map(&directories);

        let mut rolled_back = Vec::new();
        for (name, path) in &located {
            let file = self.manager().migration_file(path, &namespaces)?;
            let migration = match self.resolve(&file) {
                Ok(migration) => migration,
                Err(e) => {
                    tracing::error!("Migration class not found for rollback: {}", e);
                    continue;
                }
            };

            if !migration.is_reversible() {
                tracing::warn!("{}. Skipping rollback.", OrmError::MissingDown(file.full_class_name()));
                continue;
            }

            if let Err(e) = migration.down(self.schema()).await {
                tracing::error!("Error rolling back {}: {}", name, e);
                return Err(OrmError::RollbackFailed {
                    migration: name.clone(),
                    source: Box::new(e),
                });
            }

            self.ledger().remove(name).await?;
            tracing::info!("Rolled back: {} (Batch: {})", name, batch);
            rolled_back.push(name.clone());
        }

        if rolled_back.is_empty() {
            tracing::info!("No migrations rolled back in batch {}.", batch);
        } else {
            tracing::info!(
                "Successfully rolled back {} files in batch {}.",
                rolled_back.len(),
                batch
            );
        }
        Ok(rolled_back)
    }

    /// Revert batches until the ledger is empty, returning every reverted name.
    ///
    /// Fails with [`OrmError::RollbackStalled`] when a batch still has rows
    /// after a pass that reverted nothing.
    pub async fn rollback_all(&self) -> OrmResult<Vec<String>> {
        let mut rolled_back = Vec::new();

        loop {
            let batch = self.ledger().latest_batch().await?;
            if batch == 0 {
                break;
            }

            let reverted = self.rollback().await?;
            if reverted.is_empty() {
                return Err(OrmError::RollbackStalled { batch });
            }
            rolled_back.extend(reverted);
        }

        Ok(rolled_back)
    }

    /// Revert everything, then run every migration in `paths` from batch 1
    pub async fn fresh<P: AsRef<Path>>(&self, paths: &[P]) -> OrmResult<Vec<String>> {
        tracing::info!("Running fresh migration...");
        self.rollback_all().await?;
        self.run(paths).await
    }
}
