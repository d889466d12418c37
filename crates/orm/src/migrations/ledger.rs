//! Ledger table bookkeeping
//!
//! The ledger records every applied migration with the batch it was applied
//! in: `migrations(id, migration UNIQUE, batch, migrated_at)`.

use chrono::NaiveDateTime;
use lovesta_core::config::validate_identifier;
use sqlx::Row;

use super::definitions::MigrationRecord;
use crate::backends::DatabaseValue;
use crate::connection::Connection;
use crate::error::OrmResult;

/// Ledger of applied migrations
#[derive(Debug, Clone)]
pub struct Ledger {
    connection: Connection,
    table: String,
}

impl Ledger {
    /// The table name is spliced into SQL, so it must be a bare identifier
    pub fn new(connection: Connection, table: impl Into<String>) -> OrmResult<Self> {
        let table = table.into();
        validate_identifier("migrations_table", &table)?;
        Ok(Self { connection, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL to create the ledger table
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                {},\n    \
                migration VARCHAR(255) NOT NULL UNIQUE,\n    \
                batch INT NOT NULL,\n    \
                migrated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
            )",
            self.table,
            self.connection.backend().auto_increment_id("id")
        )
    }

    /// Create the ledger table if it does not exist yet
    pub async fn ensure_table(&self) -> OrmResult<()> {
        self.connection
            .execute_unprepared(&self.create_table_sql())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create '{}' table: {}", self.table, e);
                e
            })?;
        tracing::info!("Ensured '{}' table exists.", self.table);
        Ok(())
    }

    /// Names of every applied migration, oldest batch first
    pub async fn applied_names(&self) -> OrmResult<Vec<String>> {
        let sql = format!(
            "SELECT migration FROM {} ORDER BY batch ASC, migration ASC",
            self.table
        );
        let rows = self.connection.query(&sql, &[]).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("migration").map_err(Into::into))
            .collect()
    }

    /// Every ledger row, oldest batch first
    pub async fn records(&self) -> OrmResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT migration, batch, {} AS migrated_at FROM {} ORDER BY batch ASC, migration ASC",
            self.connection.backend().timestamp_as_text("migrated_at"),
            self.table
        );
        let rows = self.connection.query(&sql, &[]).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let applied_at: Option<String> = row.try_get("migrated_at")?;
            records.push(MigrationRecord {
                name: row.try_get("migration")?,
                batch: batch_value(&row, "batch")?,
                applied_at: applied_at.as_deref().and_then(parse_timestamp),
            });
        }
        Ok(records)
    }

    /// Highest batch number, 0 when the ledger is empty
    pub async fn latest_batch(&self) -> OrmResult<i64> {
        let sql = format!("SELECT COALESCE(MAX(batch), 0) AS latest FROM {}", self.table);
        let rows = self.connection.query(&sql, &[]).await?;
        match rows.first() {
            Some(row) => batch_value(row, "latest"),
            None => Ok(0),
        }
    }

    pub async fn next_batch(&self) -> OrmResult<i64> {
        Ok(self.latest_batch().await? + 1)
    }

    /// Migrations recorded in `batch`, highest name first
    pub async fn names_in_batch(&self, batch: i64) -> OrmResult<Vec<String>> {
        let sql = format!(
            "SELECT migration FROM {} WHERE batch = {} ORDER BY migration DESC",
            self.table,
            self.connection.backend().placeholder(1)
        );
        let rows = self.connection.query(&sql, &[batch.into()]).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("migration").map_err(Into::into))
            .collect()
    }

    /// Record `name` as applied in `batch`
    pub async fn record(&self, name: &str, batch: i64) -> OrmResult<()> {
        let sql = format!(
            "INSERT INTO {} (migration, batch) VALUES ({})",
            self.table,
            self.connection.backend().placeholders(2)
        );
        self.connection
            .execute(&sql, &[DatabaseValue::from(name), batch.into()])
            .await?;
        Ok(())
    }

    /// Remove `name` from the ledger
    pub async fn remove(&self, name: &str) -> OrmResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE migration = {}",
            self.table,
            self.connection.backend().placeholder(1)
        );
        self.connection.execute(&sql, &[name.into()]).await?;
        Ok(())
    }
}

/// Batch columns are `INT`, which some drivers hand back as 32-bit
fn batch_value(row: &sqlx::any::AnyRow, column: &str) -> OrmResult<i64> {
    match row.try_get::<i64, _>(column) {
        Ok(value) => Ok(value),
        Err(_) => Ok(i64::from(row.try_get::<i32, _>(column)?)),
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
