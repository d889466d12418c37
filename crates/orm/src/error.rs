//! Error types for the ORM and migration system
//!
//! Connection and configuration problems, SQL failures (carrying the
//! offending statement), and the discovery/resolution failures of the
//! migration runner.

use std::path::PathBuf;
use thiserror::Error;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for ORM and migration operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Missing or invalid connection configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The driver refused the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed; keeps the SQL text next to the driver error
    #[error("SQL execution failed: {source}\nSQL: {sql}")]
    SqlExecution {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// Driver error outside of a specific statement (row decoding, ...)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid table definition or insert data
    #[error("Schema error: {0}")]
    Schema(String),

    /// A migration file was found but nothing is registered under its class
    #[error("Migration class not found: {class} in {}", .file.display())]
    ClassResolution { class: String, file: PathBuf },

    /// The migration cannot be reverted
    #[error("Migration {0} does not have a down method")]
    MissingDown(String),

    /// Two migration files share a base name
    #[error("Duplicate migration {name}: found in {} and {}", .first.display(), .second.display())]
    DuplicateMigration {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// `up()` failed; migrations applied earlier in the batch stay recorded
    #[error("Error migrating {migration}: {source}")]
    MigrationFailed {
        migration: String,
        #[source]
        source: Box<OrmError>,
    },

    /// `down()` failed; migrations reverted earlier in the batch stay removed
    #[error("Error rolling back {migration}: {source}")]
    RollbackFailed {
        migration: String,
        #[source]
        source: Box<OrmError>,
    },

    /// A rollback pass left the batch untouched, so it can never be emptied
    #[error("Rollback of batch {batch} made no progress; remaining migrations cannot be reverted")]
    RollbackStalled { batch: i64 },

    /// General migration error, also the natural choice inside `up`/`down`
    #[error("Migration error: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    pub(crate) fn sql(sql: &str, source: sqlx::Error) -> Self {
        OrmError::SqlExecution {
            sql: sql.to_string(),
            source,
        }
    }
}

impl From<lovesta_core::ConfigError> for OrmError {
    fn from(err: lovesta_core::ConfigError) -> Self {
        OrmError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_execution_message_includes_statement() {
        let err = OrmError::sql("CREATE TABLE broken (", sqlx::Error::RowNotFound);
        let message = err.to_string();
        assert!(message.starts_with("SQL execution failed:"));
        assert!(message.ends_with("SQL: CREATE TABLE broken ("));
    }

    #[test]
    fn test_migration_failed_names_migration() {
        let err = OrmError::MigrationFailed {
            migration: "2025-01-01_000000_create_users".to_string(),
            source: Box::new(OrmError::Migration("boom".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Error migrating 2025-01-01_000000_create_users: Migration error: boom"
        );
    }
}
