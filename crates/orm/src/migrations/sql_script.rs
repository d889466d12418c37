//! SQL script migrations
//!
//! A `.sql` migration carries both directions itself:
//!
//! ```sql
//! -- Up migration
//! CREATE TABLE pages (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
//!
//! -- Down migration
//! DROP TABLE pages;
//! ```
//!
//! Such files resolve without the registry. An empty down section makes the
//! migration non-reversible.

use async_trait::async_trait;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use std::path::Path;

use super::definitions::Migration;
use super::schema_builder::Schema;
use crate::backends::DatabaseBackendType;
use crate::error::{OrmError, OrmResult};

const UP_MARKER: &str = "-- up migration";
const DOWN_MARKER: &str = "-- down migration";

enum Section {
    Preamble,
    Up,
    Down,
}

/// Migration read from a `.sql` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScriptMigration {
    name: String,
    up_sql: String,
    down_sql: String,
}

impl SqlScriptMigration {
    /// Split `content` into its up and down sections
    pub fn parse(name: impl Into<String>, content: &str) -> OrmResult<Self> {
        let name = name.into();
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut section = Section::Preamble;

        for line in content.lines() {
            match line.trim().to_lowercase().as_str() {
                UP_MARKER => section = Section::Up,
                DOWN_MARKER => section = Section::Down,
                _ => match section {
                    Section::Preamble => {}
                    Section::Up => up.push(line),
                    Section::Down => down.push(line),
                },
            }
        }

        let up_sql = up.join("\n").trim().to_string();
        if up_sql.is_empty() {
            return Err(OrmError::Migration(format!(
                "{} has no statements under '-- Up migration'",
                name
            )));
        }

        Ok(Self {
            name,
            up_sql,
            down_sql: down.join("\n").trim().to_string(),
        })
    }

    /// Read and parse a migration file
    pub fn from_file(path: &Path) -> OrmResult<Self> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| OrmError::Migration(format!("Invalid migration filename: {}", path.display())))?;
        let content = std::fs::read_to_string(path)?;
        Self::parse(name, &content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn up_sql(&self) -> &str {
        &self.up_sql
    }

    pub fn down_sql(&self) -> &str {
        &self.down_sql
    }

    async fn execute(&self, schema: &Schema, sql: &str) -> OrmResult<()> {
        for statement in split_sql_statements(schema.backend(), sql) {
            schema.execute_sql(&statement, &[]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Migration for SqlScriptMigration {
    async fn up(&self, schema: &Schema) -> OrmResult<()> {
        self.execute(schema, &self.up_sql).await
    }

    async fn down(&self, schema: &Schema) -> OrmResult<()> {
        if self.down_sql.is_empty() {
            return Err(OrmError::MissingDown(self.name.clone()));
        }
        self.execute(schema, &self.down_sql).await
    }

    fn is_reversible(&self) -> bool {
        !self.down_sql.is_empty()
    }
}

/// Split SQL text into single statements using the backend's dialect.
///
/// Falls back to splitting on `;` when the parser rejects the text.
pub fn split_sql_statements(backend: DatabaseBackendType, sql: &str) -> Vec<String> {
    let dialect: Box<dyn Dialect> = match backend {
        DatabaseBackendType::MySQL => Box::new(MySqlDialect {}),
        DatabaseBackendType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseBackendType::SQLite => Box::new(SQLiteDialect {}),
    };

    match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => statements.iter().map(|statement| statement.to_string()).collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(str::trim)
                .filter(|statement| !statement.is_empty())
                .filter(|statement| !statement.lines().all(|line| line.trim().starts_with("--") || line.trim().is_empty()))
                .map(str::to_string)
                .collect()
        }
    }
}
