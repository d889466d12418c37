//! Database Backend Abstractions
//!
//! The migration system talks to MySQL, PostgreSQL and SQLite through the
//! sqlx `Any` driver. The differences it has to care about (placeholder
//! syntax, table options, auto-increment ids, index support) live here.

pub mod value;

pub use value::*;

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::MySQL => write!(f, "mysql"),
            DatabaseBackendType::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pgsql" => Ok(DatabaseBackendType::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseBackendType::MySQL),
            "sqlite" | "sqlite3" => Ok(DatabaseBackendType::SQLite),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}

impl DatabaseBackendType {
    /// URL scheme understood by the sqlx `Any` driver
    pub fn url_scheme(&self) -> &'static str {
        match self {
            DatabaseBackendType::PostgreSQL => "postgres",
            DatabaseBackendType::MySQL => "mysql",
            DatabaseBackendType::SQLite => "sqlite",
        }
    }

    /// Bind placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DatabaseBackendType::PostgreSQL => format!("${}", index),
            DatabaseBackendType::MySQL | DatabaseBackendType::SQLite => "?".to_string(),
        }
    }

    /// Comma separated placeholders for `count` parameters
    pub fn placeholders(&self, count: usize) -> String {
        (1..=count)
            .map(|index| self.placeholder(index))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Suffix appended to `CREATE TABLE` statements
    pub fn table_options(&self) -> &'static str {
        match self {
            DatabaseBackendType::MySQL => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite => "",
        }
    }

    /// Whether `KEY (...)` and `FULLTEXT KEY (...)` may appear inside `CREATE TABLE`
    pub fn supports_inline_indexes(&self) -> bool {
        matches!(self, DatabaseBackendType::MySQL)
    }

    /// Keyword for a unique constraint inside `CREATE TABLE`
    pub fn unique_key_clause(&self) -> &'static str {
        match self {
            DatabaseBackendType::MySQL => "UNIQUE KEY",
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite => "UNIQUE",
        }
    }

    /// Surrogate id column definition
    pub fn auto_increment_id(&self, column: &str) -> String {
        match self {
            DatabaseBackendType::MySQL => format!("{} INT AUTO_INCREMENT PRIMARY KEY", column),
            DatabaseBackendType::PostgreSQL => format!("{} SERIAL PRIMARY KEY", column),
            DatabaseBackendType::SQLite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", column),
        }
    }

    /// Expression reading a timestamp column as text, which every `Any`
    /// backend can decode
    pub fn timestamp_as_text(&self, column: &str) -> String {
        match self {
            DatabaseBackendType::MySQL => format!("CAST({} AS CHAR)", column),
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite => {
                format!("CAST({} AS TEXT)", column)
            }
        }
    }
}
