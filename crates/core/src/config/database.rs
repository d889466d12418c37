//! Database configuration: a set of named connections and the name of the
//! one used by default.

use crate::config::validation::{validate_identifier, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top level `database` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Name of the connection used when none is requested explicitly
    #[serde(default = "default_connection_name")]
    pub default: String,
    /// Named connection definitions
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,
    /// Table that records applied migrations
    #[serde(default = "default_migrations_table")]
    pub migrations_table: String,
}

/// A single named connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name, or the file path for SQLite
    #[serde(default)]
    pub database: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Full connection URL; takes precedence over the individual fields
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_connection_name() -> String {
    "mysql".to_string()
}

fn default_migrations_table() -> String {
    "migrations".to_string()
}

fn default_driver() -> String {
    "mysql".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_username() -> String {
    "root".to_string()
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_max_connections() -> u32 {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default: default_connection_name(),
            connections: BTreeMap::new(),
            migrations_table: default_migrations_table(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: default_host(),
            port: None,
            database: String::new(),
            username: default_username(),
            password: String::new(),
            charset: default_charset(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl ConnectionConfig {
    /// A SQLite connection backed by a file named in `database` rather than a url
    pub fn is_sqlite_file(&self) -> bool {
        self.url.is_none()
            && self.driver.to_lowercase().starts_with("sqlite")
            && !self.database.is_empty()
            && !self.database.starts_with(":memory:")
    }
}

impl DatabaseConfig {
    /// Parse a `database.yaml` document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `database.yaml` file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Single SQLite connection named `sqlite`, used as the default
    pub fn sqlite(path: impl AsRef<Path>) -> Self {
        let mut connections = BTreeMap::new();
        connections.insert(
            "sqlite".to_string(),
            ConnectionConfig {
                driver: "sqlite".to_string(),
                database: path.as_ref().to_string_lossy().into_owned(),
                ..ConnectionConfig::default()
            },
        );

        Self {
            default: "sqlite".to_string(),
            connections,
            migrations_table: default_migrations_table(),
        }
    }

    /// Anchor relative SQLite file paths at `base`, the application root
    pub fn resolve_relative_paths(&mut self, base: &Path) {
        for connection in self.connections.values_mut() {
            if !connection.is_sqlite_file() {
                continue;
            }
            let path = Path::new(&connection.database);
            if path.is_relative() {
                connection.database = base.join(path).to_string_lossy().into_owned();
            }
        }
    }

    /// Look up a named connection
    pub fn connection(&self, name: &str) -> Result<&ConnectionConfig, ConfigError> {
        self.connections
            .get(name)
            .ok_or_else(|| ConfigError::UnknownConnection {
                name: name.to_string(),
            })
    }

    /// The connection selected by `default`
    pub fn default_connection(&self) -> Result<&ConnectionConfig, ConfigError> {
        self.connection(&self.default)
    }

    /// Point the default connection at `url`, creating the entry if needed.
    pub fn apply_database_url(&mut self, url: &str) {
        let entry = self
            .connections
            .entry(self.default.clone())
            .or_insert_with(|| ConnectionConfig {
                driver: driver_from_url(url).unwrap_or_else(default_driver),
                ..ConnectionConfig::default()
            });
        entry.url = Some(url.to_string());
        if let Some(driver) = driver_from_url(url) {
            entry.driver = driver;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("database.migrations_table", &self.migrations_table)?;
        for (name, connection) in &self.connections {
            if connection.max_connections == 0 {
                return Err(ConfigError::invalid_value(
                    format!("database.connections.{}.max_connections", name),
                    "0",
                    "at least one connection",
                ));
            }
        }
        Ok(())
    }
}

fn driver_from_url(url: &str) -> Option<String> {
    let (scheme, _) = url.split_once(':')?;
    if scheme.is_empty() {
        None
    } else {
        Some(scheme.to_lowercase())
    }
}
