use crate::config::{ConfigError, DatabaseConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    /// Application root; `database/`, `plugins/`, `config/` and `storage/` live here
    pub base_path: PathBuf,
    pub log_level: String,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Configuration file holding the `database` section, relative to the base path
    pub const DATABASE_CONFIG_FILE: &'static str = "config/database.yaml";

    /// Create a default configuration rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            environment: Environment::Production,
            base_path: base_path.into(),
            log_level: "info".to_string(),
            database: DatabaseConfig::default(),
        }
    }

    /// Load configuration for the application rooted at `base_path`,
    /// reading `config/database.yaml` when present.
    pub fn load(base_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::new(base_path);

        let database_file = config.base_path.join(Self::DATABASE_CONFIG_FILE);
        if database_file.is_file() {
            config.database = DatabaseConfig::from_file(&database_file)?;
            config.database.resolve_relative_paths(&config.base_path);
        }

        Ok(config)
    }

    /// Load configuration rooted at `APP_BASE_PATH`, or the working
    /// directory, with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_path = match env::var("APP_BASE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => env::current_dir()?,
        };
        Self::load(base_path)?.with_env()
    }

    /// Apply the `APP_ENV`, `LOG_LEVEL`, `DB_CONNECTION` and `DATABASE_URL` overrides
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(env_str) = env::var("APP_ENV") {
            self.environment = env_str.parse()?;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.log_level = level;
        }

        if let Ok(name) = env::var("DB_CONNECTION") {
            self.database.default = name;
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.apply_database_url(&url);
        }

        self.database.validate()?;
        Ok(self)
    }

    /// `<base>/storage/logs`
    pub fn log_directory(&self) -> PathBuf {
        self.base_path.join("storage").join("logs")
    }

    /// Log file written by the migration commands
    pub fn migrations_log_file(&self) -> PathBuf {
        self.log_directory().join("migrations.log")
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}
