//! # Logging bootstrap
//!
//! Installs a `tracing` subscriber for the command line tools: human
//! readable output on stderr plus an optional plain-text log file such as
//! `storage/logs/migrations.log`.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Environment filter (supports filters like "lovesta_orm=debug,sqlx=warn")
    pub env_filter: Option<String>,
    /// Emit JSON lines on stderr instead of text
    pub json_format: bool,
    /// Append a copy of every event to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            env_filter: None,
            json_format: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Also write events to `path`; parent directories are created on init
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_format = true;
        self
    }
}

/// Initialize logging for the process.
///
/// `RUST_LOG` wins over the configured filter. Fails if a global subscriber
/// is already installed or the log file cannot be opened.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = config.env_filter.as_deref().unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(env_filter))?;

    let log_file = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Some(OpenOptions::new().create(true).append(true).open(path)?)
        }
        None => None,
    };

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .with(log_file.map(|file| Layer::new().with_ansi(false).with_writer(Mutex::new(file))))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(false))
            .with(log_file.map(|file| Layer::new().with_ansi(false).with_writer(Mutex::new(file))))
            .try_init()?;
    }

    tracing::debug!(
        target: "lovesta::logging",
        "Logging initialized (level: {}, file: {:?})",
        config.level,
        config.file
    );

    Ok(())
}
