//! # lovesta-cli
//!
//! The `lovesta` console: `migrate`, `migrate:status` and `make:migration`.
//!
//! Rust migrations are plain structs, so the binary that runs them has to
//! know about them. Applications build their own binary around [`run`] and
//! pass a registry holding their migrations:
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let registry = MigrationRegistry::new()
//!         .with::<CreateUsers>("App.Database.Migrations.CreateUsers");
//!     lovesta_cli::main_with(registry).await
//! }
//! ```

pub mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lovesta_core::{init_logging, AppConfig, LoggingConfig};
use lovesta_orm::{Connection, MigrationConfig, MigrationKind, MigrationManager, MigrationRegistry, MigrationRunner};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::migrate::{MigrateMode, MigrationTarget};

#[derive(Debug, Parser)]
#[command(name = "lovesta")]
#[command(about = "Lovesta framework console", version)]
pub struct Cli {
    /// Application root (defaults to APP_BASE_PATH or the working directory)
    #[arg(long, global = true)]
    pub base_path: Option<PathBuf>,

    /// Log SQL and discovery details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run, roll back or refresh database migrations
    Migrate {
        /// "all", a plugin slug (e.g. auth_login) or a migration file name
        target: Option<String>,

        /// Roll back the last batch of migrations
        #[arg(short, long)]
        rollback: bool,

        /// Roll back every migration and run them again from scratch
        #[arg(short, long, conflicts_with = "rollback")]
        fresh: bool,

        /// Allow --fresh when APP_ENV is production
        #[arg(long)]
        force: bool,
    },

    /// Show applied and pending migrations
    #[command(name = "migrate:status")]
    MigrateStatus {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new migration file
    #[command(name = "make:migration")]
    MakeMigration {
        /// Migration name, e.g. "create users table"
        name: String,

        /// Plugin slug, or "database" for the application's migrations
        #[arg(short, long, default_value = "database")]
        plugin: String,

        /// Generate an SQL script instead of a Rust migration
        #[arg(long)]
        sql: bool,
    },
}

/// Load the application configuration for `base_path`, or from the environment
pub fn load_config(base_path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match base_path {
        Some(path) => AppConfig::load(path)?.with_env()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Execute a parsed command line with the host's migrations
pub async fn run(cli: Cli, registry: MigrationRegistry) -> anyhow::Result<()> {
    let config = load_config(cli.base_path)?;

    let mut logging = LoggingConfig::new(config.log_level.clone()).with_file(config.migrations_log_file());
    if cli.verbose {
        logging = logging.with_env_filter("debug,sqlx=warn");
    }
    if std::env::var("LOG_FORMAT").map_or(false, |format| format.eq_ignore_ascii_case("json")) {
        logging = logging.json();
    }
    if let Err(e) = init_logging(logging) {
        eprintln!("Logging not initialized: {}", e);
    }

    let migration_config = MigrationConfig::from(&config);

    match cli.command {
        Commands::MakeMigration { name, plugin, sql } => {
            let kind = if sql { MigrationKind::Sql } else { MigrationKind::Rust };
            let manager = MigrationManager::with_config(migration_config);
            commands::make::migration(&manager, &name, &plugin, kind)?;
        }
        Commands::Migrate {
            target,
            rollback,
            fresh,
            force,
        } => {
            let mode = MigrateMode::from_flags(rollback, fresh);
            if mode == MigrateMode::Fresh && config.environment.is_production() && !force {
                anyhow::bail!("Cannot run fresh migrations in the production environment without --force");
            }

            let runner = open_runner(&config, registry, migration_config).await?;
            let target = MigrationTarget::parse(target.as_deref(), runner.manager());
            let result = commands::migrate::migrate(&runner, &target, mode).await;
            runner.connection().close().await;
            result?;
        }
        Commands::MigrateStatus { json } => {
            let runner = open_runner(&config, registry, migration_config).await?;
            let result = commands::migrate::status(&runner, json).await;
            runner.connection().close().await;
            result?;
        }
    }

    Ok(())
}

async fn open_runner(
    config: &AppConfig,
    registry: MigrationRegistry,
    migration_config: MigrationConfig,
) -> anyhow::Result<MigrationRunner> {
    let connection = Connection::from_config(&config.database)?;
    let runner = MigrationRunner::new(connection, registry, migration_config)
        .await
        .with_context(|| format!("Could not prepare the '{}' ledger table", config.database.migrations_table))?;
    Ok(runner)
}

/// Parse `std::env::args`, run, and map the outcome to an exit code
pub async fn main_with(registry: MigrationRegistry) -> ExitCode {
    let cli = Cli::parse();
    match run(cli, registry).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("An error occurred during migration: {:#}", e);
            tracing::error!("Migration CLI Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
