use anyhow::{bail, Context};
use lovesta_orm::{MigrationManager, MigrationRunner, MigrationState};
use std::path::{Path, PathBuf};

/// What `lovesta migrate [TARGET]` operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationTarget {
    /// Every discovered migration directory
    All,
    /// The `migrations` directory of one plugin
    Plugin(String),
    /// The directory holding one migration file
    File(String),
}

impl MigrationTarget {
    /// `all` (or nothing), a file name with a migration extension, or a plugin slug
    pub fn parse(target: Option<&str>, manager: &MigrationManager) -> Self {
        match target {
            None | Some("all") => MigrationTarget::All,
            Some(value) => {
                let is_file = Path::new(value)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| manager.config().is_migration_extension(ext));
                if is_file {
                    MigrationTarget::File(value.to_string())
                } else {
                    MigrationTarget::Plugin(value.to_string())
                }
            }
        }
    }

    /// Directories the target selects
    pub fn resolve_paths(&self, manager: &MigrationManager) -> anyhow::Result<Vec<PathBuf>> {
        match self {
            MigrationTarget::All => {
                let paths = manager.all_migration_paths()?;
                if paths.is_empty() {
                    bail!("No migration paths found in any discovered location.");
                }
                Ok(paths)
            }
            MigrationTarget::File(file) => {
                let base_name = Path::new(file)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .with_context(|| format!("Invalid migration file name \"{}\"", file))?;
                match manager.find_migration_file(base_name)? {
                    Some(path) => Ok(path.parent().map(Path::to_path_buf).into_iter().collect()),
                    None => bail!("Migration file \"{}\" not found in any discovered path.", file),
                }
            }
            MigrationTarget::Plugin(slug) => {
                let path = manager.plugin_migrations_path(slug);
                if !path.is_dir() {
                    bail!(
                        "Migration directory for plugin \"{}\" not found at \"{}\".",
                        slug,
                        path.display()
                    );
                }
                Ok(vec![path])
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            MigrationTarget::All => "Migrating all discovered paths...".to_string(),
            MigrationTarget::Plugin(slug) => format!("Migrating plugin: {}", slug),
            MigrationTarget::File(file) => format!("Migrating specific file: {}", file),
        }
    }
}

/// Which runner operation `migrate` performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateMode {
    Run,
    Rollback,
    Fresh,
}

impl MigrateMode {
    pub fn from_flags(rollback: bool, fresh: bool) -> Self {
        if rollback {
            MigrateMode::Rollback
        } else if fresh {
            MigrateMode::Fresh
        } else {
            MigrateMode::Run
        }
    }
}

/// Run, roll back or refresh migrations and print the outcome
pub async fn migrate(runner: &MigrationRunner, target: &MigrationTarget, mode: MigrateMode) -> anyhow::Result<Vec<String>> {
    println!("Running migration command...");
    println!("{}", target.describe());
    let paths = target.resolve_paths(runner.manager())?;

    match mode {
        MigrateMode::Rollback => {
            println!("Rolling back migrations...");
            let rolled_back = runner.rollback().await?;
            if rolled_back.is_empty() {
                println!("No migrations to rollback.");
            } else {
                println!("Rolled back {} migration(s).", rolled_back.len());
                print_names(&rolled_back);
            }
            Ok(rolled_back)
        }
        MigrateMode::Fresh => {
            println!("Running fresh migrations (rollback all and then run)...");
            let migrated = runner.fresh(&runner.all_migration_paths()?).await?;
            if migrated.is_empty() {
                println!("No new migrations were run.");
            } else {
                println!("Successfully ran {} migration(s).", migrated.len());
                print_names(&migrated);
            }
            Ok(migrated)
        }
        MigrateMode::Run => {
            println!("Running migrations...");
            let migrated = runner.run(&paths).await?;
            if migrated.is_empty() {
                println!("Nothing to migrate.");
            } else {
                println!("Successfully ran {} migration(s).", migrated.len());
                print_names(&migrated);
            }
            Ok(migrated)
        }
    }
}

/// Print every discovered migration with its batch, or as JSON
pub async fn status(runner: &MigrationRunner, json: bool) -> anyhow::Result<()> {
    let paths = runner.all_migration_paths()?;
    let statuses = runner.status(&paths).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("Migration Status:");
    println!("================");
    if statuses.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    for status in &statuses {
        match status.state {
            MigrationState::Applied { batch } => println!("  [batch {:>3}] {}", batch, status.name),
            MigrationState::Pending => println!("  [pending  ] {}", status.name),
        }
    }

    let pending = statuses.iter().filter(|status| !status.is_applied()).count();
    println!();
    println!("{} applied, {} pending", statuses.len() - pending, pending);
    Ok(())
}

fn print_names(names: &[String]) {
    for name in names {
        println!(" - {}", name);
    }
}
