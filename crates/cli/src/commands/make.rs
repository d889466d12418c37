use lovesta_orm::{MigrationKind, MigrationManager, APP_MIGRATIONS_TARGET};
use std::path::PathBuf;

/// Create a migration file for `target` (`database` or a plugin slug)
pub fn migration(manager: &MigrationManager, name: &str, target: &str, kind: MigrationKind) -> anyhow::Result<PathBuf> {
    let location = if target == APP_MIGRATIONS_TARGET {
        "main database directory".to_string()
    } else {
        format!("plugin: {}", target)
    };
    println!("Attempting to create Migrations: {} in {}", name, location);

    let path = manager.create_migration(name, target, kind)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Migrations \"{}\" created successfully at \"{}\".", file_name, path.display());

    if kind == MigrationKind::Rust {
        println!("Register the new struct in your binary's MigrationRegistry before running it.");
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovesta_orm::MigrationConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_make_migration_in_plugin() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("plugins/auth_login")).unwrap();
        let manager = MigrationManager::with_config(MigrationConfig::new(temp_dir.path()));

        let path = migration(&manager, "Create Sessions", "auth_login", MigrationKind::Sql).unwrap();

        assert!(path.starts_with(temp_dir.path().join("plugins/auth_login/migrations")));
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.ends_with("_create_sessions.sql"));
    }

    #[test]
    fn test_make_migration_for_missing_plugin_fails() {
        let temp_dir = TempDir::new().unwrap();
        let manager = MigrationManager::with_config(MigrationConfig::new(temp_dir.path()));

        assert!(migration(&manager, "create sessions", "ghost", MigrationKind::Rust).is_err());
        assert!(!temp_dir.path().join("plugins/ghost").exists());
    }
}
