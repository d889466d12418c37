//! Migration Manager - File system operations for migrations
//!
//! Locates migration directories (the application's and every plugin's),
//! lists the migration files inside them and scaffolds new ones.

use chrono::{Local, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{MigrationConfig, MigrationFile, MigrationKind};
use super::naming::{class_name_from_file_name, namespace_for_path, namespace_map, APP_MIGRATIONS_NAMESPACE};
use crate::error::{OrmError, OrmResult};
use crate::plugins::discover_plugins;

/// Target directory name selecting the application's own migrations
pub const APP_MIGRATIONS_TARGET: &str = "database";

/// Timestamp prefix of generated migration files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Migration manager for locating and creating migration files
#[derive(Debug, Clone, Default)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The application's migration directory (if present) followed by every
    /// plugin's `migrations` directory (if present), plugins sorted by slug
    pub fn all_migration_paths(&self) -> OrmResult<Vec<PathBuf>> {
        let mut paths = Vec::new();

        let app_path = self.config.app_migrations_path();
        if app_path.is_dir() {
            paths.push(app_path);
        }

        for plugin in discover_plugins(&self.config.plugins_path())? {
            let migrations_dir = plugin.migrations_dir();
            if migrations_dir.is_dir() {
                paths.push(migrations_dir);
            }
        }

        Ok(paths)
    }

    /// `migrations` directory of the plugin `slug`, whether or not it exists yet
    pub fn plugin_migrations_path(&self, slug: &str) -> PathBuf {
        self.config.plugins_path().join(slug).join("migrations")
    }

    /// First file named `<base_name>.<ext>` in any known migration directory
    pub fn find_migration_file(&self, base_name: &str) -> OrmResult<Option<PathBuf>> {
        for directory in self.all_migration_paths()? {
            for extension in &self.config.extensions {
                let candidate = directory.join(format!("{}.{}", base_name, extension));
                if candidate.is_file() {
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }

    /// Namespace for each of `paths`
    pub fn namespace_map<P: AsRef<Path>>(&self, paths: &[P]) -> HashMap<PathBuf, String> {
        namespace_map(&self.config, paths)
    }

    /// Describe a single migration file
    pub fn migration_file(&self, path: &Path, namespaces: &HashMap<PathBuf, String>) -> OrmResult<MigrationFile> {
        let base_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| OrmError::Migration(format!("Invalid migration filename: {}", path.display())))?
            .to_string();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let namespace = namespaces
            .get(&directory)
            .cloned()
            .unwrap_or_else(|| namespace_for_path(&self.config, &directory));

        Ok(MigrationFile {
            absolute_path: path.to_path_buf(),
            class_name: class_name_from_file_name(&base_name),
            directory,
            base_name,
            namespace,
        })
    }

    /// Every migration file directly inside `paths`, keyed and sorted by base name.
    ///
    /// Missing directories are skipped. Two files sharing a base name fail with
    /// [`OrmError::DuplicateMigration`].
    pub fn discover<P: AsRef<Path>>(
        &self,
        paths: &[P],
        namespaces: &HashMap<PathBuf, String>,
    ) -> OrmResult<BTreeMap<String, MigrationFile>> {
        let mut files: BTreeMap<String, MigrationFile> = BTreeMap::new();

        for directory in paths {
            let directory = directory.as_ref();
            if !directory.is_dir() {
                tracing::warn!("Migration path not found: {}", directory.display());
                continue;
            }

            for path in self.list_migration_files(directory)? {
                let file = self.migration_file(&path, namespaces)?;
                if let Some(existing) = files.get(&file.base_name) {
                    return Err(OrmError::DuplicateMigration {
                        name: file.base_name.clone(),
                        first: existing.absolute_path.clone(),
                        second: file.absolute_path,
                    });
                }
                files.insert(file.base_name.clone(), file);
            }
        }

        Ok(files)
    }

    fn list_migration_files(&self, directory: &Path) -> OrmResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let is_migration = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| self.config.is_migration_extension(ext));
            if is_migration {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Create a new migration file for `target` (`database` or a plugin slug)
    pub fn create_migration(&self, name: &str, target: &str, kind: MigrationKind) -> OrmResult<PathBuf> {
        self.create_migration_at(name, target, kind, Local::now().naive_local())
    }

    /// [`create_migration`](Self::create_migration) with an explicit timestamp
    pub fn create_migration_at(
        &self,
        name: &str,
        target: &str,
        kind: MigrationKind,
        timestamp: NaiveDateTime,
    ) -> OrmResult<PathBuf> {
        let snake_name = snake_migration_name(name);
        if snake_name.is_empty() {
            return Err(OrmError::Migration("Migration name cannot be empty".to_string()));
        }

        let (directory, namespace) = if target == APP_MIGRATIONS_TARGET {
            (self.config.app_migrations_path(), APP_MIGRATIONS_NAMESPACE.to_string())
        } else {
            let plugin_path = self.config.plugins_path().join(target);
            if !plugin_path.is_dir() {
                return Err(OrmError::Migration(format!(
                    "Plugin \"{}\" not found at \"{}\"",
                    target,
                    plugin_path.display()
                )));
            }
            let directory = plugin_path.join("migrations");
            let namespace = namespace_for_path(&self.config, &directory);
            (directory, namespace)
        };

        if !directory.is_dir() {
            fs::create_dir_all(&directory)?;
            tracing::info!("Created directory: {}", directory.display());
        }

        let base_name = format!("{}_{}", timestamp.format(TIMESTAMP_FORMAT), snake_name);
        let path = directory.join(format!("{}.{}", base_name, kind.extension()));
        if path.exists() {
            return Err(OrmError::Migration(format!(
                "Migration file \"{}\" already exists at \"{}\"",
                base_name,
                path.display()
            )));
        }

        let class_name = class_name_from_file_name(&base_name);
        let content = match kind {
            MigrationKind::Rust => rust_template(&class_name, &namespace, &snake_name),
            MigrationKind::Sql => sql_template(&base_name, &snake_name, timestamp),
        };
        fs::write(&path, content)?;

        tracing::info!("Created migration {} ({}.{})", path.display(), namespace, class_name);
        Ok(path)
    }
}

/// `Create Blog-Posts` → `create_blog_posts`
pub fn snake_migration_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['-', ' '], "_")
}

fn rust_template(class_name: &str, namespace: &str, table: &str) -> String {
    format!(
        r#"//! Register in the host binary with:
//!
//!     registry.register_default::<{class}>("{namespace}.{class}");

use lovesta_orm::{{async_trait, Migration, OrmResult, Schema}};

#[derive(Debug, Default)]
pub struct {class};

#[async_trait]
impl Migration for {class} {{
    async fn up(&self, schema: &Schema) -> OrmResult<()> {{
        schema
            .table("{table}")
            .add_column("id INT AUTO_INCREMENT")
            .add_column("created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP")
            .add_primary_key("id")
            .create()
            .await
    }}

    async fn down(&self, schema: &Schema) -> OrmResult<()> {{
        schema.drop_table("{table}").await
    }}
}}
"#,
        class = class_name,
        namespace = namespace,
        table = table
    )
}

fn sql_template(base_name: &str, table: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "-- Migration: {}\n\
         -- Created: {}\n\n\
         -- Up migration\n\
         CREATE TABLE IF NOT EXISTS {} (id INT PRIMARY KEY);\n\n\
         -- Down migration\n\
         DROP TABLE IF EXISTS {};\n",
        base_name,
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        table,
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn manager(root: &Path) -> MigrationManager {
        MigrationManager::with_config(MigrationConfig::new(root))
    }

    fn touch(path: PathBuf) -> PathBuf {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        path
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 21)
            .unwrap()
            .and_hms_opt(16, 5, 32)
            .unwrap()
    }

    #[test]
    fn test_all_migration_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("database/migrations")).unwrap();
        fs::create_dir_all(root.join("plugins/shop/migrations")).unwrap();
        fs::create_dir_all(root.join("plugins/blog/migrations")).unwrap();
        fs::create_dir_all(root.join("plugins/no_migrations")).unwrap();

        let paths = manager(root).all_migration_paths().unwrap();
        assert_eq!(
            paths,
            vec![
                root.join("database/migrations"),
                root.join("plugins/blog/migrations"),
                root.join("plugins/shop/migrations"),
            ]
        );
    }

    #[test]
    fn test_discover_sorted_with_namespaces() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root.join("plugins/home/migrations/2025-07-21_160532_create_home_table.rs"));
        touch(root.join("database/migrations/2025-01-01_000000_create_users.rs"));
        touch(root.join("database/migrations/notes.txt"));

        let manager = manager(root);
        let paths = manager.all_migration_paths().unwrap();
        let files = manager.discover(&paths, &manager.namespace_map(&paths)).unwrap();

        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["2025-01-01_000000_create_users", "2025-07-21_160532_create_home_table"]
        );
        assert_eq!(
            files["2025-07-21_160532_create_home_table"].full_class_name(),
            "Home.Migrations.CreateHomeTable"
        );
        assert_eq!(
            files["2025-01-01_000000_create_users"].full_class_name(),
            "App.Database.Migrations.CreateUsers"
        );
    }

    #[test]
    fn test_discover_rejects_duplicate_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root.join("plugins/a/migrations/2025-01-01_000000_create_settings.rs"));
        touch(root.join("plugins/b/migrations/2025-01-01_000000_create_settings.sql"));

        let manager = manager(root);
        let paths = manager.all_migration_paths().unwrap();
        let err = manager.discover(&paths, &manager.namespace_map(&paths)).unwrap_err();
        assert!(matches!(err, OrmError::DuplicateMigration { ref name, .. } if name == "2025-01-01_000000_create_settings"));
    }

    #[test]
    fn test_discover_skips_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(temp_dir.path());
        let missing = vec![temp_dir.path().join("database/migrations")];
        let files = manager.discover(&missing, &manager.namespace_map(&missing)).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_find_migration_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let expected = touch(root.join("plugins/home/migrations/2025-07-21_160532_create_home_table.sql"));

        let manager = manager(root);
        assert_eq!(
            manager.find_migration_file("2025-07-21_160532_create_home_table").unwrap(),
            Some(expected)
        );
        assert_eq!(manager.find_migration_file("2025-07-21_160532_missing").unwrap(), None);
    }

    #[test]
    fn test_create_app_migration() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(temp_dir.path());

        let path = manager
            .create_migration_at("Create Blog-Posts", APP_MIGRATIONS_TARGET, MigrationKind::Rust, timestamp())
            .unwrap();

        assert_eq!(
            path,
            temp_dir
                .path()
                .join("database/migrations/2025-07-21_160532_create_blog_posts.rs")
        );
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("pub struct CreateBlogPosts;"));
        assert!(content.contains("\"App.Database.Migrations.CreateBlogPosts\""));
        assert!(content.contains(".table(\"create_blog_posts\")"));
    }

    #[test]
    fn test_create_plugin_sql_migration() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("plugins/home")).unwrap();
        let manager = manager(temp_dir.path());

        let path = manager
            .create_migration_at("seed pages", "home", MigrationKind::Sql, timestamp())
            .unwrap();

        assert!(path.ends_with("plugins/home/migrations/2025-07-21_160532_seed_pages.sql"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("-- Up migration"));
        assert!(content.contains("-- Down migration"));
    }

    #[test]
    fn test_create_refuses_unknown_plugin_and_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(temp_dir.path());

        let err = manager
            .create_migration_at("create pages", "missing", MigrationKind::Rust, timestamp())
            .unwrap_err();
        assert!(err.to_string().contains("Plugin \"missing\" not found"));

        manager
            .create_migration_at("create pages", APP_MIGRATIONS_TARGET, MigrationKind::Rust, timestamp())
            .unwrap();
        let err = manager
            .create_migration_at("create pages", APP_MIGRATIONS_TARGET, MigrationKind::Rust, timestamp())
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
