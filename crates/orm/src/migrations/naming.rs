//! Class and namespace derivation for migration files
//!
//! A file `plugins/home/migrations/2025-07-21_160532_create_home_table.rs`
//! resolves to `Home.Migrations.CreateHomeTable`. Both halves are pure
//! functions of the path so the namespace map can be rebuilt and passed
//! around explicitly on every runner call.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use super::definitions::MigrationConfig;

/// Namespace of the application's own `database/migrations` directory
pub const APP_MIGRATIONS_NAMESPACE: &str = "App.Database.Migrations";

/// Namespace root for directories that are neither plugins nor `database/migrations`
pub const APP_NAMESPACE: &str = "App";

static TIMESTAMP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{6}_").expect("timestamp prefix pattern is valid"));

/// `2025-07-21_160532_create_home_table` → `CreateHomeTable`
pub fn class_name_from_file_name(base_name: &str) -> String {
    let name = TIMESTAMP_PREFIX.replace(base_name, "");
    let joined: String = name.split('_').map(capitalize).collect();
    capitalize(&joined)
}

/// Title-case underscore or space separated words and join them: `blog_posts` → `BlogPosts`
pub fn studly(value: &str) -> String {
    value
        .split(|c| c == '_' || c == ' ')
        .map(capitalize)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Namespace for the migrations stored in `path`.
///
/// Plugin directories map to `<StudlySlug>.Migrations`, the application's
/// migration directory to [`APP_MIGRATIONS_NAMESPACE`], and anything else
/// under the base path to `App.` followed by its studly-cased components.
pub fn namespace_for_path(config: &MigrationConfig, path: &Path) -> String {
    let relative = path.strip_prefix(&config.base_path).unwrap_or(path);

    if let Ok(rest) = relative.strip_prefix(&config.plugins_dir) {
        if let Some(slug) = first_component(rest) {
            return format!("{}.Migrations", studly(&slug));
        }
    }

    if relative.starts_with(&config.database_dir) {
        return APP_MIGRATIONS_NAMESPACE.to_string();
    }

    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(studly(&part.to_string_lossy())),
            _ => None,
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        APP_NAMESPACE.to_string()
    } else {
        format!("{}.{}", APP_NAMESPACE, segments.join("."))
    }
}

/// Path to namespace mapping for every directory in `paths`
pub fn namespace_map<P: AsRef<Path>>(config: &MigrationConfig, paths: &[P]) -> HashMap<PathBuf, String> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_path_buf(), namespace_for_path(config, path))
        })
        .collect()
}

fn first_component(path: &Path) -> Option<String> {
    path.components().find_map(|component| match component {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}
