//! Plugin directory discovery
//!
//! Every immediate subdirectory of the plugins root is a plugin; its slug is
//! the directory name and its migrations live in `<plugin>/migrations`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::OrmResult;
use crate::migrations::naming::studly;

/// A plugin found under the plugins root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDir {
    pub slug: String,
    pub path: PathBuf,
}

impl PluginDir {
    pub fn migrations_dir(&self) -> PathBuf {
        self.path.join("migrations")
    }

    /// Namespace of the plugin's migrations, e.g. `BlogPosts.Migrations`
    pub fn namespace(&self) -> String {
        format!("{}.Migrations", studly(&self.slug))
    }
}

/// List the plugins below `root`, sorted by slug.
///
/// A missing root yields no plugins.
pub fn discover_plugins(root: &Path) -> OrmResult<Vec<PluginDir>> {
    if !root.is_dir() {
        tracing::warn!("Plugins directory not found: {}", root.display());
        return Ok(Vec::new());
    }

    let mut plugins = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(slug) = path.file_name().and_then(|name| name.to_str()) {
            plugins.push(PluginDir {
                slug: slug.to_string(),
                path: path.clone(),
            });
        }
    }

    plugins.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(plugins)
}
