//! Migration registry
//!
//! Maps fully qualified class names such as `Home.Migrations.CreateHomeTable`
//! to factories. The host binary fills it once at startup; the runner looks
//! up the class derived from each discovered file.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::definitions::Migration;

type MigrationFactory = Arc<dyn Fn() -> Box<dyn Migration> + Send + Sync>;

/// Class name to factory lookup for Rust migrations
#[derive(Clone, Default)]
pub struct MigrationRegistry {
    factories: HashMap<String, MigrationFactory>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `class`. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, class: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Migration> + Send + Sync + 'static,
    {
        let class = class.into();
        if self.factories.insert(class.clone(), Arc::new(factory)).is_some() {
            tracing::warn!("Migration class {} registered twice; keeping the latest", class);
        }
        self
    }

    /// Register a migration type built with `Default`
    pub fn register_default<M>(&mut self, class: impl Into<String>) -> &mut Self
    where
        M: Migration + Default + 'static,
    {
        self.register(class, || Box::new(M::default()) as Box<dyn Migration>)
    }

    /// Builder form of [`register_default`](Self::register_default)
    pub fn with<M>(mut self, class: impl Into<String>) -> Self
    where
        M: Migration + Default + 'static,
    {
        self.register_default::<M>(class);
        self
    }

    /// Instantiate the migration registered under `class`
    pub fn resolve(&self, class: &str) -> Option<Box<dyn Migration>> {
        self.factories.get(class).map(|factory| factory())
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered class names, sorted
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmResult;
    use crate::migrations::Schema;
    use async_trait::async_trait;

    #[derive(Default)]
    struct CreateHomeTable;

    #[async_trait]
    impl Migration for CreateHomeTable {
        async fn up(&self, _schema: &Schema) -> OrmResult<()> {
            Ok(())
        }

        async fn down(&self, _schema: &Schema) -> OrmResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_registered_class() {
        let registry = MigrationRegistry::new().with::<CreateHomeTable>("Home.Migrations.CreateHomeTable");

        assert!(registry.contains("Home.Migrations.CreateHomeTable"));
        assert!(registry.resolve("Home.Migrations.CreateHomeTable").is_some());
        assert!(registry.resolve("App.Database.Migrations.CreateHomeTable").is_none());
    }

    #[test]
    fn test_classes_are_sorted() {
        let mut registry = MigrationRegistry::new();
        registry
            .register_default::<CreateHomeTable>("Home.Migrations.CreateHomeTable")
            .register_default::<CreateHomeTable>("App.Database.Migrations.CreateUsers");

        assert_eq!(
            registry.classes(),
            vec!["App.Database.Migrations.CreateUsers", "Home.Migrations.CreateHomeTable"]
        );
        assert_eq!(registry.len(), 2);
    }
}
