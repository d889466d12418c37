//! Schema Builder - table and data helpers handed to every migration
//!
//! A migration receives a [`Schema`] bound to the runner's connection. Each
//! call to [`Schema::table`] or [`Schema::data`] starts a fresh builder that
//! is consumed by `create()` or `insert()`, so definitions never carry over
//! from one table to the next.
//!
//! ```ignore
//! schema
//!     .table("users")
//!     .add_column("id INT AUTO_INCREMENT")
//!     .add_column("email VARCHAR(191) NOT NULL")
//!     .add_primary_key("id")
//!     .add_unique_key("email")
//!     .create()
//!     .await?;
//! ```

use crate::backends::{DatabaseBackendType, DatabaseValue};
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};

/// Migration-facing handle on the active connection
#[derive(Debug, Clone)]
pub struct Schema {
    connection: Connection,
}

impl Schema {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn backend(&self) -> DatabaseBackendType {
        self.connection.backend()
    }

    /// Start a `CREATE TABLE` definition
    pub fn table(&self, name: &str) -> TableBuilder<'_> {
        TableBuilder::new(self, name)
    }

    /// Start queueing rows for `table`
    pub fn data(&self, table: &str) -> InsertBuilder<'_> {
        InsertBuilder::new(self, table)
    }

    /// Drop a table
    pub async fn drop_table(&self, name: &str) -> OrmResult<()> {
        self.execute_sql(&format!("DROP TABLE IF EXISTS {}", name), &[]).await?;
        Ok(())
    }

    /// Run raw SQL and return the affected row count.
    ///
    /// Without parameters the text is sent as is and may hold several
    /// statements; with parameters it is prepared and bound.
    pub async fn execute_sql(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        tracing::debug!("Executing migration SQL: {}", sql);
        if params.is_empty() {
            self.connection.execute_unprepared(sql).await
        } else {
            self.connection.execute(sql, params).await
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ForeignKey {
    column: String,
    referenced_table: String,
    referenced_column: String,
}

/// Table builder for CREATE TABLE statements
#[derive(Debug)]
#[must_use = "a table definition does nothing until `create` is awaited"]
pub struct TableBuilder<'a> {
    schema: &'a Schema,
    table_name: String,
    columns: Vec<String>,
    primary_keys: Vec<String>,
    keys: Vec<String>,
    unique_keys: Vec<String>,
    full_text_keys: Vec<String>,
    foreign_keys: Vec<ForeignKey>,
}

impl<'a> TableBuilder<'a> {
    fn new(schema: &'a Schema, table_name: &str) -> Self {
        Self {
            schema,
            table_name: table_name.to_string(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            keys: Vec::new(),
            unique_keys: Vec::new(),
            full_text_keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Column definition, e.g. `title VARCHAR(255) NOT NULL`
    pub fn add_column(mut self, definition: &str) -> Self {
        self.columns.push(definition.to_string());
        self
    }

    /// Plain index over one or more comma separated columns
    pub fn add_key(mut self, columns: &str) -> Self {
        self.keys.push(columns.to_string());
        self
    }

    pub fn add_primary_key(mut self, columns: &str) -> Self {
        self.primary_keys.push(columns.to_string());
        self
    }

    pub fn add_unique_key(mut self, columns: &str) -> Self {
        self.unique_keys.push(columns.to_string());
        self
    }

    pub fn add_full_text_key(mut self, columns: &str) -> Self {
        self.full_text_keys.push(columns.to_string());
        self
    }

    pub fn add_foreign_key(mut self, column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
        });
        self
    }

    /// Statements that create the table on the schema's backend.
    ///
    /// The first statement is always the `CREATE TABLE`; backends without
    /// inline indexes get one `CREATE INDEX` per key afterwards.
    pub fn to_sql(&self) -> OrmResult<Vec<String>> {
        if self.columns.is_empty() {
            return Err(OrmError::Schema(format!(
                "Column data not found! Could not create table: {}",
                self.table_name
            )));
        }

        let backend = self.schema.backend();
        let inline_indexes = backend.supports_inline_indexes();
        let mut clauses = self.columns.clone();

        for key in &self.primary_keys {
            clauses.push(format!("PRIMARY KEY ({})", key));
        }
        if inline_indexes {
            for key in &self.keys {
                clauses.push(format!("KEY ({})", key));
            }
        }
        for key in &self.unique_keys {
            clauses.push(format!("{} ({})", backend.unique_key_clause(), key));
        }
        if inline_indexes {
            for key in &self.full_text_keys {
                clauses.push(format!("FULLTEXT KEY ({})", key));
            }
        }
        for fk in &self.foreign_keys {
            clauses.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, fk.referenced_table, fk.referenced_column
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} ({}){}",
            self.table_name,
            clauses.join(", "),
            backend.table_options()
        )];

        if !inline_indexes {
            for key in self.keys.iter().chain(&self.full_text_keys) {
                statements.push(self.create_index_sql(key));
            }
        }

        Ok(statements)
    }

    /// Run the table definition, consuming the builder
    pub async fn create(self) -> OrmResult<()> {
        let statements = self.to_sql()?;

        if !self.full_text_keys.is_empty() && !self.schema.backend().supports_inline_indexes() {
            tracing::warn!(
                "{} has no FULLTEXT keys; creating plain indexes on {} instead",
                self.schema.backend(),
                self.table_name
            );
        }

        for statement in &statements {
            self.schema.execute_sql(statement, &[]).await?;
        }
        tracing::debug!("Created table {}", self.table_name);
        Ok(())
    }

    fn create_index_sql(&self, columns: &str) -> String {
        let suffix: String = columns
            .split(',')
            .map(|column| column.trim())
            .filter(|column| !column.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();

        format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({})",
            self.table_name, suffix, self.table_name, columns
        )
    }
}

/// Queued rows for one table, written by [`InsertBuilder::insert`]
#[derive(Debug)]
#[must_use = "queued rows are only written when `insert` is awaited"]
pub struct InsertBuilder<'a> {
    schema: &'a Schema,
    table_name: String,
    rows: Vec<Vec<(String, DatabaseValue)>>,
}

impl<'a> InsertBuilder<'a> {
    fn new(schema: &'a Schema, table_name: &str) -> Self {
        Self {
            schema,
            table_name: table_name.to_string(),
            rows: Vec::new(),
        }
    }

    /// Queue one row as ordered column/value pairs
    pub fn add_data<I, K, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        self.rows
            .push(row.into_iter().map(|(column, value)| (column.into(), value.into())).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One parameterized `INSERT` per queued row, in queue order
    pub fn to_sql(&self) -> OrmResult<Vec<(String, Vec<DatabaseValue>)>> {
        let backend = self.schema.backend();

        self.rows
            .iter()
            .map(|row| {
                if row.is_empty() {
                    return Err(OrmError::Schema(format!(
                        "Cannot insert an empty row into {}",
                        self.table_name
                    )));
                }

                let columns: Vec<&str> = row.iter().map(|(column, _)| column.as_str()).collect();
                // NULL goes in as a literal so PostgreSQL never sees a typed null parameter
                let mut values = Vec::new();
                let mut slots = Vec::with_capacity(row.len());
                for (_, value) in row {
                    if value.is_null() {
                        slots.push("NULL".to_string());
                    } else {
                        values.push(value.clone());
                        slots.push(backend.placeholder(values.len()));
                    }
                }
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    self.table_name,
                    columns.join(", "),
                    slots.join(", ")
                );
                Ok((sql, values))
            })
            .collect()
    }

    /// Write every queued row; does nothing when the queue is empty
    pub async fn insert(self) -> OrmResult<u64> {
        let mut inserted = 0;
        for (sql, values) in self.to_sql()? {
            inserted += self.schema.connection().execute(&sql, &values).await?;
        }
        if inserted > 0 {
            tracing::debug!("Inserted {} row(s) into {}", inserted, self.table_name);
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovesta_core::{ConnectionConfig, DatabaseConfig};

    fn schema_for(driver: &str) -> Schema {
        let config = ConnectionConfig {
            driver: driver.to_string(),
            database: "lovesta".to_string(),
            ..ConnectionConfig::default()
        };
        Schema::new(Connection::from_connection_config(driver, &config).unwrap())
    }

    #[test]
    fn test_mysql_create_table_clause_order() {
        let schema = schema_for("mysql");
        let sql = schema
            .table("posts")
            .add_column("id INT AUTO_INCREMENT")
            .add_column("user_id INT NOT NULL")
            .add_column("body TEXT")
            .add_foreign_key("user_id", "users", "id")
            .add_full_text_key("body")
            .add_unique_key("id, user_id")
            .add_key("user_id")
            .add_primary_key("id")
            .to_sql()
            .unwrap();

        assert_eq!(
            sql,
            vec![
                "CREATE TABLE IF NOT EXISTS posts (id INT AUTO_INCREMENT, user_id INT NOT NULL, body TEXT, \
                 PRIMARY KEY (id), KEY (user_id), UNIQUE KEY (id, user_id), FULLTEXT KEY (body), \
                 FOREIGN KEY (user_id) REFERENCES users(id)) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_sqlite_indexes_become_statements() {
        let schema = schema_for("sqlite");
        let sql = schema
            .table("posts")
            .add_column("id INTEGER")
            .add_column("slug TEXT")
            .add_primary_key("id")
            .add_key("slug, id")
            .add_full_text_key("slug")
            .to_sql()
            .unwrap();

        assert_eq!(sql.len(), 3);
        assert_eq!(sql[0], "CREATE TABLE IF NOT EXISTS posts (id INTEGER, slug TEXT, PRIMARY KEY (id))");
        assert_eq!(sql[1], "CREATE INDEX IF NOT EXISTS idx_posts_slug_id ON posts (slug, id)");
        assert_eq!(sql[2], "CREATE INDEX IF NOT EXISTS idx_posts_slug ON posts (slug)");
    }

    #[test]
    fn test_create_table_without_columns_fails() {
        let schema = schema_for("mysql");
        let err = schema.table("empty").add_primary_key("id").to_sql().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema error: Column data not found! Could not create table: empty"
        );
    }

    #[test]
    fn test_each_table_starts_fresh() {
        let schema = schema_for("mysql");
        let first = schema.table("a").add_column("id INT").add_primary_key("id");
        let _ = first.to_sql().unwrap();

        let second = schema.table("b").add_column("name TEXT").to_sql().unwrap();
        assert_eq!(
            second[0],
            "CREATE TABLE IF NOT EXISTS b (name TEXT) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_insert_statements_use_backend_placeholders() {
        let schema = schema_for("pgsql");
        let statements = schema
            .data("settings")
            .add_data([("key", DatabaseValue::from("site_name")), ("value", DatabaseValue::from("Lovesta"))])
            .add_data([("key", "maintenance")])
            .to_sql()
            .unwrap();

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].0, "INSERT INTO settings (key, value) VALUES ($1, $2)");
        assert_eq!(statements[0].1, vec!["site_name".into(), "Lovesta".into()]);
        assert_eq!(statements[1].0, "INSERT INTO settings (key) VALUES ($1)");
    }

    #[test]
    fn test_null_values_are_inlined() {
        let schema = schema_for("pgsql");
        let statements = schema
            .data("pages")
            .add_data([
                ("title", DatabaseValue::from("Home")),
                ("parent_id", DatabaseValue::Null),
                ("position", DatabaseValue::from(1)),
            ])
            .to_sql()
            .unwrap();

        assert_eq!(statements[0].0, "INSERT INTO pages (title, parent_id, position) VALUES ($1, NULL, $2)");
        assert_eq!(statements[0].1, vec!["Home".into(), 1.into()]);
    }

    #[test]
    fn test_empty_row_is_rejected() {
        let schema = schema_for("mysql");
        let rows: Vec<(&str, DatabaseValue)> = Vec::new();
        let err = schema.data("settings").add_data(rows).to_sql().unwrap_err();
        assert!(matches!(err, OrmError::Schema(_)));
    }

    #[tokio::test]
    async fn test_create_insert_and_drop_on_sqlite() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let connection = Connection::from_config(&DatabaseConfig::sqlite(temp_dir.path().join("app.db"))).unwrap();
        let schema = Schema::new(connection.clone());

        schema
            .table("tags")
            .add_column("id INTEGER NOT NULL")
            .add_column("name TEXT NOT NULL")
            .add_primary_key("id")
            .add_unique_key("name")
            .create()
            .await
            .unwrap();

        let inserted = schema
            .data("tags")
            .add_data([("id", DatabaseValue::from(1)), ("name", DatabaseValue::from("rust"))])
            .add_data([("id", DatabaseValue::from(2)), ("name", DatabaseValue::from("php"))])
            .insert()
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        assert_eq!(schema.data("tags").insert().await.unwrap(), 0);

        let duplicate = schema
            .execute_sql("INSERT INTO tags (id, name) VALUES (?, ?)", &[3.into(), "rust".into()])
            .await
            .unwrap_err();
        assert!(duplicate.to_string().contains("SQL: INSERT INTO tags"));

        schema.drop_table("tags").await.unwrap();
        let rows = connection
            .query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'tags'", &[])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
