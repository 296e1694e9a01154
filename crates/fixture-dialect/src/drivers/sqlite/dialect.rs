//! SQLite fixture helper.
//!
//! `PRAGMA foreign_keys` cannot change inside a transaction, so foreign keys
//! are deferred instead: with `defer_foreign_keys` on, violations are only
//! checked at COMMIT, after every fixture is in place.

use std::path::Path;

use async_trait::async_trait;

use crate::core::base::{self, IntegrityPlan};
use crate::core::traits::{Helper, LoadFn, ParamType, Queryable};
use crate::core::Connection;
use crate::error::{FixtureError, Result};

const TABLES_QUERY: &str = r#"
    SELECT name
    FROM sqlite_master
    WHERE type = 'table'
      AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
    ORDER BY rowid
"#;

/// Name reported for databases without a backing file.
pub const IN_MEMORY_NAME: &str = ":memory:";

/// SQLite helper.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a SQLite helper.
    pub fn new() -> Self {
        Self
    }

    fn integrity_plan() -> IntegrityPlan {
        IntegrityPlan::in_transaction(
            "PRAGMA defer_foreign_keys = ON",
            "PRAGMA defer_foreign_keys = OFF",
        )
    }
}

/// Database name for a `PRAGMA database_list` file entry.
fn name_from_file(file: &str) -> String {
    if file.is_empty() {
        return IN_MEMORY_NAME.to_string();
    }
    Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

#[async_trait]
impl Helper for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn disable_referential_integrity(
        &self,
        conn: &mut Connection,
        load: &mut dyn LoadFn,
    ) -> Result<()> {
        base::with_integrity_suspended(conn, &Self::integrity_plan(), load).await
    }

    fn param_type(&self) -> ParamType {
        ParamType::Question
    }

    async fn database_name(&self, q: &mut dyn Queryable) -> Result<String> {
        let rows = q
            .query("PRAGMA database_list", &[])
            .await
            .map_err(|e| FixtureError::query("database name", e))?;

        for row in &rows {
            if row.try_get_string(1)? == "main" {
                let file = row.try_get_opt_string(2)?.unwrap_or_default();
                return Ok(name_from_file(&file));
            }
        }

        Err(FixtureError::query(
            "database name",
            FixtureError::NoRows {
                query: "PRAGMA database_list".to_string(),
            },
        ))
    }

    async fn table_names(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        let rows = q
            .query(TABLES_QUERY, &[])
            .await
            .map_err(|e| FixtureError::query("table names", e))?;
        rows.iter().map(|r| r.try_get_string(0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::load_fn;
    use sqlx::{Connection as _, SqliteConnection};

    async fn connect() -> Connection {
        let mut conn = Connection::Sqlite(SqliteConnection::connect("sqlite::memory:").await.unwrap());
        conn.execute(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL REFERENCES users(id));",
            &[],
        )
        .await
        .unwrap();
        conn
    }

    #[test]
    fn test_basics() {
        let d = SqliteDialect::new();
        assert_eq!(d.name(), "sqlite");
        assert_eq!(d.param_type(), ParamType::Question);
        assert_eq!(d.quote_keyword("orders"), "\"orders\"");
    }

    #[test]
    fn test_name_from_file() {
        assert_eq!(name_from_file(""), ":memory:");
        assert_eq!(name_from_file("/tmp/fixtures/app.db"), "app.db");
        assert_eq!(name_from_file("app.db"), "app.db");
    }

    #[tokio::test]
    async fn test_database_name_in_memory() {
        let mut conn = connect().await;
        let name = SqliteDialect::new().database_name(&mut conn).await.unwrap();
        assert_eq!(name, IN_MEMORY_NAME);
    }

    #[tokio::test]
    async fn test_table_names_skip_internal_tables() {
        let mut conn = connect().await;
        conn.execute("CREATE TABLE seq (id INTEGER PRIMARY KEY AUTOINCREMENT)", &[])
            .await
            .unwrap();

        let tables = SqliteDialect::new().table_names(&mut conn).await.unwrap();
        assert_eq!(tables, vec!["users", "orders", "seq"]);
    }

    #[tokio::test]
    async fn test_children_before_parents_inside_suspension() {
        let mut conn = connect().await;
        let mut load = load_fn(|tx| {
            Box::pin(async move {
                tx.execute("INSERT INTO orders VALUES (10, 1)", &[]).await?;
                tx.execute("INSERT INTO users VALUES (1, 'ann')", &[]).await?;
                Ok::<(), FixtureError>(())
            })
        });

        SqliteDialect::new()
            .disable_referential_integrity(&mut conn, &mut load)
            .await
            .unwrap();

        let row = conn.query_row("SELECT COUNT(*) FROM orders", &[]).await.unwrap();
        assert_eq!(row.try_get_i64(0).unwrap(), 1);

        // Enforcement is back once the call returns.
        let err = conn.execute("INSERT INTO orders VALUES (11, 99)", &[]).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_dangling_reference_fails_at_commit() {
        let mut conn = connect().await;
        let mut load = load_fn(|tx| {
            Box::pin(async move {
                tx.execute("INSERT INTO orders VALUES (10, 42)", &[]).await?;
                Ok::<(), FixtureError>(())
            })
        });

        let result = SqliteDialect::new()
            .disable_referential_integrity(&mut conn, &mut load)
            .await;
        assert!(result.is_err());

        let row = conn.query_row("SELECT COUNT(*) FROM orders", &[]).await.unwrap();
        assert_eq!(row.try_get_i64(0).unwrap(), 0);
    }
}
