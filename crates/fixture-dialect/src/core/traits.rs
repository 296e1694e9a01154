//! Core traits for dialect-aware fixture loading.
//!
//! - [`Helper`]: everything the fixture loader needs to know about one engine
//! - [`Queryable`]: statement execution shared by connections and transactions
//! - [`LoadFn`]: caller-supplied work run inside a helper-managed transaction
//! - [`BatchSplitter`]: optional capability for engines with batch separators
//!
//! # Design Patterns
//!
//! - **Strategy**: each dialect supplies its own integrity suspension and
//!   introspection queries
//! - **Template Method**: default trait methods carry the shared behaviour,
//!   dialects override only what differs

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{FixtureError, Result};

use super::base;
use super::connection::{Connection, Transaction};
use super::identifier::quote_ansi;
use super::value::{Row, SqlValue};

/// Boxed future returned by closure-based [`LoadFn`]s.
pub type TxFuture<'t> = BoxFuture<'t, Result<()>>;

/// Placeholder style used in parameterized statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `?` (MySQL, SQLite)
    Question,
    /// `@P1`, `@P2`, ... (SQL Server)
    AtSign,
}

impl ParamType {
    /// Render the placeholder for the 1-based parameter `n`.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            ParamType::Dollar => format!("${}", n),
            ParamType::Question => "?".to_string(),
            ParamType::AtSign => format!("@P{}", n),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Dollar => "dollar",
            ParamType::Question => "question",
            ParamType::AtSign => "at-sign",
        };
        f.write_str(name)
    }
}

/// Execute statements and run queries.
///
/// Implemented by [`Connection`] and [`Transaction`]; helpers accept either
/// through `&mut dyn Queryable`. Nothing here opens, commits or rolls back a
/// transaction.
///
/// An `execute` without parameters goes through the driver's simple batch
/// protocol, so a script may hold several `;`-separated statements.
#[async_trait]
pub trait Queryable: Send {
    /// Execute a statement and return the number of affected rows where the
    /// driver reports it (0 otherwise).
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run a query and collect every row.
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a query and return its first row.
    ///
    /// Fails with [`FixtureError::NoRows`] when the query returns nothing.
    async fn query_row(&mut self, sql: &str, params: &[SqlValue]) -> Result<Row> {
        self.query(sql, params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FixtureError::NoRows {
                query: sql.to_string(),
            })
    }
}

/// Work that runs against an open transaction.
///
/// Used for the whole fixture load passed to
/// [`Helper::disable_referential_integrity`] and for the per-table inserts
/// passed to [`Helper::while_insert_on_table`]. Closures implement it through
/// [`load_fn`].
#[async_trait]
pub trait LoadFn: Send {
    async fn run(&mut self, tx: &mut Transaction<'_>) -> Result<()>;
}

#[async_trait]
impl<F> LoadFn for F
where
    F: for<'t, 'c> FnMut(&'t mut Transaction<'c>) -> TxFuture<'t> + Send,
{
    async fn run(&mut self, tx: &mut Transaction<'_>) -> Result<()> {
        (self)(tx).await
    }
}

/// Pin a closure's signature so it implements [`LoadFn`].
///
/// ```ignore
/// let mut load = load_fn(|tx| Box::pin(async move {
///     tx.execute("INSERT INTO users (id) VALUES (1)", &[]).await?;
///     Ok(())
/// }));
/// helper.disable_referential_integrity(&mut conn, &mut load).await?;
/// ```
pub fn load_fn<F>(f: F) -> F
where
    F: for<'t, 'c> FnMut(&'t mut Transaction<'c>) -> TxFuture<'t> + Send,
{
    f
}

/// Splits a multi-statement script into separately executable batches.
pub trait BatchSplitter: Send + Sync {
    /// Delimiter token, including its trailing newline (e.g. `"GO\n"`).
    fn splitter(&self) -> &str;

    /// Split `script` on lines consisting only of the delimiter
    /// (case-insensitive, surrounding whitespace ignored). Chunks are
    /// trimmed and empty ones dropped.
    fn split(&self, script: &str) -> Vec<String> {
        let token = self.splitter().trim();
        let mut batches = Vec::new();
        let mut current = String::new();

        for line in script.lines() {
            if line.trim().eq_ignore_ascii_case(token) {
                push_batch(&mut batches, &current);
                current.clear();
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        push_batch(&mut batches, &current);

        batches
    }
}

fn push_batch(batches: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        batches.push(trimmed.to_string());
    }
}

/// Engine-specific behaviour the fixture loader depends on.
///
/// One implementation per engine; exactly one is selected at startup (see
/// [`crate::drivers::DialectImpl`]). Defaults match an engine that needs no
/// special handling.
#[async_trait]
pub trait Helper: Send + Sync {
    /// Dialect identifier (`postgres`, `mysql`, `sqlite`, `mssql`).
    fn name(&self) -> &'static str;

    /// One-time setup, such as caching the table list. Calling it again
    /// reuses what was cached.
    async fn init(&self, _conn: &mut dyn Queryable) -> Result<()> {
        Ok(())
    }

    /// Suspend referential integrity, run `load` inside a new transaction,
    /// and restore integrity on every exit path.
    ///
    /// The transaction is committed when `load` succeeds and rolled back
    /// otherwise. A failing `load` error wins over a restore error; when
    /// both fail the result is [`FixtureError::LoadAndRestore`].
    async fn disable_referential_integrity(
        &self,
        conn: &mut Connection,
        load: &mut dyn LoadFn,
    ) -> Result<()>;

    /// Placeholder style for parameterized statements.
    fn param_type(&self) -> ParamType;

    /// Name of the current database or schema.
    async fn database_name(&self, q: &mut dyn Queryable) -> Result<String>;

    /// Tables visible in the current database or schema.
    async fn table_names(&self, q: &mut dyn Queryable) -> Result<Vec<String>>;

    /// Whether `table` changed since the last [`Helper::save_state`].
    /// Without tracking every table counts as modified.
    async fn is_table_modified(&self, _q: &mut dyn Queryable, _table: &str) -> Result<bool> {
        Ok(true)
    }

    /// Hook run after every fixture has been inserted.
    async fn after_load(&self, _q: &mut dyn Queryable) -> Result<()> {
        Ok(())
    }

    /// Hook to record table state for [`Helper::is_table_modified`].
    async fn save_state(&self, _q: &mut dyn Queryable, _tables: &[String]) -> Result<()> {
        Ok(())
    }

    /// Quote a table or column name for this engine.
    fn quote_keyword(&self, name: &str) -> String {
        quote_ansi(name)
    }

    /// Bracket the inserts for one table with whatever the engine needs.
    /// `table` is the unquoted name.
    async fn while_insert_on_table(
        &self,
        tx: &mut Transaction<'_>,
        _table: &str,
        insert: &mut dyn LoadFn,
    ) -> Result<()> {
        insert.run(tx).await
    }

    /// Delete every row of `tables` with a single script, in the given
    /// order. Names must already be quoted with [`Helper::quote_keyword`].
    async fn clean_tables(&self, tx: &mut Transaction<'_>, tables: &[String]) -> Result<()> {
        base::clean_tables(tx, tables).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GoSplitter;

    impl BatchSplitter for GoSplitter {
        fn splitter(&self) -> &str {
            "GO\n"
        }
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(ParamType::Dollar.placeholder(1), "$1");
        assert_eq!(ParamType::Dollar.placeholder(12), "$12");
        assert_eq!(ParamType::Question.placeholder(3), "?");
        assert_eq!(ParamType::AtSign.placeholder(2), "@P2");
    }

    #[test]
    fn test_split_on_delimiter_lines() {
        let script = "CREATE TABLE a (id INT);\nGO\nINSERT INTO a VALUES (1);\n  go  \n\nGO\n";
        let batches = GoSplitter.split(script);
        assert_eq!(
            batches,
            vec![
                "CREATE TABLE a (id INT);".to_string(),
                "INSERT INTO a VALUES (1);".to_string(),
            ]
        );
    }

    #[test]
    fn test_split_ignores_token_inside_statement() {
        let script = "SELECT 'GO' AS word;\nSELECT 1 AS GOAL;";
        let batches = GoSplitter.split(script);
        assert_eq!(batches.len(), 1);
        assert!(batches[0].contains("GOAL"));
    }

    #[test]
    fn test_split_without_delimiter() {
        assert_eq!(GoSplitter.split("SELECT 1"), vec!["SELECT 1".to_string()]);
        assert!(GoSplitter.split("\n GO \n").is_empty());
    }
}
