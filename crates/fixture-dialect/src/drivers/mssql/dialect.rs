//! SQL Server fixture helper.
//!
//! Tables with an identity column only accept explicit ids while
//! `IDENTITY_INSERT` is on, and only one table per session may have it on
//! at a time, so inserts are wrapped per table.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::base::{self, IntegrityPlan};
use crate::core::identifier::quote_mssql;
use crate::core::traits::{BatchSplitter, Helper, LoadFn, ParamType, Queryable};
use crate::core::{Connection, Transaction};
use crate::error::{FixtureError, Result};

const TABLES_QUERY: &str = r#"
    SELECT TABLE_SCHEMA + '.' + TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE'
      AND TABLE_NAME <> 'spt_values'
    ORDER BY TABLE_SCHEMA, TABLE_NAME
"#;

const IDENTITY_QUERY: &str = r#"
    SELECT COUNT(*)
    FROM sys.identity_columns
    WHERE object_id = OBJECT_ID(@P1)
"#;

/// Batch separator understood by SQL Server tooling.
pub const BATCH_SEPARATOR: &str = "GO\n";

/// SQL Server helper.
#[derive(Debug, Default)]
pub struct MssqlDialect {
    tables: OnceLock<Vec<String>>,
}

impl MssqlDialect {
    /// Create a SQL Server helper.
    pub fn new() -> Self {
        Self::default()
    }

    async fn cached_tables(&self, q: &mut dyn Queryable) -> Result<&[String]> {
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }
        let tables = self.table_names(q).await?;
        debug!("Cached {} SQL Server tables", tables.len());
        Ok(self.tables.get_or_init(|| tables))
    }

    async fn has_identity_column(&self, q: &mut dyn Queryable, table: &str) -> Result<bool> {
        let row = q
            .query_row(IDENTITY_QUERY, &[self.quote_keyword(table).into()])
            .await
            .map_err(|e| FixtureError::query(format!("identity columns of {}", table), e))?;
        Ok(row.try_get_i64(0)? > 0)
    }
}

fn constraint_script(tables: &[String], clause: &str) -> String {
    tables
        .iter()
        .map(|t| format!("ALTER TABLE {} {} CONSTRAINT ALL;\n", quote_mssql(t), clause))
        .collect()
}

fn identity_insert_statement(table: &str, on: bool) -> String {
    format!(
        "SET IDENTITY_INSERT {} {}",
        quote_mssql(table),
        if on { "ON" } else { "OFF" }
    )
}

impl BatchSplitter for MssqlDialect {
    fn splitter(&self) -> &str {
        BATCH_SEPARATOR
    }
}

#[async_trait]
impl Helper for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    async fn init(&self, conn: &mut dyn Queryable) -> Result<()> {
        self.cached_tables(conn)
            .await
            .map_err(|e| FixtureError::init("mssql", e))?;
        Ok(())
    }

    async fn disable_referential_integrity(
        &self,
        conn: &mut Connection,
        load: &mut dyn LoadFn,
    ) -> Result<()> {
        let tables = self.cached_tables(conn).await?;
        let plan = IntegrityPlan::on_connection(
            constraint_script(tables, "NOCHECK"),
            constraint_script(tables, "WITH CHECK CHECK"),
        );
        base::with_integrity_suspended(conn, &plan, load).await
    }

    fn param_type(&self) -> ParamType {
        ParamType::AtSign
    }

    async fn database_name(&self, q: &mut dyn Queryable) -> Result<String> {
        q.query_row("SELECT DB_NAME()", &[])
            .await
            .and_then(|row| row.try_get_string(0))
            .map_err(|e| FixtureError::query("database name", e))
    }

    async fn table_names(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        let rows = q
            .query(TABLES_QUERY, &[])
            .await
            .map_err(|e| FixtureError::query("table names", e))?;
        rows.iter().map(|r| r.try_get_string(0)).collect()
    }

    fn quote_keyword(&self, name: &str) -> String {
        quote_mssql(name)
    }

    async fn while_insert_on_table(
        &self,
        tx: &mut Transaction<'_>,
        table: &str,
        insert: &mut dyn LoadFn,
    ) -> Result<()> {
        if !self.has_identity_column(tx, table).await? {
            return insert.run(tx).await;
        }

        tx.execute(&identity_insert_statement(table, true), &[])
            .await
            .map_err(|e| FixtureError::query(format!("enabling identity insert on {}", table), e))?;

        let outcome = insert.run(tx).await;

        let disabled = tx
            .execute(&identity_insert_statement(table, false), &[])
            .await
            .map_err(|e| FixtureError::query(format!("disabling identity insert on {}", table), e));

        match (outcome, disabled) {
            (Err(e), Err(off_err)) => {
                warn!("{}", off_err);
                Err(e)
            }
            (Err(e), Ok(_)) => Err(e),
            (Ok(()), Err(off_err)) => Err(off_err),
            (Ok(()), Ok(_)) => Ok(()),
        }
    }
}
