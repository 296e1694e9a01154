//! MySQL/MariaDB fixture helper.
//!
//! Foreign key checks are a session variable, so they are switched off on
//! the connection before the load transaction opens and switched back on
//! once it has ended.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::debug;

use crate::config::MysqlOptions;
use crate::core::base::{self, IntegrityPlan};
use crate::core::identifier::quote_mysql;
use crate::core::traits::{Helper, LoadFn, ParamType, Queryable};
use crate::core::Connection;
use crate::error::{FixtureError, Result};

const TABLES_QUERY: &str = r#"
    SELECT CAST(table_name AS CHAR(255))
    FROM information_schema.tables
    WHERE table_schema = ?
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

/// MySQL/MariaDB helper.
#[derive(Debug, Default)]
pub struct MysqlDialect {
    options: MysqlOptions,
    database: OnceLock<String>,
    tables: OnceLock<Vec<String>>,
}

impl MysqlDialect {
    /// Create a MySQL helper with the given options.
    pub fn new(options: MysqlOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Options this helper was built with.
    pub fn options(&self) -> &MysqlOptions {
        &self.options
    }

    async fn cached_tables(&self, q: &mut dyn Queryable) -> Result<&[String]> {
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }
        let tables = self.table_names(q).await?;
        debug!("Cached {} MySQL tables", tables.len());
        Ok(self.tables.get_or_init(|| tables))
    }

    fn integrity_plan() -> IntegrityPlan {
        IntegrityPlan::on_connection("SET FOREIGN_KEY_CHECKS = 0", "SET FOREIGN_KEY_CHECKS = 1")
    }
}

fn auto_increment_statement(table: &str, value: i64) -> String {
    format!("ALTER TABLE {} AUTO_INCREMENT = {}", quote_mysql(table), value)
}

#[async_trait]
impl Helper for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn init(&self, conn: &mut dyn Queryable) -> Result<()> {
        let init_err = |e| FixtureError::init("mysql", e);
        self.database_name(conn).await.map_err(init_err)?;
        self.cached_tables(conn).await.map_err(init_err)?;
        Ok(())
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
        if let Some(name) = self.database.get() {
            return Ok(name.clone());
        }

        let name = q
            .query_row("SELECT DATABASE()", &[])
            .await
            .and_then(|row| row.try_get_opt_string(0))
            .map_err(|e| FixtureError::query("database name", e))?
            .ok_or_else(|| {
                FixtureError::query(
                    "database name",
                    FixtureError::Config("no database selected on the connection".into()),
                )
            })?;

        Ok(self.database.get_or_init(|| name).clone())
    }

    async fn table_names(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        let database = self.database_name(q).await?;
        let rows = q
            .query(TABLES_QUERY, &[database.into()])
            .await
            .map_err(|e| FixtureError::query("table names", e))?;
        rows.iter().map(|r| r.try_get_string(0)).collect()
    }

    async fn after_load(&self, q: &mut dyn Queryable) -> Result<()> {
        if self.options.skip_reset_sequences {
            return Ok(());
        }

        let tables = self.cached_tables(q).await?;
        for table in tables {
            let sql = auto_increment_statement(table, self.options.reset_sequences_to);
            debug!("{}", sql);
            q.execute(&sql, &[])
                .await
                .map_err(|e| FixtureError::query(format!("resetting AUTO_INCREMENT of {}", table), e))?;
        }
        Ok(())
    }

    fn quote_keyword(&self, name: &str) -> String {
        quote_mysql(name)
    }
}
