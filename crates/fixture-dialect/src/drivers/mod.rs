//! Database dialect implementations.
//!
//! - [`postgres`]: PostgreSQL (tokio-postgres)
//! - [`mysql`]: MySQL / MariaDB (sqlx)
//! - [`sqlite`]: SQLite (sqlx)
//! - [`mssql`]: Microsoft SQL Server (tiberius)
//!
//! Each driver module provides a `client` with the [`Queryable`]
//! implementation for its driver types and a `dialect` with its [`Helper`].
//!
//! # Dispatch
//!
//! [`DialectImpl`] is a plain enum with one variant per engine. It is chosen
//! once from the driver name and used through the [`Helper`] contract for the
//! rest of the process.

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;

use async_trait::async_trait;
use tracing::info;

use crate::config::HelperConfig;
use crate::core::traits::{BatchSplitter, Helper, LoadFn, ParamType, Queryable};
use crate::core::{Connection, Transaction};
use crate::error::{FixtureError, Result};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Postgres,
    MySql,
    Sqlite,
    Mssql,
}

impl DialectKind {
    /// Map a driver name to an engine.
    ///
    /// Accepts the usual aliases (`postgresql`, `pgx`, `mariadb`, `sqlite3`,
    /// `sqlserver`, ...), case-insensitively.
    pub fn from_driver_name(driver: &str) -> Result<Self> {
        match driver.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" | "pgx" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectKind::Mssql),
            other => Err(FixtureError::Config(format!(
                "Unknown database driver: '{}'. Supported drivers: postgres, mysql, sqlite, mssql",
                other
            ))),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectKind::Postgres => "postgres",
            DialectKind::MySql => "mysql",
            DialectKind::Sqlite => "sqlite",
            DialectKind::Mssql => "mssql",
        };
        f.write_str(name)
    }
}

/// The selected dialect.
#[derive(Debug)]
pub enum DialectImpl {
    Postgres(PostgresDialect),
    MySql(MysqlDialect),
    Sqlite(SqliteDialect),
    Mssql(MssqlDialect),
}

impl DialectImpl {
    /// Build the dialect for `kind` with the options in `config`.
    pub fn new(kind: DialectKind, config: &HelperConfig) -> Self {
        match kind {
            DialectKind::Postgres => DialectImpl::Postgres(PostgresDialect::new(config.postgres.clone())),
            DialectKind::MySql => DialectImpl::MySql(MysqlDialect::new(config.mysql.clone())),
            DialectKind::Sqlite => DialectImpl::Sqlite(SqliteDialect::new()),
            DialectKind::Mssql => DialectImpl::Mssql(MssqlDialect::new()),
        }
    }

    /// Select the dialect for a driver name.
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Config` if the driver is not recognized.
    pub fn for_driver(driver: &str, config: &HelperConfig) -> Result<Self> {
        let kind = DialectKind::from_driver_name(driver)?;
        info!("Using {} dialect for driver '{}'", kind, driver);
        Ok(Self::new(kind, config))
    }

    /// Select the dialect named by `config.driver`.
    pub fn from_config(config: &HelperConfig) -> Result<Self> {
        Self::for_driver(&config.driver, config)
    }

    /// Engine of this dialect.
    pub fn kind(&self) -> DialectKind {
        match self {
            DialectImpl::Postgres(_) => DialectKind::Postgres,
            DialectImpl::MySql(_) => DialectKind::MySql,
            DialectImpl::Sqlite(_) => DialectKind::Sqlite,
            DialectImpl::Mssql(_) => DialectKind::Mssql,
        }
    }

    /// Batch splitter, for engines whose scripts use a batch separator.
    pub fn batch_splitter(&self) -> Option<&dyn BatchSplitter> {
        match self {
            DialectImpl::Mssql(d) => Some(d),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Helper {
        match self {
            DialectImpl::Postgres(d) => d,
            DialectImpl::MySql(d) => d,
            DialectImpl::Sqlite(d) => d,
            DialectImpl::Mssql(d) => d,
        }
    }
}

#[async_trait]
impl Helper for DialectImpl {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    async fn init(&self, conn: &mut dyn Queryable) -> Result<()> {
        self.inner().init(conn).await
    }

    async fn disable_referential_integrity(
        &self,
        conn: &mut Connection,
        load: &mut dyn LoadFn,
    ) -> Result<()> {
        self.inner().disable_referential_integrity(conn, load).await
    }

    fn param_type(&self) -> ParamType {
        self.inner().param_type()
    }

    async fn database_name(&self, q: &mut dyn Queryable) -> Result<String> {
        self.inner().database_name(q).await
    }

    async fn table_names(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        self.inner().table_names(q).await
    }

    async fn is_table_modified(&self, q: &mut dyn Queryable, table: &str) -> Result<bool> {
        self.inner().is_table_modified(q, table).await
    }

    async fn after_load(&self, q: &mut dyn Queryable) -> Result<()> {
        self.inner().after_load(q).await
    }

    async fn save_state(&self, q: &mut dyn Queryable, tables: &[String]) -> Result<()> {
        self.inner().save_state(q, tables).await
    }

    fn quote_keyword(&self, name: &str) -> String {
        self.inner().quote_keyword(name)
    }

    async fn while_insert_on_table(
        &self,
        tx: &mut Transaction<'_>,
        table: &str,
        insert: &mut dyn LoadFn,
    ) -> Result<()> {
        self.inner().while_insert_on_table(tx, table, insert).await
    }

    async fn clean_tables(&self, tx: &mut Transaction<'_>, tables: &[String]) -> Result<()> {
        self.inner().clean_tables(tx, tables).await
    }
}
