//! Connection and transaction providers.
//!
//! [`Connection`] wraps one open driver connection of any supported engine;
//! [`Transaction`] is a transaction opened on it. Both implement
//! [`Queryable`] by delegating to the per-driver implementations in
//! `crate::drivers`.

use async_trait::async_trait;
use sqlx::Connection as SqlxConnection;
use sqlx::{MySql, MySqlConnection, Sqlite, SqliteConnection};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;
use tracing::{debug, warn};

use crate::drivers::mssql::MssqlClient;
use crate::error::Result;

use super::traits::Queryable;
use super::value::{Row, SqlValue};

/// An open connection to one of the supported engines.
pub enum Connection {
    Postgres(tokio_postgres::Client),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
    Mssql(MssqlClient),
}

impl Connection {
    /// Engine name of the wrapped connection.
    pub fn engine(&self) -> &'static str {
        match self {
            Connection::Postgres(_) => "postgres",
            Connection::MySql(_) => "mysql",
            Connection::Sqlite(_) => "sqlite",
            Connection::Mssql(_) => "mssql",
        }
    }

    /// Open a transaction on this connection.
    ///
    /// PostgreSQL, MySQL and SQLite transactions roll back when dropped.
    /// SQL Server transactions must be finished with
    /// [`Transaction::commit`] or [`Transaction::rollback`].
    pub async fn begin(&mut self) -> Result<Transaction<'_>> {
        debug!("Beginning {} transaction", self.engine());
        let tx = match self {
            Connection::Postgres(client) => Transaction::Postgres(client.transaction().await?),
            Connection::MySql(conn) => Transaction::MySql(conn.begin().await?),
            Connection::Sqlite(conn) => Transaction::Sqlite(conn.begin().await?),
            Connection::Mssql(client) => Transaction::Mssql(MssqlTransaction::begin(client).await?),
        };
        Ok(tx)
    }
}

impl From<tokio_postgres::Client> for Connection {
    fn from(client: tokio_postgres::Client) -> Self {
        Connection::Postgres(client)
    }
}

impl From<MySqlConnection> for Connection {
    fn from(conn: MySqlConnection) -> Self {
        Connection::MySql(conn)
    }
}

impl From<SqliteConnection> for Connection {
    fn from(conn: SqliteConnection) -> Self {
        Connection::Sqlite(conn)
    }
}

impl From<tiberius::Client<Compat<TcpStream>>> for Connection {
    fn from(client: tiberius::Client<Compat<TcpStream>>) -> Self {
        Connection::Mssql(client)
    }
}

#[async_trait]
impl Queryable for Connection {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        match self {
            Connection::Postgres(client) => Queryable::execute(client, sql, params).await,
            Connection::MySql(conn) => Queryable::execute(conn, sql, params).await,
            Connection::Sqlite(conn) => Queryable::execute(conn, sql, params).await,
            Connection::Mssql(client) => Queryable::execute(client, sql, params).await,
        }
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        match self {
            Connection::Postgres(client) => Queryable::query(client, sql, params).await,
            Connection::MySql(conn) => Queryable::query(conn, sql, params).await,
            Connection::Sqlite(conn) => Queryable::query(conn, sql, params).await,
            Connection::Mssql(client) => Queryable::query(client, sql, params).await,
        }
    }
}

/// An open transaction on a [`Connection`].
pub enum Transaction<'c> {
    Postgres(tokio_postgres::Transaction<'c>),
    MySql(sqlx::Transaction<'c, MySql>),
    Sqlite(sqlx::Transaction<'c, Sqlite>),
    Mssql(MssqlTransaction<'c>),
}

impl<'c> Transaction<'c> {
    /// Engine name of the underlying connection.
    pub fn engine(&self) -> &'static str {
        match self {
            Transaction::Postgres(_) => "postgres",
            Transaction::MySql(_) => "mysql",
            Transaction::Sqlite(_) => "sqlite",
            Transaction::Mssql(_) => "mssql",
        }
    }

    /// Commit the transaction.
    pub async fn commit(self) -> Result<()> {
        debug!("Committing {} transaction", self.engine());
        match self {
            Transaction::Postgres(tx) => tx.commit().await?,
            Transaction::MySql(tx) => tx.commit().await?,
            Transaction::Sqlite(tx) => tx.commit().await?,
            Transaction::Mssql(tx) => tx.commit().await?,
        }
        Ok(())
    }

    /// Roll the transaction back.
    pub async fn rollback(self) -> Result<()> {
        debug!("Rolling back {} transaction", self.engine());
        match self {
            Transaction::Postgres(tx) => tx.rollback().await?,
            Transaction::MySql(tx) => tx.rollback().await?,
            Transaction::Sqlite(tx) => tx.rollback().await?,
            Transaction::Mssql(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}

#[async_trait]
impl<'c> Queryable for Transaction<'c> {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        match self {
            Transaction::Postgres(tx) => Queryable::execute(tx, sql, params).await,
            Transaction::MySql(tx) => Queryable::execute(&mut **tx, sql, params).await,
            Transaction::Sqlite(tx) => Queryable::execute(&mut **tx, sql, params).await,
            Transaction::Mssql(tx) => Queryable::execute(&mut *tx.client, sql, params).await,
        }
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        match self {
            Transaction::Postgres(tx) => Queryable::query(tx, sql, params).await,
            Transaction::MySql(tx) => Queryable::query(&mut **tx, sql, params).await,
            Transaction::Sqlite(tx) => Queryable::query(&mut **tx, sql, params).await,
            Transaction::Mssql(tx) => Queryable::query(&mut *tx.client, sql, params).await,
        }
    }
}

/// A SQL Server transaction driven by plain batches.
///
/// tiberius has no transaction type, and `BEGIN TRAN` sent through an RPC
/// call fails with error 266 (transaction count mismatch), so the boundaries
/// are sent with `simple_query`.
pub struct MssqlTransaction<'c> {
    client: &'c mut MssqlClient,
    finished: bool,
}

impl<'c> MssqlTransaction<'c> {
    async fn begin(client: &'c mut MssqlClient) -> Result<Self> {
        client
            .simple_query("BEGIN TRANSACTION")
            .await?
            .into_results()
            .await?;
        Ok(Self {
            client,
            finished: false,
        })
    }

    async fn commit(mut self) -> Result<()> {
        self.finish("COMMIT TRANSACTION").await
    }

    async fn rollback(mut self) -> Result<()> {
        self.finish("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }

    async fn finish(&mut self, sql: &str) -> Result<()> {
        self.finished = true;
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

impl Drop for MssqlTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("SQL Server transaction dropped without commit or rollback; it stays open on the connection");
        }
    }
}
