//! # fixture-dialect
//!
//! Per-engine helpers used by a test-fixture loader to reset and repopulate
//! database tables before each test run.
//!
//! Engines disagree on how referential integrity is suspended, how
//! placeholders and identifiers are written, and how scripts are batched.
//! This crate hides those differences behind one [`Helper`] contract with
//! implementations for:
//!
//! - **PostgreSQL** via tokio-postgres (three integrity strategies)
//! - **MySQL / MariaDB** via sqlx
//! - **SQLite** via sqlx
//! - **SQL Server** via tiberius (identity inserts, `GO` batches)
//!
//! ## Example
//!
//! ```rust,no_run
//! use fixture_dialect::{load_fn, Connection, DialectImpl, Helper, HelperConfig, Queryable};
//! use sqlx::Connection as _;
//!
//! # async fn run() -> fixture_dialect::Result<()> {
//! let config = HelperConfig::from_yaml("driver: sqlite")?;
//! let helper = DialectImpl::from_config(&config)?;
//! let mut conn = Connection::from(sqlx::SqliteConnection::connect("sqlite:fixtures.db").await?);
//!
//! helper.init(&mut conn).await?;
//! let tables = vec![helper.quote_keyword("orders"), helper.quote_keyword("users")];
//! let mut load = load_fn(|tx| {
//!     let tables = tables.clone();
//!     Box::pin(async move {
//!         tx.execute(&fixture_dialect::core::base::delete_script(&tables), &[]).await?;
//!         tx.execute("INSERT INTO users (id, name) VALUES (1, 'ann')", &[]).await?;
//!         Ok::<(), fixture_dialect::FixtureError>(())
//!     })
//! });
//! helper.disable_referential_integrity(&mut conn, &mut load).await?;
//! helper.after_load(&mut conn).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;

// Re-exports for convenient access
pub use crate::config::HelperConfig;
pub use crate::core::{
    load_fn, BatchSplitter, Connection, Helper, LoadFn, ParamType, Queryable, Row, SqlValue,
    Transaction, TxFuture,
};
pub use drivers::{DialectImpl, DialectKind};
pub use error::{FixtureError, Result};
