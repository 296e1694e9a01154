//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: fixture helper for PostgreSQL
//! - `client`: [`Queryable`](crate::core::Queryable) for `tokio_postgres`
//!   clients and transactions

mod client;
mod dialect;

pub use dialect::{ForeignKey, PostgresDialect};
