//! SQLite driver.
//!
//! - [`SqliteDialect`]: fixture helper for SQLite
//! - `client`: [`Queryable`](crate::core::Queryable) for sqlx
//!   `SqliteConnection`

mod client;
mod dialect;

pub use dialect::SqliteDialect;
