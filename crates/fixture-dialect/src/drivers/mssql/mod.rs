//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: fixture helper for SQL Server, including the `GO`
//!   batch splitter
//! - `client`: [`Queryable`](crate::core::Queryable) for tiberius clients

mod client;
mod dialect;

use tokio::net::TcpStream;
use tokio_util::compat::Compat;

pub use dialect::{MssqlDialect, BATCH_SEPARATOR};

/// tiberius client over a tokio TCP stream.
pub type MssqlClient = tiberius::Client<Compat<TcpStream>>;
