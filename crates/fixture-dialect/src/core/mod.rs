//! Engine-agnostic building blocks.
//!
//! - [`traits`]: the [`Helper`] contract, [`Queryable`], [`LoadFn`] and
//!   [`BatchSplitter`]
//! - [`connection`]: connection and transaction providers
//! - [`value`]: driver-neutral values and rows
//! - [`identifier`]: identifier validation and quoting
//! - [`base`]: table cleaning and integrity-suspension algorithms shared by
//!   the dialects

pub mod base;
pub mod connection;
pub mod identifier;
pub mod traits;
pub mod value;

pub use base::IntegrityPlan;
pub use connection::{Connection, MssqlTransaction, Transaction};
pub use traits::{load_fn, BatchSplitter, Helper, LoadFn, ParamType, Queryable, TxFuture};
pub use value::{Row, SqlValue};
