//! Driver-neutral SQL values and rows.
//!
//! Helpers build their own introspection and maintenance SQL, so they need a
//! way to bind parameters and read results without knowing which driver sits
//! underneath. [`SqlValue`] covers the handful of types those queries use;
//! each driver module converts to and from it.

use std::fmt;

use crate::error::{FixtureError, Result};

/// A parameter or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer, widened to 64 bits.
    I64(i64),

    /// Any floating point value, widened to 64 bits.
    F64(f64),

    /// Text data. Also used for decimals and GUIDs.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Read the value as an integer. Booleans map to 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Short type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::I64(_) => "integer",
            SqlValue::F64(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A result row: column names plus values in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Build a row. `columns` and `values` must have the same length.
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at a column index.
    pub fn get(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    /// Read a non-null text column.
    pub fn try_get_string(&self, idx: usize) -> Result<String> {
        match self.get(idx) {
            Some(SqlValue::Text(s)) => Ok(s.clone()),
            Some(SqlValue::Bytes(b)) => String::from_utf8(b.clone()).map_err(|_| {
                self.mismatch(idx, "text")
            }),
            _ => Err(self.mismatch(idx, "text")),
        }
    }

    /// Read a text column that may be NULL.
    pub fn try_get_opt_string(&self, idx: usize) -> Result<Option<String>> {
        match self.get(idx) {
            Some(SqlValue::Null) => Ok(None),
            _ => self.try_get_string(idx).map(Some),
        }
    }

    /// Read a non-null integer column.
    pub fn try_get_i64(&self, idx: usize) -> Result<i64> {
        self.get(idx)
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| self.mismatch(idx, "integer"))
    }

    fn mismatch(&self, idx: usize, wanted: &str) -> FixtureError {
        let column = self
            .columns
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("#{}", idx));
        let found = self.get(idx).map(SqlValue::type_name).unwrap_or("missing");
        FixtureError::UnsupportedValue {
            column,
            type_name: format!("expected {}, found {}", wanted, found),
        }
    }
}
