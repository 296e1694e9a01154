//! [`Queryable`] for sqlx SQLite connections.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Executor, Row as _, Sqlite, SqliteConnection, TypeInfo, ValueRef};

use crate::core::traits::Queryable;
use crate::core::value::{Row, SqlValue};
use crate::error::{FixtureError, Result};

fn bind<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::F64(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for column in row.columns() {
        columns.push(column.name().to_string());
        values.push(convert_value(row, column.ordinal(), column.name())?);
    }

    Ok(Row::new(columns, values))
}

/// SQLite is dynamically typed: decode by the storage class of the value,
/// not the declared column type.
fn convert_value(row: &SqliteRow, idx: usize, column: &str) -> Result<SqlValue> {
    let storage = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        raw.type_info().name().to_uppercase()
    };

    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::I64(row.try_get::<i64, _>(idx)?),
        "REAL" => SqlValue::F64(row.try_get::<f64, _>(idx)?),
        "TEXT" => SqlValue::Text(row.try_get::<String, _>(idx)?),
        "BLOB" => SqlValue::Bytes(row.try_get::<Vec<u8>, _>(idx)?),
        other => {
            return Err(FixtureError::UnsupportedValue {
                column: column.to_string(),
                type_name: other.to_string(),
            })
        }
    };

    Ok(value)
}

#[async_trait]
impl Queryable for SqliteConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = if params.is_empty() {
            Executor::execute(&mut *self, sqlx::raw_sql(sql)).await?
        } else {
            Executor::execute(&mut *self, bind(sqlx::query(sql), params)).await?
        };
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = bind(sqlx::query(sql), params).fetch_all(&mut *self).await?;
        rows.iter().map(convert_row).collect()
    }
}
