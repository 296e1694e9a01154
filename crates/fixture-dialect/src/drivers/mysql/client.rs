//! [`Queryable`] for sqlx MySQL connections.
//!
//! Parameter-less statements go through `raw_sql`, which uses the text
//! protocol and accepts multi-statement scripts.

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::types::Decimal;
use sqlx::{Column, Executor, MySql, MySqlConnection, Row as _, TypeInfo, ValueRef};

use crate::core::traits::Queryable;
use crate::core::value::{Row, SqlValue};
use crate::error::{FixtureError, Result};

fn bind<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
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

fn convert_row(row: &MySqlRow) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for column in row.columns() {
        columns.push(column.name().to_string());
        values.push(convert_value(row, column.ordinal(), column.type_info().name())?);
    }

    Ok(Row::new(columns, values))
}

fn convert_value(row: &MySqlRow, idx: usize, type_name: &str) -> Result<SqlValue> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = type_name.to_lowercase();
    let value = match type_name.as_str() {
        "boolean" | "tinyint" | "smallint" | "mediumint" | "int" | "bigint" => {
            SqlValue::I64(row.try_get::<i64, _>(idx)?)
        }
        "tinyint unsigned" | "smallint unsigned" | "mediumint unsigned" | "int unsigned" => {
            SqlValue::I64(row.try_get::<u32, _>(idx)?.into())
        }
        "bigint unsigned" => {
            let v = row.try_get::<u64, _>(idx)?;
            i64::try_from(v)
                .map(SqlValue::I64)
                .unwrap_or_else(|_| SqlValue::Text(v.to_string()))
        }
        "float" => SqlValue::F64(f64::from(row.try_get::<f32, _>(idx)?)),
        "double" => SqlValue::F64(row.try_get::<f64, _>(idx)?),
        "decimal" => SqlValue::Text(row.try_get::<Decimal, _>(idx)?.to_string()),
        "char" | "varchar" | "text" | "enum" | "set" => {
            SqlValue::Text(row.try_get::<String, _>(idx)?)
        }
        "binary" | "varbinary" | "blob" => bytes_or_text(row.try_get::<Vec<u8>, _>(idx)?),
        other => {
            // Fall back to the plain representations.
            if let Ok(v) = row.try_get::<i64, _>(idx) {
                SqlValue::I64(v)
            } else if let Ok(v) = row.try_get::<String, _>(idx) {
                SqlValue::Text(v)
            } else if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
                bytes_or_text(v)
            } else {
                return Err(FixtureError::UnsupportedValue {
                    column: row.columns()[idx].name().to_string(),
                    type_name: other.to_string(),
                });
            }
        }
    };

    Ok(value)
}

/// MySQL reports text under binary collations as bytes.
fn bytes_or_text(bytes: Vec<u8>) -> SqlValue {
    match String::from_utf8(bytes) {
        Ok(s) => SqlValue::Text(s),
        Err(e) => SqlValue::Bytes(e.into_bytes()),
    }
}

#[async_trait]
impl Queryable for MySqlConnection {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_or_text() {
        assert_eq!(bytes_or_text(b"orders".to_vec()), SqlValue::Text("orders".into()));
        assert_eq!(bytes_or_text(vec![0xff, 0xfe]), SqlValue::Bytes(vec![0xff, 0xfe]));
    }
}
