//! [`Queryable`] for tokio-postgres clients and transactions.

use std::error::Error;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{Client, SimpleQueryMessage, Transaction};

use crate::core::traits::Queryable;
use crate::core::value::{Row, SqlValue};
use crate::error::{FixtureError, Result};

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) => b.to_sql(ty, out),
            SqlValue::I64(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::OID {
                    u32::try_from(*v)?.to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::F64(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Text(s) => s.as_str().to_sql(ty, out),
            SqlValue::Bytes(b) => b.as_slice().to_sql(ty, out),
        }
    }

    // Mismatches surface from the inner to_sql call or from the server.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn bind(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Sum the row counts reported by every statement of a simple query.
fn rows_affected(messages: &[SimpleQueryMessage]) -> u64 {
    messages
        .iter()
        .map(|m| match m {
            SimpleQueryMessage::CommandComplete(n) => *n,
            _ => 0,
        })
        .sum()
}

fn convert_rows(rows: &[tokio_postgres::Row]) -> Result<Vec<Row>> {
    rows.iter().map(convert_row).collect()
}

fn convert_row(row: &tokio_postgres::Row) -> Result<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(convert_value(row, idx, column.name(), column.type_())?);
    }

    Ok(Row::new(columns, values))
}

fn convert_value(row: &tokio_postgres::Row, idx: usize, name: &str, ty: &Type) -> Result<SqlValue> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(SqlValue::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?
            .map(|v| SqlValue::I64(i64::from(v)))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?
            .map(|v| SqlValue::I64(i64::from(v)))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::I64)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx)?
            .map(|v| SqlValue::I64(i64::from(v)))
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?
            .map(|v| SqlValue::F64(f64::from(v)))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::F64)
    } else if [Type::TEXT, Type::VARCHAR, Type::NAME, Type::BPCHAR, Type::UNKNOWN].contains(ty) {
        row.try_get::<_, Option<String>>(idx)?.map(SqlValue::Text)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(SqlValue::Bytes)
    } else {
        return Err(FixtureError::UnsupportedValue {
            column: name.to_string(),
            type_name: ty.name().to_string(),
        });
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

#[async_trait]
impl Queryable for Client {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if params.is_empty() {
            let messages = Client::simple_query(self, sql).await?;
            return Ok(rows_affected(&messages));
        }
        Ok(Client::execute(self, sql, &bind(params)).await?)
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = Client::query(self, sql, &bind(params)).await?;
        convert_rows(&rows)
    }
}

#[async_trait]
impl<'a> Queryable for Transaction<'a> {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if params.is_empty() {
            let messages = Transaction::simple_query(self, sql).await?;
            return Ok(rows_affected(&messages));
        }
        Ok(Transaction::execute(self, sql, &bind(params)).await?)
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = Transaction::query(self, sql, &bind(params)).await?;
        convert_rows(&rows)
    }
}
