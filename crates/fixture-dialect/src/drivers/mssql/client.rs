//! [`Queryable`] for tiberius clients.
//!
//! Parameter-less statements are sent as plain batches (`simple_query`) so
//! session settings such as `SET IDENTITY_INSERT` stay in effect and
//! multi-statement scripts work. Plain batches report no row counts.

use std::borrow::Cow;

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite};
use tiberius::numeric::Numeric;
use tiberius::{Client, ColumnData, ToSql};

use crate::core::traits::Queryable;
use crate::core::value::{Row, SqlValue};
use crate::error::{FixtureError, Result};

impl ToSql for SqlValue {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlValue::Null => ColumnData::String(None),
            SqlValue::Bool(b) => ColumnData::Bit(Some(*b)),
            SqlValue::I64(v) => ColumnData::I64(Some(*v)),
            SqlValue::F64(v) => ColumnData::F64(Some(*v)),
            SqlValue::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
            SqlValue::Bytes(b) => ColumnData::Binary(Some(Cow::Borrowed(b.as_slice()))),
        }
    }
}

fn bind(params: &[SqlValue]) -> Vec<&dyn ToSql> {
    params.iter().map(|p| p as &dyn ToSql).collect()
}

fn convert_row(row: tiberius::Row) -> Result<Row> {
    let columns: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let types: Vec<String> = row
        .columns()
        .iter()
        .map(|c| format!("{:?}", c.column_type()))
        .collect();

    let mut values = Vec::with_capacity(columns.len());
    for (idx, data) in row.into_iter().enumerate() {
        values.push(convert_value(&columns[idx], &types[idx], data)?);
    }

    Ok(Row::new(columns, values))
}

fn convert_value(column: &str, type_name: &str, data: ColumnData<'static>) -> Result<SqlValue> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| SqlValue::I64(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| SqlValue::I64(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| SqlValue::I64(i64::from(v))),
        ColumnData::I64(v) => v.map(SqlValue::I64),
        ColumnData::F32(v) => v.map(|v| SqlValue::F64(f64::from(v))),
        ColumnData::F64(v) => v.map(SqlValue::F64),
        ColumnData::Bit(v) => v.map(SqlValue::Bool),
        ColumnData::String(v) => v.map(|s| SqlValue::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| SqlValue::Text(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| SqlValue::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.as_ref().map(numeric_value),
        _ => {
            return Err(FixtureError::UnsupportedValue {
                column: column.to_string(),
                type_name: type_name.to_string(),
            })
        }
    };

    Ok(value.unwrap_or(SqlValue::Null))
}

/// Whole numbers stay integers; anything with a fractional part becomes a
/// float.
fn numeric_value(n: &Numeric) -> SqlValue {
    if n.scale() == 0 {
        if let Ok(v) = i64::try_from(n.value()) {
            return SqlValue::I64(v);
        }
    }
    SqlValue::F64(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
}

#[async_trait]
impl<S> Queryable for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        if params.is_empty() {
            self.simple_query(sql).await?.into_results().await?;
            return Ok(0);
        }
        let result = Client::execute(self, sql, &bind(params)).await?;
        Ok(result.total())
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = if params.is_empty() {
            self.simple_query(sql).await?.into_first_result().await?
        } else {
            Client::query(self, sql, &bind(params))
                .await?
                .into_first_result()
                .await?
        };
        rows.into_iter().map(convert_row).collect()
    }
}
