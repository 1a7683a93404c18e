use std::ops::DerefMut;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde_json::{Map, Number, Value};
use tokio_postgres::{types::Type, Row};
use tracing::instrument;

use crate::{
    database_error::DatabaseError,
    sql::{
        connect::DatabasePool,
        sql_builder::SqlStyle,
        transaction::{TransactionScript, TransactionStepResult},
    },
    transaction_holder::TransactionHolder,
};

/// A flat result row, keyed by the column aliases the query selected.
pub type Record = Map<String, Value>;

/// Executes transaction scripts against one pooled database target. The
/// executor is stateless between calls; a caller-held [TransactionHolder]
/// carries state across calls when several operations must share a snapshot.
pub struct DatabaseExecutor {
    pool: DatabasePool,
    style: SqlStyle,
}

impl DatabaseExecutor {
    pub fn new(pool: DatabasePool, style: SqlStyle) -> Self {
        Self { pool, style }
    }

    #[instrument(name = "DatabaseExecutor::execute", skip_all)]
    pub(crate) async fn execute(
        &self,
        script: TransactionScript,
        tx: Option<&TransactionHolder>,
    ) -> Result<TransactionStepResult, DatabaseError> {
        match tx {
            Some(holder) => holder.with_tx(&self.pool, self.style, script).await,
            None => {
                let mut client = self.pool.get_client().await?;
                if script.needs_transaction() {
                    let mut tx = client.transaction().await?;
                    let result = script.execute(self.style, tx.deref_mut()).await?;
                    tx.commit().await?;
                    Ok(result)
                } else {
                    script.execute(self.style, &mut *client).await
                }
            }
        }
    }

    /// Execute and decode the resulting rows into JSON records.
    pub(crate) async fn execute_records(
        &self,
        script: TransactionScript,
        tx: Option<&TransactionHolder>,
    ) -> Result<Vec<Record>, DatabaseError> {
        let rows = self.execute(script, tx).await?;
        rows_to_records(&rows)
    }
}

pub fn rows_to_records(rows: &[Row]) -> Result<Vec<Record>, DatabaseError> {
    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &Row) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, i, column.type_())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &Row, index: usize, ty: &Type) -> Result<Value, DatabaseError> {
    let value = match ty {
        t if *t == Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(Value::Bool),
        t if *t == Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| Value::Number(v.into())),
        t if *t == Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|v| Value::Number(v.into())),
        t if *t == Type::INT8 => row
            .try_get::<_, Option<i64>>(index)?
            .map(|v| Value::Number(v.into())),
        t if *t == Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .and_then(|v| Number::from_f64(v as f64))
            .map(Value::Number),
        t if *t == Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(index)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        t if *t == Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(index)?
            .and_then(|v| v.to_f64())
            .and_then(Number::from_f64)
            .map(Value::Number),
        t if *t == Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)?
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        t if *t == Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)?
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        t if *t == Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(index)?
            .map(|v| Value::String(v.format("%Y-%m-%d").to_string())),
        t if *t == Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(index)?
            .map(|v| Value::String(v.format("%H:%M:%S").to_string())),
        t if *t == Type::JSON || *t == Type::JSONB => {
            row.try_get::<_, Option<Value>>(index)?
        }
        _ => row
            .try_get::<_, Option<String>>(index)
            .unwrap_or(None)
            .map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}
