use async_trait::async_trait;
use boxer_core::config::DbQueryConfig;
use futures_util::TryStreamExt;
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use thiserror::Error;
use tracing::{debug, warn};

use crate::connection::{connect, query_timeout};

pub const MAX_ROWS_CEILING: usize = 200;

pub type JsonRow = Map<String, Value>;

/// Rows returned to the caller plus how many the statement produced in total.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRows {
    pub rows: Vec<JsonRow>,
    pub total_rows: usize,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database connect failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch(&self, sql: &str, max_rows: usize) -> Result<QueryRows, DbError>;
}

pub fn clamp_max_rows(max_rows: usize) -> usize {
    max_rows.clamp(1, MAX_ROWS_CEILING)
}

pub struct MySqlQueryExecutor {
    config: DbQueryConfig,
}

impl MySqlQueryExecutor {
    pub fn new(config: DbQueryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl QueryExecutor for MySqlQueryExecutor {
    async fn fetch(&self, sql: &str, max_rows: usize) -> Result<QueryRows, DbError> {
        let timeout = query_timeout(&self.config);
        let secs = timeout.as_secs();

        let mut conn = tokio::time::timeout(timeout, connect(&self.config))
            .await
            .map_err(|_| DbError::Timeout { stage: "connect", secs })?
            .map_err(DbError::Connect)?;

        let outcome =
            tokio::time::timeout(timeout, fetch_rows(&mut conn, sql, clamp_max_rows(max_rows)))
                .await;

        if let Err(error) = conn.close().await {
            warn!(event_name = "db.connection.close_failed", error = %error, "failed to close db connection");
        }

        let rows = outcome.map_err(|_| DbError::Timeout { stage: "query", secs })??;
        debug!(
            event_name = "db.query.completed",
            shown = rows.rows.len(),
            total = rows.total_rows,
            "read-only query completed"
        );
        Ok(rows)
    }
}

async fn fetch_rows(
    conn: &mut MySqlConnection,
    sql: &str,
    limit: usize,
) -> Result<QueryRows, DbError> {
    let mut stream = sqlx::raw_sql(sql).fetch(&mut *conn);
    let mut result = QueryRows::default();

    while let Some(row) = stream.try_next().await? {
        result.total_rows += 1;
        if result.rows.len() < limit {
            result.rows.push(decode_row(&row)?);
        }
    }

    Ok(result)
}

fn decode_row(row: &MySqlRow) -> Result<JsonRow, sqlx::Error> {
    let mut object = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

fn decode_column(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };

    let value = match column_kind(&type_name) {
        ColumnKind::Signed => row.try_get_unchecked::<i64, _>(index).map(Value::from).ok(),
        ColumnKind::Unsigned => row.try_get_unchecked::<u64, _>(index).map(Value::from).ok(),
        ColumnKind::Float => row
            .try_get_unchecked::<f64, _>(index)
            .ok()
            .map(|number| Number::from_f64(number).map(Value::Number).unwrap_or(Value::Null)),
        ColumnKind::Decimal => row
            .try_get_unchecked::<rust_decimal::Decimal, _>(index)
            .map(|decimal| Value::String(decimal.to_string()))
            .ok(),
        ColumnKind::DateTime => row
            .try_get_unchecked::<chrono::NaiveDateTime, _>(index)
            .map(|datetime| Value::String(datetime.to_string()))
            .ok(),
        ColumnKind::Date => row
            .try_get_unchecked::<chrono::NaiveDate, _>(index)
            .map(|date| Value::String(date.to_string()))
            .ok(),
        ColumnKind::Json => row.try_get_unchecked::<Value, _>(index).ok(),
        ColumnKind::Binary => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .ok(),
        ColumnKind::Text => None,
    };

    match value {
        Some(value) => Ok(value),
        None => decode_as_text(row, index),
    }
}

// Zero dates, out-of-range TIME values and unknown types fall back to their text form.
fn decode_as_text(row: &MySqlRow, index: usize) -> Result<Value, sqlx::Error> {
    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColumnKind {
    Signed,
    Unsigned,
    Float,
    Decimal,
    DateTime,
    Date,
    Json,
    Binary,
    Text,
}

// sqlx names `TINYINT(1)` columns `BOOLEAN`; they stay integers so rows read `1`/`0`.
fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        name if name.ends_with("UNSIGNED") => ColumnKind::Unsigned,
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            ColumnKind::Signed
        }
        "FLOAT" | "DOUBLE" => ColumnKind::Float,
        "DECIMAL" => ColumnKind::Decimal,
        "DATETIME" | "TIMESTAMP" => ColumnKind::DateTime,
        "DATE" => ColumnKind::Date,
        "JSON" => ColumnKind::Json,
        name if is_binary(name) => ColumnKind::Binary,
        _ => ColumnKind::Text,
    }
}

fn is_binary(type_name: &str) -> bool {
    matches!(
        type_name,
        "BINARY"
            | "VARBINARY"
            | "BLOB"
            | "TINYBLOB"
            | "MEDIUMBLOB"
            | "LONGBLOB"
            | "BIT"
            | "GEOMETRY"
    )
}
