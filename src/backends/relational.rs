//! MySQL backend
//!
//! Translates a [`TransactionFilter`] into one parameterized `SELECT` and runs
//! it on a pooled connection. Every filter value travels as a bound `?`
//! parameter; only the table name, validated at startup, is part of the text.

use super::traits::{BackendKind, TransactionBackend};
use crate::config::{DatabaseSettings, ResultOrder};
use crate::error::Result;
use crate::query::{fields, TransactionFilter};
use crate::results::{
    bytes_value, date_value, decimal_value, float_value, naive_timestamp_value, timestamp_value,
    TransactionRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Timestamp(NaiveDateTime),
    Text(String),
    Float(f64),
}

/// SQL text plus its parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    fn push(&mut self, clause: &str, param: SqlParam) {
        self.sql.push_str(clause);
        self.params.push(param);
    }
}

/// Translate a filter into a `SELECT` against `table`.
///
/// Clause order is fixed: date, card type, country, amount range.
pub fn build_statement(filter: &TransactionFilter, table: &str, order: ResultOrder) -> SqlStatement {
    let mut statement = SqlStatement {
        sql: format!("SELECT * FROM {} WHERE {} >= ?", table, fields::TRANSACTION_DATE),
        params: vec![SqlParam::Timestamp(filter.since_time().naive_utc())],
    };

    if let Some(card_type) = filter.card_type() {
        statement.push(
            &format!(" AND {} = ?", fields::CARD_TYPE),
            SqlParam::Text(card_type.to_string()),
        );
    }

    if let Some(country) = filter.country_origin() {
        statement.push(
            &format!(" AND {} = ?", fields::COUNTRY_ORIGIN),
            SqlParam::Text(country.to_string()),
        );
    }

    if let Some(range) = filter.amount_range() {
        statement.push(
            &format!(" AND {} BETWEEN ?", fields::AMOUNT),
            SqlParam::Float(range.min),
        );
        statement.push(" AND ?", SqlParam::Float(range.max));
    }

    match order {
        ResultOrder::Unspecified => {}
        ResultOrder::Ascending => {
            statement.sql.push_str(&format!(" ORDER BY {} ASC", fields::TRANSACTION_DATE))
        }
        ResultOrder::Descending => {
            statement.sql.push_str(&format!(" ORDER BY {} DESC", fields::TRANSACTION_DATE))
        }
    }

    statement
}

/// Transactions stored in a MySQL table
pub struct RelationalBackend {
    pool: MySqlPool,
    table: String,
    order: ResultOrder,
}

impl RelationalBackend {
    /// Build a pool from settings. Connections are opened on first use.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self> {
        let port = settings.port_for(BackendKind::Relational);
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.dbname);

        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs_f64(settings.connect_timeout))
            .connect_lazy_with(options);

        info!(
            "MySQL pool configured for {}:{}/{} (max {} connections)",
            settings.host, port, settings.dbname, settings.max_connections
        );

        Ok(Self::with_pool(pool, settings.table.clone(), settings.order))
    }

    /// Wrap an existing pool
    pub fn with_pool(pool: MySqlPool, table: String, order: ResultOrder) -> Self {
        Self { pool, table, order }
    }
}

#[async_trait]
impl TransactionBackend for RelationalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn fetch(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRecord>> {
        let statement = build_statement(filter, &self.table, self.order);
        debug!(sql = %statement.sql, params = statement.params.len(), "Executing relational query");

        let start = Instant::now();
        // Released back to the pool when dropped, on success or error
        let mut conn = self.pool.acquire().await?;

        let query = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind_param);
        let rows = query.fetch_all(&mut *conn).await?;

        debug!("MySQL returned {} rows in {:?}", rows.len(), start.elapsed());

        rows.iter().map(decode_row).collect()
    }
}

fn bind_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &'q SqlParam,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        SqlParam::Timestamp(ts) => query.bind(*ts),
        SqlParam::Text(text) => query.bind(text.as_str()),
        SqlParam::Float(value) => query.bind(*value),
    }
}

/// Convert a row into a record, column by column
fn decode_row(row: &MySqlRow) -> Result<TransactionRecord> {
    let mut record = TransactionRecord::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name())?;
        record.insert(column.name(), value);
    }
    Ok(record)
}

/// How a MySQL column type is read off the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Unsigned,
    Signed,
    Float,
    Double,
    Decimal,
    DateTime,
    Timestamp,
    Date,
    Time,
    Year,
    Json,
    Bytes,
    Text,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "BOOLEAN" => ColumnKind::Bool,
        name if name.contains("INT") && name.ends_with("UNSIGNED") => ColumnKind::Unsigned,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => ColumnKind::Signed,
        "FLOAT" => ColumnKind::Float,
        "DOUBLE" => ColumnKind::Double,
        "DECIMAL" => ColumnKind::Decimal,
        "DATETIME" => ColumnKind::DateTime,
        "TIMESTAMP" => ColumnKind::Timestamp,
        "DATE" => ColumnKind::Date,
        "TIME" => ColumnKind::Time,
        "YEAR" => ColumnKind::Year,
        "JSON" => ColumnKind::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => ColumnKind::Bytes,
        // CHAR, VARCHAR, TEXT, ENUM, SET
        _ => ColumnKind::Text,
    }
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> std::result::Result<Value, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match column_kind(type_name) {
        ColumnKind::Bool => Value::Bool(row.try_get::<bool, _>(idx)?),
        ColumnKind::Unsigned => Value::from(row.try_get::<u64, _>(idx)?),
        ColumnKind::Signed => Value::from(row.try_get::<i64, _>(idx)?),
        ColumnKind::Float => float_value(f64::from(row.try_get::<f32, _>(idx)?)),
        ColumnKind::Double => float_value(row.try_get::<f64, _>(idx)?),
        // Sent as text by the server
        ColumnKind::Decimal => decimal_value(&row.try_get_unchecked::<String, _>(idx)?),
        ColumnKind::DateTime => naive_timestamp_value(row.try_get::<NaiveDateTime, _>(idx)?),
        ColumnKind::Timestamp => timestamp_value(row.try_get::<DateTime<Utc>, _>(idx)?),
        ColumnKind::Date => date_value(row.try_get::<NaiveDate, _>(idx)?),
        ColumnKind::Time => {
            let raw = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
            time_text(&raw)
                .map(Value::String)
                .ok_or_else(|| sqlx::Error::Decode(format!("malformed TIME value {:?}", raw).into()))?
        }
        // Binary protocol sends YEAR as a two-byte integer
        ColumnKind::Year => Value::from(row.try_get_unchecked::<u16, _>(idx)?),
        ColumnKind::Json => row.try_get::<Value, _>(idx)?,
        ColumnKind::Bytes => bytes_value(&row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        ColumnKind::Text => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };

    Ok(value)
}

/// Render a TIME column as `[-]HH:MM:SS`.
///
/// TIME is a duration in MySQL (-838:59:59 to 838:59:59), so hours may exceed
/// 23. Binary rows carry a length byte, then sign, days (u32 LE), hours,
/// minutes, seconds and optional microseconds; text rows are already
/// formatted. Fractional seconds are dropped.
fn time_text(raw: &[u8]) -> Option<String> {
    match raw {
        [0] => return Some("00:00:00".to_string()),
        [len, body @ ..] if (*len == 8 || *len == 12) && body.len() == usize::from(*len) => {
            let negative = body[0] == 1;
            let days = u32::from_le_bytes([body[1], body[2], body[3], body[4]]);
            let hours = u64::from(days) * 24 + u64::from(body[5]);
            return Some(format!(
                "{}{:02}:{:02}:{:02}",
                if negative { "-" } else { "" },
                hours,
                body[6],
                body[7]
            ));
        }
        _ => {}
    }

    let text = std::str::from_utf8(raw).ok()?;
    let whole = text.split('.').next()?;
    let valid = !whole.is_empty()
        && whole
            .trim_start_matches('-')
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b':');
    valid.then(|| whole.to_string())
}
