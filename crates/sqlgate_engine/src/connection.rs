use std::time::Instant;

use serde_json::{Map, Value};
use sqlgate_core::{GatewayError, GatewayResult};

use crate::engine::Engine;

/// Column-order-preserving result of `processWithResultSet`: headers exactly
/// as the driver reported them, and the corresponding cell values.
pub struct RawResultSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Named or positional parameters bound into a prepared statement.
pub enum Params {
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn from_request_value(raw: &Option<Value>) -> GatewayResult<Self> {
        match raw {
            None => Ok(Params::None),
            Some(Value::Null) => Ok(Params::None),
            Some(Value::Array(items)) => Ok(Params::Positional(items.clone())),
            Some(Value::Object(map)) => Ok(Params::Named(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            Some(other) => Err(GatewayError::validation(format!(
                "values must be a JSON object or array, got {other}"
            ))),
        }
    }
}

/// The one open handle the registry owns per database, wrapped so the
/// transaction pipeline can speak one vocabulary regardless of engine.
pub enum GatewayConnection {
    Sqlite(rusqlite::Connection),
    Duckdb(duckdb::Connection),
}

impl GatewayConnection {
    pub fn open_sqlite(path: &str) -> GatewayResult<Self> {
        rusqlite::Connection::open(path)
            .map(GatewayConnection::Sqlite)
            .map_err(|e| GatewayError::Config(format!("failed to open SQLite database: {e}")))
    }

    pub fn open_duckdb(path: &str) -> GatewayResult<Self> {
        let conn = if path.is_empty() {
            duckdb::Connection::open_in_memory()
        } else {
            duckdb::Connection::open(path)
        };
        conn.map(GatewayConnection::Duckdb)
            .map_err(|e| GatewayError::Config(format!("failed to open DuckDB database: {e}")))
    }

    pub fn probe(&self) -> GatewayResult<()> {
        match self {
            Self::Sqlite(conn) => conn
                .query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| GatewayError::Config(format!("connection probe failed: {e}"))),
            Self::Duckdb(conn) => conn
                .query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| GatewayError::Config(format!("connection probe failed: {e}"))),
        }
    }

    /// Runs raw SQL with no return value expected: init statements,
    /// `BEGIN`/`COMMIT`/`ROLLBACK`, `VACUUM`, scheduled arbitrary SQL.
    pub fn execute_raw(&self, sql: &str) -> GatewayResult<()> {
        match self {
            Self::Sqlite(conn) => conn
                .execute_batch(sql)
                .map_err(|e| format_sqlite_error(&e)),
            Self::Duckdb(conn) => conn
                .execute_batch(sql)
                .map_err(|e| GatewayError::Execution(e.to_string())),
        }
    }

    pub fn vacuum_into(&self, destination: &str) -> GatewayResult<()> {
        match self {
            Self::Sqlite(conn) => conn
                .execute("VACUUM INTO ?1", [destination])
                .map(|_| ())
                .map_err(|e| format_sqlite_error(&e)),
            Self::Duckdb(conn) => conn
                .execute("EXPORT DATABASE ?", [destination])
                .map(|_| ())
                .map_err(|e| GatewayError::Execution(e.to_string())),
        }
    }

    pub fn execute_statement(&self, sql: &str, params: &Params) -> GatewayResult<u64> {
        match self {
            Self::Sqlite(conn) => exec_sqlite(conn, sql, params),
            Self::Duckdb(conn) => exec_duckdb(conn, sql, params),
        }
    }

    pub fn execute_statement_batch(
        &self,
        sql: &str,
        batch: &[Value],
    ) -> GatewayResult<Vec<u64>> {
        let mut out = Vec::with_capacity(batch.len());
        for entry in batch {
            let params = Params::from_request_value(&Some(entry.clone()))?;
            out.push(self.execute_statement(sql, &params)?);
        }
        Ok(out)
    }

    pub fn execute_query(
        &self,
        engine: &dyn Engine,
        sql: &str,
        params: &Params,
    ) -> GatewayResult<RawResultSet> {
        match self {
            Self::Sqlite(conn) => query_sqlite(conn, engine, sql, params),
            Self::Duckdb(conn) => query_duckdb(conn, engine, sql, params),
        }
    }
}

fn format_sqlite_error(e: &rusqlite::Error) -> GatewayError {
    let message = match e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            msg.clone().unwrap_or_else(|| format!("{:?}", err.code))
        }
        other => other.to_string(),
    };
    log::error!("SQLite execution failed: {message}");
    GatewayError::Execution(message)
}

fn json_to_sqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as SqlValue;
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_to_duckdb(value: &Value) -> duckdb::types::Value {
    use duckdb::types::Value as SqlValue;
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::BigInt(i)
            } else {
                SqlValue::Double(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sqlite_value_to_json(row: &rusqlite::Row, idx: usize) -> Value {
    use rusqlite::types::ValueRef;
    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Integer(i)) => Value::Number(i.into()),
        Ok(ValueRef::Real(f)) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Ok(ValueRef::Text(t)) => Value::String(String::from_utf8_lossy(t).into_owned()),
        Ok(ValueRef::Blob(b)) => Value::String(base64_encode(b)),
        Err(_) => Value::Null,
    }
}

fn duckdb_value_to_json(row: &duckdb::Row, idx: usize) -> Value {
    use duckdb::types::ValueRef;
    match row.get_ref_unwrap(idx) {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Number(i.into()),
        ValueRef::SmallInt(i) => Value::Number(i.into()),
        ValueRef::Int(i) => Value::Number(i.into()),
        ValueRef::BigInt(i) => Value::Number(i.into()),
        ValueRef::HugeInt(i) => Value::String(i.to_string()),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(base64_encode(b)),
        _ => Value::String(format!("{:?}", row.get_ref_unwrap(idx))),
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn exec_sqlite(conn: &rusqlite::Connection, sql: &str, params: &Params) -> GatewayResult<u64> {
    let mut stmt = conn.prepare(sql).map_err(|e| format_sqlite_error(&e))?;
    let affected = match params {
        Params::None => stmt.execute([]),
        Params::Positional(values) => {
            let converted: Vec<rusqlite::types::Value> = values.iter().map(json_to_sqlite).collect();
            let refs: Vec<&dyn rusqlite::ToSql> =
                converted.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
            stmt.execute(refs.as_slice())
        }
        Params::Named(pairs) => {
            let converted: Vec<(String, rusqlite::types::Value)> = pairs
                .iter()
                .map(|(k, v)| (format!(":{k}"), json_to_sqlite(v)))
                .collect();
            let refs: Vec<(&str, &dyn rusqlite::ToSql)> = converted
                .iter()
                .map(|(k, v)| (k.as_str(), v as &dyn rusqlite::ToSql))
                .collect();
            stmt.execute(refs.as_slice())
        }
    };
    affected
        .map(|n| n as u64)
        .map_err(|e| format_sqlite_error(&e))
}

fn exec_duckdb(conn: &duckdb::Connection, sql: &str, params: &Params) -> GatewayResult<u64> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| GatewayError::Execution(e.to_string()))?;
    let affected = match params {
        Params::None => stmt.execute([]),
        Params::Positional(values) => {
            let converted: Vec<duckdb::types::Value> = values.iter().map(json_to_duckdb).collect();
            let refs: Vec<&dyn duckdb::ToSql> =
                converted.iter().map(|v| v as &dyn duckdb::ToSql).collect();
            stmt.execute(refs.as_slice())
        }
        Params::Named(pairs) => {
            let converted: Vec<(String, duckdb::types::Value)> = pairs
                .iter()
                .map(|(k, v)| (format!("${k}"), json_to_duckdb(v)))
                .collect();
            let refs: Vec<(&str, &dyn duckdb::ToSql)> = converted
                .iter()
                .map(|(k, v)| (k.as_str(), v as &dyn duckdb::ToSql))
                .collect();
            stmt.execute(refs.as_slice())
        }
    };
    affected
        .map(|n| n as u64)
        .map_err(|e| GatewayError::Execution(e.to_string()))
}

fn query_sqlite(
    conn: &rusqlite::Connection,
    engine: &dyn Engine,
    sql: &str,
    params: &Params,
) -> GatewayResult<RawResultSet> {
    let start = Instant::now();
    let mut stmt = conn.prepare(sql).map_err(|e| format_sqlite_error(&e))?;
    let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let column_count = headers.len();

    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<Vec<Value>> {
        Ok((0..column_count)
            .map(|i| engine.sanitize_response_field(sqlite_value_to_json(row, i)))
            .collect())
    };

    let mut rows = Vec::new();
    let mapped = match params {
        Params::None => stmt.query_map([], map_row),
        Params::Positional(values) => {
            let converted: Vec<rusqlite::types::Value> = values.iter().map(json_to_sqlite).collect();
            let refs: Vec<&dyn rusqlite::ToSql> =
                converted.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
            stmt.query_map(refs.as_slice(), map_row)
        }
        Params::Named(pairs) => {
            let converted: Vec<(String, rusqlite::types::Value)> = pairs
                .iter()
                .map(|(k, v)| (format!(":{k}"), json_to_sqlite(v)))
                .collect();
            let refs: Vec<(&str, &dyn rusqlite::ToSql)> = converted
                .iter()
                .map(|(k, v)| (k.as_str(), v as &dyn rusqlite::ToSql))
                .collect();
            stmt.query_map(refs.as_slice(), map_row)
        }
    }
    .map_err(|e| format_sqlite_error(&e))?;

    for row in mapped {
        rows.push(row.map_err(|e| format_sqlite_error(&e))?);
    }

    log::debug!(
        "query returned {} rows in {:?}",
        rows.len(),
        start.elapsed()
    );

    Ok(RawResultSet { headers, rows })
}

fn query_duckdb(
    conn: &duckdb::Connection,
    engine: &dyn Engine,
    sql: &str,
    params: &Params,
) -> GatewayResult<RawResultSet> {
    let start = Instant::now();
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| GatewayError::Execution(e.to_string()))?;
    let headers: Vec<String> = stmt.column_names();
    let column_count = headers.len();

    let map_row = |row: &duckdb::Row| -> duckdb::Result<Vec<Value>> {
        Ok((0..column_count)
            .map(|i| engine.sanitize_response_field(duckdb_value_to_json(row, i)))
            .collect())
    };

    let mut rows = Vec::new();
    let mapped = match params {
        Params::None => stmt.query_map([], map_row),
        Params::Positional(values) => {
            let converted: Vec<duckdb::types::Value> = values.iter().map(json_to_duckdb).collect();
            let refs: Vec<&dyn duckdb::ToSql> =
                converted.iter().map(|v| v as &dyn duckdb::ToSql).collect();
            stmt.query_map(refs.as_slice(), map_row)
        }
        Params::Named(pairs) => {
            let converted: Vec<(String, duckdb::types::Value)> = pairs
                .iter()
                .map(|(k, v)| (format!("${k}"), json_to_duckdb(v)))
                .collect();
            let refs: Vec<(&str, &dyn duckdb::ToSql)> = converted
                .iter()
                .map(|(k, v)| (k.as_str(), v as &dyn duckdb::ToSql))
                .collect();
            stmt.query_map(refs.as_slice(), map_row)
        }
    }
    .map_err(|e| GatewayError::Execution(e.to_string()))?;

    for row in mapped {
        rows.push(row.map_err(|e| GatewayError::Execution(e.to_string()))?);
    }

    log::debug!(
        "query returned {} rows in {:?}",
        rows.len(),
        start.elapsed()
    );

    Ok(RawResultSet { headers, rows })
}

/// Builds a map-shaped row (`resultSet`) from headers and cells, preserving
/// column order via the `preserve_order`-enabled `serde_json::Map`.
pub fn row_to_map(headers: &[String], row: Vec<Value>) -> Map<String, Value> {
    headers.iter().cloned().zip(row).collect()
}
