use sqlgate_auth::CredentialQueryExecutor;
use sqlgate_core::{
    sql_safety, GatewayError, GatewayResult, Request, RequestItem, Response, ResultFormat,
    ResultItem,
};
use sqlgate_engine::{connection::row_to_map, Database, GatewayConnection, Params};

/// A structured error that aborted the whole transaction, carrying the item
/// index that caused it (if any) so the HTTP layer can build the
/// `{reqIdx, error}` shape.
#[derive(Debug)]
pub struct FatalError {
    pub item_idx: Option<usize>,
    pub inner: GatewayError,
}

impl From<GatewayError> for FatalError {
    fn from(inner: GatewayError) -> Self {
        let item_idx = inner.item_idx();
        Self { item_idx, inner }
    }
}

struct QueryDbExecutor<'a> {
    database: &'a Database,
    conn: &'a GatewayConnection,
}

impl CredentialQueryExecutor for QueryDbExecutor<'_> {
    fn check(&self, sql: &str, user: &str, password: &str) -> Result<bool, String> {
        let params = Params::Named(vec![
            ("user".to_string(), serde_json::Value::String(user.to_string())),
            ("password".to_string(), serde_json::Value::String(password.to_string())),
        ]);
        self.conn
            .execute_query(self.database.engine.as_ref(), sql, &params)
            .map(|result| !result.rows.is_empty())
            .map_err(|e| e.to_string())
    }
}

/// Verifies `user`/`password` against this database's `Authr`, if any. Must
/// be called with `conn` already locked by the caller (the same guard used
/// for the transaction that follows), since `ByQuery` needs the connection
/// and the 1-second failure penalty must serialize with everything else
/// touching this database.
pub fn verify_credentials(
    database: &Database,
    conn: &GatewayConnection,
    user: &str,
    password: &str,
) -> GatewayResult<bool> {
    let Some(authr) = &database.auth else {
        return Ok(true);
    };
    let executor = QueryDbExecutor { database, conn };
    authr.verify(user, password, &executor)
}

/// Runs a whole `transaction[]` against `database`, under the caller's
/// already-acquired connection guard, implementing §4.3's
/// request-to-response contract minus parsing, id resolution, and auth
/// (all the HTTP layer's job, since auth must run before this and share the
/// same lock).
pub fn run_transaction(
    database: &Database,
    conn: &GatewayConnection,
    request: Request,
) -> Result<Response, FatalError> {
    if request.transaction.is_empty() {
        return Err(GatewayError::validation("transaction must not be empty").into());
    }

    database
        .engine
        .check_request(&request.transaction)
        .map_err(FatalError::from)?;

    let format = ResultFormat::parse(request.result_format.as_deref());
    let direct_mode = !database.engine.supports_readonly_transaction() && database.read_only;

    if !direct_mode {
        conn.execute_raw("BEGIN").map_err(FatalError::from)?;
    }

    let mut results = Vec::with_capacity(request.transaction.len());
    let mut fatal: Option<FatalError> = None;

    for (idx, item) in request.transaction.iter().enumerate() {
        match dispatch_item(database, conn, item, format) {
            Ok(result_item) => results.push(result_item),
            Err(e) => {
                if item.no_fail {
                    results.push(ResultItem::failure(e.to_string()));
                } else {
                    fatal = Some(FatalError {
                        item_idx: Some(idx),
                        inner: e,
                    });
                    break;
                }
            }
        }
    }

    if !direct_mode {
        if fatal.is_some() {
            if let Err(e) = conn.execute_raw("ROLLBACK") {
                log::error!("database '{}': rollback failed: {e}", database.id);
            }
        } else if let Err(e) = conn.execute_raw("COMMIT") {
            return Err(FatalError {
                item_idx: None,
                inner: e,
            });
        }
    }

    match fatal {
        Some(e) => Err(e),
        None => Ok(Response { results }),
    }
}

fn dispatch_item(
    database: &Database,
    conn: &GatewayConnection,
    item: &RequestItem,
    format: ResultFormat,
) -> GatewayResult<ResultItem> {
    validate_shape(item)?;

    let raw_sql = item
        .sql()
        .ok_or_else(|| GatewayError::validation("item must set query or statement"))?;

    if sql_safety::starts_with_forbidden_verb(raw_sql) {
        return Err(GatewayError::validation(
            "BEGIN/COMMIT/ROLLBACK are reserved to the pipeline",
        ));
    }

    let sql = database.resolve_sql(raw_sql)?;

    if item.is_query() {
        let params = Params::from_request_value(&item.values)?;
        let result = conn.execute_query(database.engine.as_ref(), sql, &params)?;
        Ok(match format {
            ResultFormat::Map => {
                let rows = result
                    .rows
                    .into_iter()
                    .map(|row| row_to_map(&result.headers, row))
                    .collect();
                ResultItem::query_map(result.headers, rows)
            }
            ResultFormat::List => ResultItem::query_list(result.headers, result.rows),
        })
    } else if let Some(batch) = &item.values_batch {
        let counts = conn.execute_statement_batch(sql, batch)?;
        Ok(ResultItem::exec_batch(counts))
    } else {
        let params = Params::from_request_value(&item.values)?;
        let affected = conn.execute_statement(sql, &params)?;
        Ok(ResultItem::exec(affected))
    }
}

fn validate_shape(item: &RequestItem) -> GatewayResult<()> {
    match (&item.query, &item.statement) {
        (Some(_), Some(_)) => {
            return Err(GatewayError::validation(
                "item must not set both query and statement",
            ))
        }
        (None, None) => {
            return Err(GatewayError::validation(
                "item must set exactly one of query or statement",
            ))
        }
        _ => {}
    }

    if item.values.is_some() && item.values_batch.is_some() {
        return Err(GatewayError::validation(
            "item must not set both values and valuesBatch",
        ));
    }

    if item.query.is_some() && item.values_batch.is_some() {
        return Err(GatewayError::validation(
            "valuesBatch is not allowed on a query item",
        ));
    }

    Ok(())
}
