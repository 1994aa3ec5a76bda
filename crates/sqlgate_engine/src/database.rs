use std::collections::HashMap;

use sqlgate_auth::Authr;
use sqlgate_core::{EngineKind, GatewayError, GatewayResult};
use tokio::sync::Mutex;

use crate::connection::GatewayConnection;
use crate::engine::{engine_for, Engine};

/// The registry's sole handle to a configured database: one connection, one
/// mutex serializing everything that touches it, and the immutable
/// metadata built at startup.
pub struct Database {
    pub id: String,
    pub engine: Box<dyn Engine>,
    pub conn: Mutex<GatewayConnection>,
    pub read_only: bool,
    pub use_only_stored_statements: bool,
    pub cors_origin: Option<String>,
    pub stored_statements: HashMap<String, String>,
    pub auth: Option<Authr>,
}

impl Database {
    pub fn kind(&self) -> EngineKind {
        self.engine.kind()
    }

    /// Resolves a `#id` stored-statement reference, or returns the SQL
    /// unchanged if it isn't one. Rejects inline SQL when the database is
    /// restricted to stored statements only.
    pub fn resolve_sql<'a>(&'a self, sql: &'a str) -> GatewayResult<&'a str> {
        if let Some(id) = sql.strip_prefix('#') {
            self.stored_statements
                .get(id)
                .map(|s| s.as_str())
                .ok_or_else(|| GatewayError::validation(format!("unknown stored statement: {id}")))
        } else if self.use_only_stored_statements {
            Err(GatewayError::validation(
                "this database only accepts stored statements",
            ))
        } else {
            Ok(sql)
        }
    }
}

pub fn build_engine(kind: EngineKind) -> Box<dyn Engine> {
    engine_for(kind)
}
