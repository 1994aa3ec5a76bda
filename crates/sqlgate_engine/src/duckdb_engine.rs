use sqlgate_core::{DatabaseConfig, EngineKind, GatewayError, GatewayResult, RequestItem};

use crate::engine::{derive_id_from_path, expand_home, Engine, Isolation};

pub struct DuckdbEngine;

impl Engine for DuckdbEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Duckdb
    }

    fn get_version(&self) -> GatewayResult<String> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| GatewayError::Execution(e.to_string()))?;
        conn.query_row("select version()", [], |row| row.get::<_, String>(0))
            .map_err(|e| GatewayError::Execution(e.to_string()))
    }

    fn default_isolation(&self) -> Isolation {
        Isolation::EngineDefault
    }

    fn supports_readonly_transaction(&self) -> bool {
        false
    }

    fn check_config(&self, cfg: &mut DatabaseConfig) -> GatewayResult<()> {
        if cfg.database.disable_wal_mode {
            return Err(GatewayError::Config(
                "disableWALMode is not applicable to DUCKDB".into(),
            ));
        }

        if cfg.database.in_memory {
            if cfg.database.id.is_none() {
                return Err(GatewayError::Config(
                    "in-memory DUCKDB database requires an explicit id".into(),
                ));
            }
            cfg.database.path = Some(String::new());
        } else {
            let path = cfg
                .database
                .path
                .as_ref()
                .ok_or_else(|| GatewayError::Config("database.path is required".into()))?;
            let expanded = expand_home(path)?;
            if cfg.database.id.is_none() {
                let derived = derive_id_from_path(&expanded).filter(|s| !s.is_empty());
                cfg.database.id = Some(derived.ok_or_else(|| {
                    GatewayError::Config(format!("could not derive an id from path {expanded}"))
                })?);
            }
            cfg.database.path = Some(expanded);
        }

        Ok(())
    }

    /// DuckDB's read-only transactions do not compose reliably with
    /// `noFail` item-level recovery, so a request containing any such item
    /// is rejected wholesale before anything runs.
    fn check_request(&self, items: &[RequestItem]) -> GatewayResult<()> {
        for (idx, item) in items.iter().enumerate() {
            if item.no_fail {
                return Err(GatewayError::validation_at(
                    idx,
                    "DUCKDB does not support noFail",
                ));
            }
        }
        Ok(())
    }

    /// Our JSON representation already forces map keys to strings, so the
    /// recursive stringification the original engine needed is already
    /// satisfied by construction; this is effectively identity.
    fn sanitize_response_field(&self, value: serde_json::Value) -> serde_json::Value {
        value
    }
}

/// Builds the connection-string tail for read-only DuckDB access.
pub fn connection_string_tail(read_only: bool) -> String {
    if read_only {
        "ACCESS_MODE=READ_ONLY".to_string()
    } else {
        String::new()
    }
}
