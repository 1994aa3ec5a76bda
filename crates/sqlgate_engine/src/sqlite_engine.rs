use sqlgate_core::{DatabaseConfig, EngineKind, GatewayError, GatewayResult};

use crate::engine::{derive_id_from_path, expand_home, to_create, Engine, Isolation};

pub const IN_MEMORY_SENTINEL: &str = ":memory:";

pub struct SqliteEngine;

impl Engine for SqliteEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn get_version(&self) -> GatewayResult<String> {
        Ok(rusqlite::version().to_string())
    }

    fn default_isolation(&self) -> Isolation {
        Isolation::ReadCommitted
    }

    fn check_config(&self, cfg: &mut DatabaseConfig) -> GatewayResult<()> {
        if cfg.database.in_memory {
            if cfg.database.id.is_none() {
                return Err(GatewayError::Config(
                    "in-memory SQLite database requires an explicit id".into(),
                ));
            }
            cfg.database.path = Some(IN_MEMORY_SENTINEL.to_string());
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

        if cfg.database.read_only && to_create(cfg) && !cfg.init_statements.is_empty() {
            return Err(GatewayError::Config(
                "a read-only database being created cannot have initStatements".into(),
            ));
        }

        Ok(())
    }

    fn sanitize_response_field(&self, value: serde_json::Value) -> serde_json::Value {
        value
    }
}

/// Builds the `?a=b&c=d` connection-string tail rusqlite expects as query
/// parameters on the file URI, per the read-only/WAL flags.
pub fn connection_string_tail(read_only: bool, wal: bool) -> String {
    let mut parts = Vec::new();
    if read_only {
        parts.push("mode=ro".to_string());
        parts.push("immutable=1".to_string());
    }
    if wal {
        parts.push("journal=WAL".to_string());
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("?{}", parts.join("&"))
    }
}
