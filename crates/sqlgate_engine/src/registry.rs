use std::collections::HashMap;
use std::sync::Arc;

use sqlgate_auth::Authr;
use sqlgate_core::{DatabaseConfig, EngineKind, GatewayError, GatewayResult, ScheduledTaskConfig};

use crate::connection::GatewayConnection;
use crate::database::{build_engine, Database};
use crate::engine::to_create;

/// One `scheduledTasks[]` entry, still bound to the database that owns it.
/// The scheduler crate turns these into running cron jobs / startup work.
pub struct PendingTask {
    pub database: Arc<Database>,
    pub config: ScheduledTaskConfig,
}

pub struct DbRegistry {
    pub databases: HashMap<String, Arc<Database>>,
    pub pending_tasks: Vec<PendingTask>,
}

impl DbRegistry {
    pub fn get(&self, id: &str) -> Option<&Arc<Database>> {
        self.databases.get(id)
    }
}

/// Builds the registry from every `--db`/`--quick-db` config, per the
/// ten-step sequence: normalize, dedupe, open, probe, track for cleanup,
/// run init statements, keep the long-lived handle, build the stored
/// statement map, prepare auth, and merge the legacy `maintenance` key.
///
/// Any fatal error aborts the whole startup and removes the file this
/// specific database's init statements just created, if any.
pub fn build_registry(configs: Vec<DatabaseConfig>) -> GatewayResult<DbRegistry> {
    let mut databases = HashMap::new();
    let mut pending_tasks = Vec::new();

    for mut cfg in configs {
        let kind = EngineKind::parse(cfg.database.r#type.as_deref().unwrap_or("SQLITE"))?;
        let engine = build_engine(kind);
        engine.check_config(&mut cfg)?;

        let id = cfg
            .database
            .id
            .clone()
            .ok_or_else(|| GatewayError::Config("database id could not be determined".into()))?;

        if databases.contains_key(&id) {
            return Err(GatewayError::Config(format!("duplicate database id: {id}")));
        }

        let path = cfg.database.path.clone().unwrap_or_default();
        let created_for_cleanup = to_create(&cfg) && !cfg.database.in_memory;

        let result = init_one(&cfg, kind, &id);
        let (conn, stored_statements) = match result {
            Ok(pair) => pair,
            Err(e) => {
                if created_for_cleanup {
                    if let Err(remove_err) = std::fs::remove_file(&path) {
                        log::warn!("failed to remove {path} after init failure: {remove_err}");
                    }
                }
                return Err(e);
            }
        };

        let auth = match &cfg.auth {
            Some(section) => Some(Authr::from_config(section)?),
            None => None,
        };

        cfg.merge_legacy_maintenance()?;

        let database = Arc::new(Database {
            id: id.clone(),
            engine,
            conn: tokio::sync::Mutex::new(conn),
            read_only: cfg.database.read_only,
            use_only_stored_statements: cfg.use_only_stored_statements,
            cors_origin: cfg.cors_origin.clone(),
            stored_statements,
            auth,
        });

        log::info!(
            "database '{id}' ready: engine={:?} readOnly={} storedStatements={} scheduledTasks={}",
            kind,
            database.read_only,
            database.stored_statements.len(),
            cfg.scheduled_tasks.len(),
        );

        for task in cfg.scheduled_tasks {
            pending_tasks.push(PendingTask {
                database: database.clone(),
                config: task,
            });
        }

        databases.insert(id, database);
    }

    Ok(DbRegistry {
        databases,
        pending_tasks,
    })
}

fn init_one(
    cfg: &DatabaseConfig,
    kind: EngineKind,
    id: &str,
) -> GatewayResult<(GatewayConnection, HashMap<String, String>)> {
    let path = cfg.database.path.clone().unwrap_or_default();
    let conn = match kind {
        EngineKind::Sqlite => GatewayConnection::open_sqlite(&path)?,
        EngineKind::Duckdb => GatewayConnection::open_duckdb(&path)?,
    };
    conn.probe()?;

    if to_create(cfg) && !cfg.init_statements.is_empty() {
        for statement in &cfg.init_statements {
            conn.execute_raw(statement)?;
        }
        log::info!(
            "database '{id}' created with {} init statement(s)",
            cfg.init_statements.len()
        );
    }

    let mut stored_statements = HashMap::new();
    for entry in &cfg.stored_statements {
        stored_statements.insert(entry.id.clone(), entry.sql.clone());
    }
    if cfg.use_only_stored_statements && stored_statements.is_empty() {
        return Err(GatewayError::Config(
            "useOnlyStoredStatements requires at least one storedStatement".into(),
        ));
    }

    Ok((conn, stored_statements))
}
