use std::collections::HashMap;
use std::sync::Arc;

use sqlgate_core::{EngineKind, ScheduledTaskConfig};
use sqlgate_engine::{engine_for, Database, GatewayConnection, PendingTask};
use sqlgate_scheduler::Scheduler;
use tokio::sync::Mutex;

fn memory_database(id: &str) -> Arc<Database> {
    let conn = GatewayConnection::open_sqlite(":memory:").unwrap();
    conn.execute_raw("CREATE TABLE t (id INTEGER PRIMARY KEY)")
        .unwrap();

    Arc::new(Database {
        id: id.to_string(),
        engine: engine_for(EngineKind::Sqlite),
        conn: Mutex::new(conn),
        read_only: false,
        use_only_stored_statements: false,
        cors_origin: None,
        stored_statements: HashMap::new(),
        auth: None,
    })
}

#[tokio::test]
async fn rejects_task_with_neither_schedule_nor_at_startup() {
    let database = memory_database("no-trigger");
    let task = PendingTask {
        database,
        config: ScheduledTaskConfig::default(),
    };

    let result = Scheduler::start(vec![task]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn runs_at_startup_task_before_returning() {
    let database = memory_database("startup");
    let task = PendingTask {
        database: database.clone(),
        config: ScheduledTaskConfig {
            at_startup: true,
            statements: vec!["INSERT INTO t (id) VALUES (1)".to_string()],
            ..Default::default()
        },
    };

    let scheduler = Scheduler::start(vec![task]).await.unwrap();

    let conn = database.conn.lock().await;
    let result = conn
        .execute_query(database.engine.as_ref(), "SELECT COUNT(*) as n FROM t", &sqlgate_engine::Params::None)
        .unwrap();
    assert_eq!(result.rows[0][0], serde_json::json!(1));
    drop(conn);

    scheduler.stop().await;
}
