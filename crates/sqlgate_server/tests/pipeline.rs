use std::collections::HashMap;

use serde_json::json;
use sqlgate_core::{EngineKind, Request, RequestItem};
use sqlgate_engine::{engine_for, Database, GatewayConnection};
use sqlgate_server::pipeline::run_transaction;
use tokio::sync::Mutex;

fn memory_database(id: &str) -> Database {
    let conn = GatewayConnection::open_sqlite(":memory:").unwrap();
    conn.execute_raw("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT UNIQUE)")
        .unwrap();

    Database {
        id: id.to_string(),
        engine: engine_for(EngineKind::Sqlite),
        conn: Mutex::new(conn),
        read_only: false,
        use_only_stored_statements: false,
        cors_origin: None,
        stored_statements: HashMap::new(),
        auth: None,
    }
}

fn item(sql: &str, values: Option<serde_json::Value>) -> RequestItem {
    RequestItem {
        query: None,
        statement: Some(sql.to_string()),
        values,
        values_batch: None,
        no_fail: false,
    }
}

fn query(sql: &str) -> RequestItem {
    RequestItem {
        query: Some(sql.to_string()),
        statement: None,
        values: None,
        values_batch: None,
        no_fail: false,
    }
}

#[tokio::test]
async fn s1_successful_transaction_commits_and_is_visible() {
    let db = memory_database("s1");
    let conn = db.conn.lock().await;

    let request = Request {
        result_format: None,
        credentials: None,
        transaction: vec![item(
            "INSERT INTO t (name) VALUES (:name)",
            Some(json!({"name": "alice"})),
        )],
    };
    let response = run_transaction(&db, &conn, request).unwrap();
    assert!(response.results[0].success);
    assert_eq!(response.results[0].rows_updated, Some(1));

    let check = run_transaction(
        &db,
        &conn,
        Request {
            result_format: None,
            credentials: None,
            transaction: vec![query("SELECT name FROM t")],
        },
    )
    .unwrap();
    let rows = check.results[0].result_set.as_ref().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("alice"));
}

#[tokio::test]
async fn s2_item_failure_rolls_back_whole_transaction() {
    let db = memory_database("s2");
    let conn = db.conn.lock().await;

    let request = Request {
        result_format: None,
        credentials: None,
        transaction: vec![
            item(
                "INSERT INTO t (name) VALUES (:name)",
                Some(json!({"name": "bob"})),
            ),
            item(
                "INSERT INTO t (name) VALUES (:name)",
                Some(json!({"name": "bob"})),
            ),
        ],
    };
    let err = run_transaction(&db, &conn, request).unwrap_err();
    assert_eq!(err.item_idx, Some(1));

    let check = run_transaction(
        &db,
        &conn,
        Request {
            result_format: None,
            credentials: None,
            transaction: vec![query("SELECT COUNT(*) as n FROM t")],
        },
    )
    .unwrap();
    let rows = check.results[0].result_set.as_ref().unwrap();
    assert_eq!(rows[0]["n"], json!(0));
}

#[tokio::test]
async fn s3_no_fail_item_reports_error_but_transaction_continues() {
    let db = memory_database("s3");
    let conn = db.conn.lock().await;

    let mut failing = item(
        "INSERT INTO t (name) VALUES (:name)",
        Some(json!({"name": "dup"})),
    );
    failing.no_fail = true;

    let request = Request {
        result_format: None,
        credentials: None,
        transaction: vec![
            item(
                "INSERT INTO t (name) VALUES (:name)",
                Some(json!({"name": "dup"})),
            ),
            failing,
            item(
                "INSERT INTO t (name) VALUES (:name)",
                Some(json!({"name": "carol"})),
            ),
        ],
    };
    let response = run_transaction(&db, &conn, request).unwrap();
    assert!(response.results[0].success);
    assert!(!response.results[1].success);
    assert!(response.results[1].error.is_some());
    assert!(response.results[2].success);
}

#[tokio::test]
async fn s4_forbidden_verb_is_rejected() {
    let db = memory_database("s4");
    let conn = db.conn.lock().await;

    let request = Request {
        result_format: None,
        credentials: None,
        transaction: vec![item("BEGIN", None)],
    };
    let err = run_transaction(&db, &conn, request).unwrap_err();
    assert_eq!(err.item_idx, Some(0));
}

#[tokio::test]
async fn s5_values_batch_runs_statement_once_per_entry() {
    let db = memory_database("s5");
    let conn = db.conn.lock().await;

    let mut batched = item("INSERT INTO t (name) VALUES (:name)", None);
    batched.values_batch = Some(vec![json!({"name": "x"}), json!({"name": "y"})]);

    let request = Request {
        result_format: None,
        credentials: None,
        transaction: vec![batched],
    };
    let response = run_transaction(&db, &conn, request).unwrap();
    assert_eq!(response.results[0].rows_updated_batch, Some(vec![1, 1]));
}

#[tokio::test]
async fn s6_stored_statement_reference_resolves() {
    let mut db = memory_database("s6");
    db.stored_statements
        .insert("insertNamed".to_string(), "INSERT INTO t (name) VALUES (:name)".to_string());
    let conn = db.conn.lock().await;

    let request = Request {
        result_format: None,
        credentials: None,
        transaction: vec![item("#insertNamed", Some(json!({"name": "dave"})))],
    };
    let response = run_transaction(&db, &conn, request).unwrap();
    assert!(response.results[0].success);
}
