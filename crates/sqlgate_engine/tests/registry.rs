use sqlgate_core::{DatabaseConfig, DatabaseSection};
use sqlgate_engine::build_registry;

fn config_at(path: &std::path::Path, init_statements: Vec<String>) -> DatabaseConfig {
    DatabaseConfig {
        database: DatabaseSection {
            path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        },
        init_statements,
        ..Default::default()
    }
}

#[test]
fn creates_database_and_runs_init_statements() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.sqlite");

    let cfg = config_at(&path, vec!["CREATE TABLE t (id INTEGER PRIMARY KEY)".to_string()]);
    let registry = build_registry(vec![cfg]).unwrap();

    assert_eq!(registry.databases.len(), 1);
    let database = registry.get("fresh").expect("id derived from file stem");
    assert!(database.stored_statements.is_empty());
    assert!(path.exists());
}

#[tokio::test]
async fn init_failure_removes_the_file_it_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.sqlite");

    let cfg = config_at(&path, vec!["NOT VALID SQL AT ALL".to_string()]);
    let err = build_registry(vec![cfg]);

    assert!(err.is_err());
    assert!(!path.exists(), "file created during a failed init must be cleaned up");
}

#[test]
fn duplicate_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("same.sqlite");
    let path_b = dir.path().join("same.sqlite");

    let cfg_a = config_at(&path_a, Vec::new());
    let cfg_b = config_at(&path_b, Vec::new());

    let err = build_registry(vec![cfg_a, cfg_b]);
    assert!(err.is_err());
}
